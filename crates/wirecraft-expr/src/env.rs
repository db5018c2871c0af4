//! Identifier resolution environments.
//!
//! Evaluation looks identifiers up through a [`Resolver`]. Hosts layer
//! resolvers with [`MetaResolver`]; the first layer to answer wins.

use indexmap::IndexMap;

use crate::value::Value;

/// Resolves free identifiers to values.
pub trait Resolver {
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// Resolver backed by a name → value map.
pub struct MapResolver {
    entries: IndexMap<String, Value>,
}

impl MapResolver {
    pub fn new(entries: IndexMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl Resolver for MapResolver {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.entries.get(name).cloned()
    }
}

/// Chains resolvers; earlier layers shadow later ones.
#[derive(Default)]
pub struct MetaResolver<'a> {
    layers: Vec<&'a dyn Resolver>,
}

impl<'a> MetaResolver<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn add_resolver(&mut self, layer: &'a dyn Resolver) {
        self.layers.push(layer);
    }
}

impl Resolver for MetaResolver<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.layers.iter().find_map(|layer| layer.resolve(name))
    }
}
