//! Annotation tag parser.
//!
//! A tag is a comma-separated option list. `-` alone ignores the field.
//! Keywords set endianness and boolean flavor; `sizeof=`/`sizefrom=` link
//! driver and target fields; `skip=N` prefixes padding; anything else must be
//! a type expression, optionally `TYPE:BITS` for a bit-subfield.

use crate::bits::ByteOrder;
use crate::errors::{Error, Result};
use crate::schema::TypeDesc;
use crate::typestr::parse_type;

/// A parsed tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagOptions {
    pub ignore: bool,
    pub ty: Option<TypeDesc>,
    pub size_of: Option<String>,
    pub size_from: Option<String>,
    pub skip: usize,
    pub order: Option<ByteOrder>,
    pub variant_bool: bool,
    pub inverted_bool: bool,
    pub bit_size: u8,
}

/// Parses a struct tag into [`TagOptions`].
pub fn parse_tag(tag: &str) -> Result<TagOptions> {
    let mut result = TagOptions::default();
    if tag.is_empty() {
        return Ok(result);
    }

    let parts: Vec<&str> = tag.split(',').collect();

    if parts[0] == "-" {
        if parts.len() > 1 {
            return Err(Error::Annotation(
                "extra options on ignored field".to_string(),
            ));
        }
        result.ignore = true;
        return Ok(result);
    }

    for part in parts {
        match part {
            "lsb" | "little" => {
                result.order = Some(ByteOrder::Little);
                continue;
            }
            "msb" | "big" | "network" => {
                result.order = Some(ByteOrder::Big);
                continue;
            }
            "variantbool" => {
                result.variant_bool = true;
                continue;
            }
            "invertedbool" => {
                result.inverted_bool = true;
                continue;
            }
            _ => {}
        }

        if let Some(name) = part.strip_prefix("sizeof=") {
            if name.is_empty() {
                return Err(Error::Annotation("sizeof needs a field name".to_string()));
            }
            result.size_of = Some(name.to_string());
        } else if let Some(name) = part.strip_prefix("sizefrom=") {
            if name.is_empty() {
                return Err(Error::Annotation("sizefrom needs a field name".to_string()));
            }
            result.size_from = Some(name.to_string());
        } else if let Some(amount) = part.strip_prefix("skip=") {
            result.skip = amount
                .parse()
                .map_err(|_| Error::Annotation("bad skip amount".to_string()))?;
        } else {
            if result.ty.is_some() {
                return Err(Error::Annotation(format!(
                    "multiple type overrides in tag {:?}",
                    tag
                )));
            }
            let (ty, bits) = parse_type_with_bits(part)?;
            result.ty = Some(ty);
            result.bit_size = bits;
        }
    }

    Ok(result)
}

/// Parses `TYPE` or `TYPE:BITS`. A bit width applies only to integer, float,
/// boolean, or complex wire types and must fit strictly inside the width.
fn parse_type_with_bits(part: &str) -> Result<(TypeDesc, u8)> {
    let (type_str, bits_str) = match part.split_once(':') {
        Some((t, b)) => (t, Some(b)),
        None => (part, None),
    };

    let ty = parse_type(type_str)?;
    let Some(bits_str) = bits_str else {
        return Ok((ty, 0));
    };

    if !ty.valid_bit_type() {
        return Err(Error::Annotation(format!(
            "bits specified on non-bitwise type {}",
            type_str
        )));
    }
    let width = ty
        .bit_width()
        .ok_or_else(|| Error::Annotation(format!("bits specified on non-bitwise type {}", type_str)))?;
    let bits: u8 = bits_str
        .parse()
        .map_err(|_| Error::Annotation(format!("bad bit width {:?}", bits_str)))?;
    if bits == 0 || bits as usize >= width {
        return Err(Error::Annotation(format!(
            "bit width {} out of range for {}",
            bits, type_str
        )));
    }
    Ok((ty, bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tag_is_default() {
        assert_eq!(parse_tag("").unwrap(), TagOptions::default());
    }

    #[test]
    fn ignore_must_be_sole_option() {
        assert!(parse_tag("-").unwrap().ignore);
        assert!(parse_tag("-,u8").is_err());
    }

    #[test]
    fn endianness_keywords() {
        assert_eq!(parse_tag("big").unwrap().order, Some(ByteOrder::Big));
        assert_eq!(parse_tag("msb").unwrap().order, Some(ByteOrder::Big));
        assert_eq!(parse_tag("network").unwrap().order, Some(ByteOrder::Big));
        assert_eq!(parse_tag("little").unwrap().order, Some(ByteOrder::Little));
        assert_eq!(parse_tag("lsb").unwrap().order, Some(ByteOrder::Little));
    }

    #[test]
    fn bool_flavors() {
        let opts = parse_tag("bool,variantbool,invertedbool").unwrap();
        assert!(opts.variant_bool);
        assert!(opts.inverted_bool);
        assert_eq!(opts.ty, Some(TypeDesc::Bool));
    }

    #[test]
    fn size_links() {
        assert_eq!(
            parse_tag("sizeof=Packets").unwrap().size_of.as_deref(),
            Some("Packets")
        );
        assert_eq!(
            parse_tag("sizefrom=Size").unwrap().size_from.as_deref(),
            Some("Size")
        );
        assert!(parse_tag("sizeof=").is_err());
    }

    #[test]
    fn skip_amounts() {
        assert_eq!(parse_tag("skip=4").unwrap().skip, 4);
        assert!(parse_tag("skip=four").is_err());
    }

    #[test]
    fn combined_options() {
        let opts = parse_tag("i16,sizeof=Slice,little,skip=1").unwrap();
        assert_eq!(opts.ty, Some(TypeDesc::I16));
        assert_eq!(opts.size_of.as_deref(), Some("Slice"));
        assert_eq!(opts.order, Some(ByteOrder::Little));
        assert_eq!(opts.skip, 1);
    }

    #[test]
    fn type_override_with_bits() {
        let opts = parse_tag("u8:3").unwrap();
        assert_eq!(opts.ty, Some(TypeDesc::U8));
        assert_eq!(opts.bit_size, 3);
    }

    #[test]
    fn bit_width_bounds() {
        assert!(parse_tag("u8:0").is_err());
        assert!(parse_tag("u8:8").is_err());
        assert!(parse_tag("u64:63").is_ok());
        assert!(parse_tag("string:3").is_err());
        assert!(parse_tag("[4]u8:3").is_err());
    }

    #[test]
    fn at_most_one_type_override() {
        assert!(parse_tag("u8,u16").is_err());
    }

    #[test]
    fn unknown_words_are_errors() {
        assert!(parse_tag("bogusoption").is_err());
    }
}
