use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use wirecraft::{pack, unpack, ByteOrder, FieldDef, StructType, TypeDesc, Value};

fn gen_type(field_count: usize) -> Arc<StructType> {
    let mut fields = Vec::with_capacity(field_count);
    for i in 0..field_count {
        fields.push(FieldDef::new(format!("f{}", i), TypeDesc::U16));
    }
    StructType::new("Bench", fields)
}

fn gen_packet(field_count: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(field_count * 2);

    // Deterministic but non-trivial pattern
    for i in 0..field_count * 2 {
        data.push((i * 31 % 256) as u8);
    }

    data
}

fn bench_unpack(c: &mut Criterion) {
    for &field_count in &[1usize, 10, 50, 100] {
        let ty = gen_type(field_count);
        let packet = gen_packet(field_count);

        c.bench_function(&format!("unpack_{}_fields", field_count), |b| {
            b.iter(|| {
                let mut v = Value::Struct(ty.record().unwrap());
                unpack(&packet, ByteOrder::Big, &mut v).unwrap();
            })
        });
    }
}

fn bench_pack(c: &mut Criterion) {
    for &field_count in &[1usize, 10, 50, 100] {
        let ty = gen_type(field_count);

        c.bench_function(&format!("pack_{}_fields", field_count), |b| {
            b.iter(|| {
                let mut v = Value::Struct(ty.record().unwrap());
                let _ = pack(ByteOrder::Big, &mut v).unwrap();
            })
        });
    }
}

criterion_group!(benches, bench_unpack, bench_pack);
criterion_main!(benches);
