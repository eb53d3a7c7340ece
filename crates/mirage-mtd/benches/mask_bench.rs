//! Mask derivation benchmarks
//!
//! The mask is recomputed on every obfuscate/deobfuscate call, so this is
//! the per-frame hot path.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mirage_core::{CanId, FixedClock};
use mirage_mtd::{IdObfuscator, MaskGenerator, MtdConfig};

fn bench_mask_for_second(c: &mut Criterion) {
    let generator = MaskGenerator::new(&MtdConfig::default().key);

    c.bench_function("mask_for_second", |b| {
        let mut sec = 0u16;
        b.iter(|| {
            sec = (sec + 1) % 3600;
            black_box(generator.mask_for_second(black_box(sec)))
        });
    });
}

fn bench_obfuscate_roundtrip(c: &mut Criterion) {
    let clock = Arc::new(FixedClock::new(42));
    let mtd = IdObfuscator::new(MtdConfig::default(), clock);
    let id = CanId::new(0x701);

    c.bench_function("obfuscate_deobfuscate", |b| {
        b.iter(|| {
            let wire = mtd.obfuscate(black_box(id));
            black_box(mtd.deobfuscate(wire))
        });
    });
}

criterion_group!(benches, bench_mask_for_second, bench_obfuscate_roundtrip);
criterion_main!(benches);
