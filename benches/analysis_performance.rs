use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::{Duration, TimeZone, Utc};
use estatewatch::analysis;
use estatewatch::model::{DatasetMetadata, PropertyRecord};
use estatewatch::novelty::{self, seen::SeenIndex};
use estatewatch::store::backend::MemoryBackend;
use estatewatch::store::codec;
use std::rc::Rc;

const NEIGHBORHOODS: &[&str] = &["Hadar", "Carmel", "Ahuza", "Downtown", "Kiryat Haim", "Neve Shaanan"];

/// Deterministic synthetic market: price roughly linear in area with some spread.
fn market(n: usize) -> Vec<PropertyRecord> {
    (0..n)
        .map(|i| {
            let area = 40.0 + (i % 160) as f64;
            let noise = ((i * 7919) % 400) as f64 * 1_000.0 - 200_000.0;
            let price = 9_000.0 * area + 150_000.0 + noise;
            PropertyRecord::new(format!("listing-{i}"), price, area)
                .with_neighborhood(NEIGHBORHOODS[i % NEIGHBORHOODS.len()])
                .with_rooms(1.0 + (i % 6) as f64)
        })
        .collect()
}

fn bench_best_deals(c: &mut Criterion) {
    let mut group = c.benchmark_group("best_deals");

    for size in [100, 1_000, 10_000] {
        let records = market(size);
        group.bench_with_input(BenchmarkId::new("records", size), &records, |b, records| {
            b.iter(|| analysis::best_deals(black_box(records), 10));
        });
    }

    group.finish();
}

fn bench_rank_groups(c: &mut Criterion) {
    let records = market(10_000);
    c.bench_function("rank_groups_10k", |b| {
        b.iter(|| analysis::rank_groups(black_box(&records)));
    });
}

fn bench_codec(c: &mut Criterion) {
    let records = market(5_000);
    let metadata = DatasetMetadata::default();
    let saved_at = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
    let payload = codec::encode(&records, &metadata, saved_at).unwrap();

    c.bench_function("encode_5k", |b| {
        b.iter(|| codec::encode(black_box(&records), &metadata, saved_at).unwrap());
    });
    c.bench_function("decode_5k", |b| {
        b.iter(|| codec::decode(black_box(&payload)).unwrap());
    });
    c.bench_function("decode_header_5k", |b| {
        b.iter(|| codec::decode_header(black_box(&payload)).unwrap());
    });
}

fn bench_classify(c: &mut Criterion) {
    let records = market(5_000);
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();

    c.bench_function("classify_5k_known", |b| {
        let mut index = SeenIndex::open(Rc::new(MemoryBackend::new()));
        novelty::classify(&mut index, records.clone(), Duration::hours(48), now);
        b.iter(|| novelty::classify(&mut index, black_box(records.clone()), Duration::hours(48), now));
    });
}

criterion_group!(
    benches,
    bench_best_deals,
    bench_rank_groups,
    bench_codec,
    bench_classify
);

criterion_main!(benches);
