//! Benchmarks for trade frame decoding and store application

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quote_stream::config::StoreConfig;
use quote_stream::feed::decode_frame;
use quote_stream::store::PriceStore;

fn batch_frame(records: usize, symbols: usize) -> String {
    let body: Vec<String> = (0..records)
        .map(|i| {
            format!(
                r#"{{"s":"BINANCE:SYM{}","p":{}.{},"t":{},"v":0.01}}"#,
                i % symbols,
                1000 + i,
                i % 100,
                1_700_000_000_000u64 + i as u64
            )
        })
        .collect();
    format!(r#"{{"data":[{}],"type":"trade"}}"#, body.join(","))
}

fn benchmark_decode_single(c: &mut Criterion) {
    let frame = br#"{"data":{"s":"BINANCE:BTCUSDT","p":64000.25}}"#;
    c.bench_function("decode_single", |b| b.iter(|| decode_frame(black_box(frame))));
}

fn benchmark_decode_batch(c: &mut Criterion) {
    let frame = batch_frame(200, 10);
    c.bench_function("decode_batch_200x10", |b| {
        b.iter(|| decode_frame(black_box(frame.as_bytes())))
    });
}

fn benchmark_apply_batch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let symbols: Vec<String> = (0..10).map(|i| format!("BINANCE:SYM{}", i)).collect();
    let store = runtime.block_on(async { PriceStore::spawn(&symbols, &StoreConfig::default()) });
    let frame = batch_frame(200, 10);

    c.bench_function("decode_and_apply_batch", |b| {
        b.to_async(&runtime).iter(|| {
            let updates = decode_frame(frame.as_bytes());
            let store = store.clone();
            async move { store.apply(updates).await.unwrap() }
        })
    });
}

criterion_group!(
    benches,
    benchmark_decode_single,
    benchmark_decode_batch,
    benchmark_apply_batch
);
criterion_main!(benches);
