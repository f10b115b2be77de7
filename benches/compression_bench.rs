use criterion::{black_box, criterion_group, criterion_main, Criterion};
use riegeli_rs::codec::{get_codec, CompressionType};

fn bench_compression(c: &mut Criterion) {
    let data = vec![0u8; 1024 * 1024];
    let zstd = get_codec(CompressionType::Zstd);
    let brotli = get_codec(CompressionType::Brotli);
    let snappy = get_codec(CompressionType::Snappy);
    c.bench_function("zstd_compress_1mb", |b| b.iter(|| zstd.compress(black_box(&data), 3)));
    c.bench_function("brotli_compress_1mb", |b| b.iter(|| brotli.compress(black_box(&data), 5)));
    c.bench_function("snappy_compress_1mb", |b| b.iter(|| snappy.compress(black_box(&data), 0)));
}

criterion_group!(benches, bench_compression);
criterion_main!(benches);
