//! Encoder benchmarks for oxilzma
//!
//! Measures:
//! - Compression speed across levels and both match finders
//! - Behaviour on different data patterns
//! - Streaming writes in small chunks
//! - Early termination under an output limit

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxilzma::{LzmaLevel, LzmaWriter, MatchAlgorithm, WriterConfig, compress, compress_with};
use std::hint::black_box;
use std::io::Write;

type PatternGenerator = fn(usize) -> Vec<u8>;

mod test_data {
    /// Single repeated byte.
    pub fn uniform(size: usize) -> Vec<u8> {
        vec![0xAA; size]
    }

    /// LCG output, effectively incompressible.
    pub fn random(size: usize) -> Vec<u8> {
        let mut seed: u64 = 0x123456789ABCDEF0;
        (0..size)
            .map(|_| {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                (seed >> 32) as u8
            })
            .collect()
    }

    /// Short period with frequent distance reuse.
    pub fn repetitive(size: usize) -> Vec<u8> {
        b"TOBEORNOTTOBEORTOBEORNOT"
            .iter()
            .copied()
            .cycle()
            .take(size)
            .collect()
    }

    /// Words drawn at random from a small vocabulary.
    pub fn text_like(size: usize) -> Vec<u8> {
        const WORDS: &[&[u8]] = &[
            b"the ", b"quick ", b"brown ", b"fox ", b"jumps ", b"over ", b"lazy ", b"dog. ",
            b"pack ", b"my ", b"box ", b"with ", b"five ", b"dozen ", b"liquor ", b"jugs\n",
        ];
        let mut seed: u64 = 0x0DDB1A5E5BAD5EED;
        let mut data = Vec::with_capacity(size + 8);
        while data.len() < size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.extend_from_slice(WORDS[((seed >> 33) % WORDS.len() as u64) as usize]);
        }
        data.truncate(size);
        data
    }

    /// Mixed sections: slowly varying, random, zeros, random.
    pub fn binary_like(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        let section = size / 4;

        for _ in 0..section {
            data.push((seed % 256) as u8);
            if seed % 10 < 3 {
                seed = seed.wrapping_add(1);
            }
        }
        for _ in 0..section {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data.extend(std::iter::repeat_n(0, section));
        while data.len() < size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }
}

const SIZE: usize = 256 * 1024;

fn patterns() -> [(&'static str, PatternGenerator); 5] {
    [
        ("uniform", test_data::uniform as PatternGenerator),
        ("random", test_data::random as PatternGenerator),
        ("repetitive", test_data::repetitive as PatternGenerator),
        ("text", test_data::text_like as PatternGenerator),
        ("binary", test_data::binary_like as PatternGenerator),
    ]
}

fn bench_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("levels");
    group.sample_size(10);
    let data = test_data::text_like(SIZE);

    for level in [0u8, 3, 5, 6, 9] {
        let level = LzmaLevel::new(level);
        group.throughput(Throughput::Bytes(SIZE as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("level_{}", level.level())),
            &data,
            |b, data| b.iter(|| black_box(compress(black_box(data), level).unwrap())),
        );
    }

    group.finish();
}

fn bench_matchers(c: &mut Criterion) {
    let mut group = c.benchmark_group("matchers");
    group.sample_size(10);

    for (name, generator) in patterns() {
        let data = generator(SIZE);
        for matcher in [MatchAlgorithm::HashChain4, MatchAlgorithm::BinaryTree] {
            let config = WriterConfig::new()
                .with_dict_cap(1 << 20)
                .with_matcher(matcher);
            group.throughput(Throughput::Bytes(SIZE as u64));
            group.bench_with_input(
                BenchmarkId::new(matcher.name(), name),
                &data,
                |b, data| b.iter(|| black_box(compress_with(black_box(data), config).unwrap())),
            );
        }
    }

    group.finish();
}

fn bench_streaming_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming_chunks");
    group.sample_size(10);
    let data = test_data::text_like(SIZE);

    for chunk in [64usize, 4096, 65536] {
        group.throughput(Throughput::Bytes(SIZE as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &data, |b, data| {
            b.iter(|| {
                let config = WriterConfig::new().with_dict_cap(1 << 20);
                let mut writer = LzmaWriter::with_config(Vec::new(), config).unwrap();
                for piece in data.chunks(chunk) {
                    writer.write_all(piece).unwrap();
                }
                black_box(writer.finish().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_output_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("output_limit");
    group.sample_size(10);
    let data = test_data::binary_like(SIZE);

    for limit in [1024u64, 16 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(limit), &data, |b, data| {
            b.iter(|| {
                let config = WriterConfig::new()
                    .with_dict_cap(1 << 20)
                    .with_output_limit(limit);
                let result = compress_with(black_box(data), config);
                black_box(result.is_err())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_levels,
    bench_matchers,
    bench_streaming_chunks,
    bench_output_limit,
);
criterion_main!(benches);
