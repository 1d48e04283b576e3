use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use libblocksa::{KarkkainenArgs, KarkkainenSa, NaiveSa, SuffixStream};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_dna(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

fn drain<B: libblocksa::SuffixBlockSource>(mut stream: SuffixStream<B>) -> u64 {
    let mut sum = 0u64;
    while stream.has_more_suffixes().unwrap() {
        sum += stream.next_suffix().unwrap() as u64;
    }
    sum
}

fn blockwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("blockwise");
    for len in [1 << 12, 1 << 14, 1 << 16] {
        let text = random_dna(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &text, |b, text| {
            b.iter(|| {
                let sa = KarkkainenSa::new(KarkkainenArgs {
                    text,
                    bucket_size: 1024,
                    dc_v: 64,
                    random_seed: 0,
                    sanity_check: false,
                })
                .unwrap();
                drain(SuffixStream::new(sa))
            });
        });
    }
    group.finish();
}

fn naive(c: &mut Criterion) {
    let mut group = c.benchmark_group("naive");
    for len in [1 << 12, 1 << 14, 1 << 16] {
        let text = random_dna(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &text, |b, text| {
            b.iter(|| drain(SuffixStream::new(NaiveSa::new(text, 1024).unwrap())));
        });
    }
    group.finish();
}

criterion_group!(benches, blockwise, naive);
criterion_main!(benches);
