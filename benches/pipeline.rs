use criterion::{black_box, criterion_group, criterion_main, Criterion};

use trng_core::config::TrngConfig;
use trng_core::csprng::chacha::{keystream_block, CipherState};
use trng_core::entropy::WordSource;
use trng_core::mixer::sha512::Sha512Chain;
use trng_core::Trng;

struct ConstantSource(u32);

impl WordSource for ConstantSource {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn ready(&self) -> bool {
        true
    }

    fn peek(&mut self) -> Option<u32> {
        Some(self.0)
    }

    fn ack(&mut self) {}
}

fn bench_keystream_block(c: &mut Criterion) {
    let key = [0x42u8; 32];
    let iv = [7u8; 8];

    c.bench_function("chacha keystream block, 24 rounds", |b| {
        b.iter(|| keystream_block(black_box(&key), black_box(&iv), black_box(1), 24))
    });
}

fn bench_cipher_epoch(c: &mut Criterion) {
    c.bench_function("cipher state, 64 blocks", |b| {
        b.iter_with_setup(
            || CipherState::from_fragments(&[0x11u8; 64], &[0x22u8; 64]),
            |mut state| {
                for _ in 0..64 {
                    black_box(state.next_block(24));
                }
                state
            },
        )
    });
}

fn bench_chain_absorb(c: &mut Criterion) {
    let block = [0xA5u8; 128];

    c.bench_function("sha512 chain absorb", |b| {
        b.iter_with_setup(Sha512Chain::new, |mut chain| {
            chain.absorb(black_box(&block));
            chain.snapshot_digest()
        })
    });
}

fn bench_pipeline_words(c: &mut Criterion) {
    c.bench_function("pipeline, seed and 256 words", |b| {
        b.iter_with_setup(
            || {
                let mut trng = Trng::new(TrngConfig::default()).unwrap();
                trng.add_source(ConstantSource(0xAAAA_AAAA));
                trng
            },
            |mut trng| {
                let mut acc = 0u32;
                for _ in 0..256 {
                    if let Some(word) = trng.try_next_word(1024) {
                        acc ^= word;
                    }
                }
                black_box(acc)
            },
        )
    });
}

criterion_group!(
    benches,
    bench_keystream_block,
    bench_cipher_epoch,
    bench_chain_absorb,
    bench_pipeline_words
);
criterion_main!(benches);
