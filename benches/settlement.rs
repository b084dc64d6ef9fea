use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use roulette_royale::games::settlement::{settle, settle_detailed};
use roulette_royale::games::{BetKind, BetTarget, Wager};

fn table_of(size: usize) -> Vec<Wager> {
    BetKind::ALL
        .into_iter()
        .cycle()
        .enumerate()
        .take(size)
        .map(|(i, kind)| {
            let target = match kind {
                BetKind::Straight => BetTarget::Number((i % 37) as u8),
                other => BetTarget::default_for(other),
            };
            Wager::new(kind, &target, 5).expect("valid wager")
        })
        .collect()
}

fn settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("settlement");
    for size in [1usize, 13, 100, 1_000] {
        let wagers = table_of(size);

        group.bench_function(BenchmarkId::new("settle", size), |b| {
            b.iter(|| {
                for n in 0..=36u8 {
                    black_box(settle(black_box(n), &wagers));
                }
            })
        });

        group.bench_function(BenchmarkId::new("settle_detailed", size), |b| {
            b.iter(|| black_box(settle_detailed(black_box(17), &wagers)))
        });
    }
    group.finish();
}

criterion_group!(benches, settlement);
criterion_main!(benches);
