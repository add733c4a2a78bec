use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use recall_core::{Item, Response, ScoringPolicy};
use recall_experiment::{StimulusMode, generate, scorer};

fn bench_scoring(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let stimulus = match generate(&mut rng, StimulusMode::Digits, 10) {
        Ok(s) => s,
        Err(e) => panic!("{e}"),
    };
    // reversed answer with two gaps
    let mut slots: Vec<Option<Item>> = stimulus.items().iter().rev().cloned().map(Some).collect();
    slots[2] = None;
    slots[7] = None;
    let response = Response::new(slots);

    c.bench_function("score_multiset_10", |b| {
        b.iter(|| scorer::score(black_box(&stimulus), black_box(&response), ScoringPolicy::MultisetCredit))
    });
    c.bench_function("feedback_10", |b| {
        let score = scorer::score(&stimulus, &response, ScoringPolicy::FirstLast);
        b.iter(|| scorer::feedback(black_box(&score)))
    });
    c.bench_function("generate_clusters_10", |b| {
        b.iter(|| generate(&mut rng, StimulusMode::Clusters, black_box(10)))
    });
}

criterion_group!(benches, bench_scoring);
criterion_main!(benches);
