// Build and query benchmarks over synthetic catalogs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use simrec_core::{Engine, EngineConfig, IndexKind, Item, ItemId, RecommendationService};
use std::sync::Arc;

const GENRES: &[&str] = &[
    "Action", "Adventure", "Animation", "Children", "Comedy", "Crime", "Documentary", "Drama",
    "Fantasy", "Horror", "Musical", "Mystery", "Romance", "Thriller", "War", "Western",
];

fn random_word(rng: &mut impl Rng) -> String {
    let len = rng.random_range(3..9);
    (0..len).map(|_| rng.random_range(b'a'..=b'z') as char).collect()
}

/// Items shaped like MovieLens rows: a short title, a few genres, a few tags
fn generate_catalog(size: usize) -> Vec<Item> {
    let mut rng = rand::rng();
    (0..size)
        .map(|i| {
            let title: Vec<String> = (0..rng.random_range(1..4)).map(|_| random_word(&mut rng)).collect();
            let genre_count = rng.random_range(1..4);
            let genres: Vec<&str> = GENRES.choose_multiple(&mut rng, genre_count).copied().collect();
            let tags: Vec<String> = (0..rng.random_range(0..5)).map(|_| random_word(&mut rng)).collect();
            Item::new(i as u64, title.join(" "))
                .with_attribute(genres.join(" "))
                .with_attribute(tags.join(" "))
        })
        .collect()
}

fn config(kind: IndexKind) -> EngineConfig {
    EngineConfig {
        index_kind: kind,
        ..Default::default()
    }
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for size in [1_000, 10_000].iter() {
        let items = generate_catalog(*size);
        for kind in [IndexKind::Flat, IndexKind::Inverted] {
            group.bench_with_input(BenchmarkId::new(kind.to_string(), size), &items, |b, items| {
                b.iter(|| Engine::build(black_box(items), config(kind)).unwrap());
            });
        }
    }

    group.finish();
}

fn benchmark_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");
    let items = generate_catalog(10_000);
    let mut rng = rand::rng();

    for kind in [IndexKind::Flat, IndexKind::Inverted] {
        let engine = Arc::new(Engine::build(&items, config(kind)).unwrap());
        let service = RecommendationService::new(engine);
        for k in [10, 100].iter() {
            group.bench_with_input(BenchmarkId::new(kind.to_string(), k), k, |b, &k| {
                b.iter(|| {
                    let id = ItemId::Integer(rng.random_range(0..items.len() as u64));
                    black_box(service.recommend(&id, k).unwrap())
                });
            });
        }
    }

    group.finish();
}

fn benchmark_search_text(c: &mut Criterion) {
    let items = generate_catalog(10_000);
    let service = RecommendationService::new(Arc::new(Engine::build(&items, EngineConfig::default()).unwrap()));

    c.bench_function("search_text", |b| {
        b.iter(|| black_box(service.search_text("drama romance war", 10).unwrap()));
    });
}

criterion_group!(benches, benchmark_build, benchmark_recommend, benchmark_search_text);
criterion_main!(benches);
