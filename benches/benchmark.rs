// Performance benchmarks for index builds and query ranking
use bizrec_core::{
    BusinessFeatureRecord, BusinessFields, FeatureCatalog, FeatureIndexBuilder, FilterQuery,
    Preferences, SimilarityEngine, TfidfVectorizer,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

const CATEGORIES: &[&str] = &[
    "Pizza", "Italian", "Sushi", "Cafe", "Bakeries", "Bar", "Spa", "Thai", "Mexican", "Burgers",
];
const CITIES: &[&str] = &["Boston", "New York", "Austin", "Denver", "Chicago"];
const PRICES: &[&str] = &["$", "$$", "$$$", "$$$$"];

fn generate_random_record(rng: &mut StdRng, id: usize) -> BusinessFeatureRecord {
    let first = CATEGORIES[rng.random_range(0..CATEGORIES.len())];
    let second = CATEGORIES[rng.random_range(0..CATEGORIES.len())];
    BusinessFeatureRecord::new(BusinessFields {
        business_id: format!("b{}", id),
        name: format!("Business {}", id),
        category: format!("{}, {}", first, second),
        city: CITIES[rng.random_range(0..CITIES.len())].to_string(),
        price: PRICES[rng.random_range(0..PRICES.len())].to_string(),
        rating: (rng.random_range(0..=10) as f64) / 2.0,
        review_count: rng.random_range(0..2000),
        address: String::new(),
        phone: String::new(),
        image_url: String::new(),
        url: String::new(),
    })
}

fn generate_catalog(size: usize) -> FeatureCatalog {
    let mut rng = StdRng::seed_from_u64(42);
    FeatureCatalog::from_records((0..size).map(|i| generate_random_record(&mut rng, i)).collect())
}

fn benchmark_tfidf_fit(c: &mut Criterion) {
    let catalog = generate_catalog(5000);
    let texts: Vec<&str> = catalog.records().iter().map(|r| r.feature_text()).collect();

    c.bench_function("tfidf_fit_transform_5k", |b| {
        b.iter(|| {
            let fitted = TfidfVectorizer::fit_transform(black_box(&texts));
            black_box(fitted);
        });
    });
}

fn benchmark_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    group.sample_size(10);

    for size in [100, 1000, 3000].iter() {
        let snapshot = generate_catalog(*size).snapshot();
        group.bench_with_input(BenchmarkId::new("full_rebuild", size), size, |b, _| {
            let builder = FeatureIndexBuilder::default();
            b.iter(|| {
                let index = builder.build(black_box(&snapshot));
                black_box(index);
            });
        });
    }

    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let catalog = generate_catalog(3000);
    let index = FeatureIndexBuilder::default().build(&catalog.snapshot());

    let filter = FilterQuery {
        category: "pizza".to_string(),
        city: "boston".to_string(),
        price: "$$".to_string(),
        min_rating: 3.0,
        min_review_count: 100,
    }
    .normalize()
    .unwrap();
    group.bench_function("rank_filtered", |b| {
        b.iter(|| {
            let items = SimilarityEngine::rank_filtered(&index, black_box(&filter), 2000, 5);
            black_box(items).ok();
        });
    });

    let prefs = Preferences {
        category: vec!["Pizza".to_string(), "Italian".to_string()],
        city: "Boston".to_string(),
    }
    .normalize()
    .unwrap();
    group.bench_function("rank_terms", |b| {
        b.iter(|| {
            let items = SimilarityEngine::rank_terms(&index, black_box(&prefs), 10);
            black_box(items).ok();
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_tfidf_fit, benchmark_index_build, benchmark_queries);
criterion_main!(benches);
