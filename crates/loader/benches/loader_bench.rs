use async_trait::async_trait;
use criterion::{Criterion, criterion_group, criterion_main};
use loader::{BatchFn, BatchResult, Loader};

struct Identity;

#[async_trait]
impl BatchFn<i64, i64> for Identity {
    async fn load(&self, keys: &[i64]) -> BatchResult<i64> {
        Ok(keys.iter().map(|key| Ok(*key)).collect())
    }
}

fn bench_load_many(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("load_many_100_keys_25_unique", |b| {
        b.to_async(&rt).iter(|| async {
            let loader = Loader::new("bench", Identity);
            let keys: Vec<i64> = (0..100).map(|i| i % 25).collect();
            loader.load_many(keys).await
        });
    });

    c.bench_function("cached_load", |b| {
        b.to_async(&rt).iter(|| async {
            let loader = Loader::new("bench", Identity);
            loader.load(1).await.unwrap();
            for _ in 0..100 {
                loader.load(1).await.unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_load_many);
criterion_main!(benches);
