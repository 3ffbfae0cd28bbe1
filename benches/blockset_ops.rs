use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use strata::{BaseBlockset, Blockset, InodeRef, MemoryBlockStore};
use tokio::runtime::Runtime;

fn benchmark_blockset_operations(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = Arc::new(MemoryBlockStore::new(4096));
    let mut bs = BaseBlockset::new(store.clone());

    let data = vec![7u8; 4096];
    rt.block_on(async {
        for i in 0..64 {
            bs.put_block(InodeRef(1), i, &data).await.unwrap();
        }
    });
    bs.truncate(128, 4096).unwrap();

    c.bench_function("base_get_block_4k", |b| {
        b.iter(|| rt.block_on(async { black_box(bs.get_block(0).await.unwrap()) }));
    });

    c.bench_function("base_get_block_sparse_4k", |b| {
        b.iter(|| rt.block_on(async { black_box(bs.get_block(100).await.unwrap()) }));
    });

    c.bench_function("base_marshal_128_refs", |b| {
        b.iter(|| black_box(bs.marshal().unwrap()));
    });

    let buf = bs.marshal().unwrap();
    c.bench_function("base_unmarshal_128_refs", |b| {
        b.iter(|| {
            let mut restored = BaseBlockset::new(store.clone());
            restored.unmarshal(black_box(&buf)).unwrap();
        });
    });
}

criterion_group!(benches, benchmark_blockset_operations);
criterion_main!(benches);
