use std::sync::Arc;

use rand::RngCore;
use strata::{
    create_blockset, create_blockset_from_layers, decode_layers, encode_layers, marshal_chain,
    BaseBlockset, Blockset, InodeRef, Kind, MemoryBlockStore,
};

// Helper to stand up an in-memory store with an empty base blockset on top.
fn setup(block_size: u64) -> (Arc<MemoryBlockStore>, BaseBlockset) {
    let store = Arc::new(MemoryBlockStore::new(block_size));
    let blockset = BaseBlockset::new(store.clone());
    (store, blockset)
}

#[tokio::test]
async fn test_write_truncate_trim_cycle() {
    env_logger::builder().is_test(true).try_init().ok();

    let (_store, mut bs) = setup(4);

    bs.put_block(InodeRef(7), 0, &[1, 2, 3, 4]).await.unwrap();
    bs.put_block(InodeRef(7), 1, &[5, 6, 7, 8]).await.unwrap();

    bs.truncate(3, 4).unwrap();
    assert_eq!(bs.length(), 3);
    assert_eq!(bs.get_block(2).await.unwrap(), vec![0, 0, 0, 0]);

    bs.trim(0, 1).unwrap();
    assert_eq!(bs.get_block(0).await.unwrap(), vec![0, 0, 0, 0]);
    assert_eq!(bs.get_block(1).await.unwrap(), vec![5, 6, 7, 8]);
    assert_eq!(bs.length(), 3);
}

#[tokio::test]
async fn test_persist_and_reload_through_registry() {
    env_logger::builder().is_test(true).try_init().ok();

    let store = Arc::new(MemoryBlockStore::new(32));
    let mut bs = create_blockset(Kind::BASE, "", store.clone(), None).unwrap();

    let mut rng = rand::thread_rng();
    let mut written = Vec::new();
    for i in 0..8 {
        let mut block = vec![0u8; 32];
        rng.fill_bytes(&mut block);
        bs.put_block(InodeRef(42), i, &block).await.unwrap();
        written.push(block);
    }
    bs.trim(2, 4).unwrap();

    // Persist the chain description the way the metadata service would.
    let layers = marshal_chain(&*bs).unwrap();
    let bytes = encode_layers(&layers).unwrap();

    let restored = create_blockset_from_layers(&decode_layers(&bytes).unwrap(), store).unwrap();
    assert_eq!(restored.kind(), Kind::BASE);
    assert_eq!(restored.length(), 8);
    for (i, block) in written.iter().enumerate() {
        let expect = if (2..4).contains(&i) {
            vec![0u8; 32]
        } else {
            block.clone()
        };
        assert_eq!(restored.get_block(i).await.unwrap(), expect);
    }

    let live = restored.get_live_inodes();
    assert!(live.contains(42));
    assert_eq!(live.count(), 1);
}

#[tokio::test]
async fn test_reloaded_blockset_keeps_allocating_unique_ids() {
    let (store, mut bs) = setup(16);

    for i in 0..4 {
        bs.put_block(InodeRef(5), i, &[i as u8; 16]).await.unwrap();
    }
    let buf = bs.marshal().unwrap();

    let mut restored = BaseBlockset::new(store);
    restored.unmarshal(&buf).unwrap();
    restored.put_block(InodeRef(5), 4, &[9u8; 16]).await.unwrap();

    let refs = restored.get_all_block_refs();
    let mut ids: Vec<u64> = refs.iter().map(|r| r.index.0).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), refs.len());
}
