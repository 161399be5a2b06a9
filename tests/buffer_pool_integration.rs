//! Integration tests for the buffer pool manager.
//!
//! Cross-component behaviour: pool + scheduler + file-backed disk manager.

use pagepool::{
    BufferPoolConfig, BufferPoolManager, FileDiskManager, LogManager, MemoryDiskManager, PageId,
};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn create_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let dm = FileDiskManager::create(dir.path().join("test.db")).unwrap();
    (BufferPoolManager::new(pool_size, 2, dm).unwrap(), dir)
}

/// Bytes written through a guard survive being evicted and re-read.
#[test]
fn test_data_persistence_across_evictions() {
    let (bpm, _dir) = create_bpm(2);

    let mut page_ids = vec![];
    for i in 0u8..5 {
        let mut guard = bpm.new_page().unwrap();
        guard.as_mut_slice()[0] = i;
        guard.as_mut_slice()[1] = i.wrapping_mul(3);
        page_ids.push(guard.page_id());
    }

    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], i as u8);
        assert_eq!(guard.as_slice()[1], (i as u8).wrapping_mul(3));
    }
    assert!(bpm.stats().snapshot().dirty_write_backs >= 3);
}

/// Write, unpin dirty by hand, force the frame out, read it back.
#[test]
fn test_round_trip_through_eviction() {
    let (bpm, _dir) = create_bpm(3);

    let basic = bpm.new_page_guarded().unwrap();
    let target = basic.page_id();
    {
        let mut writer = basic.upgrade_write();
        writer.as_mut_slice()[100..104].copy_from_slice(&[1, 2, 3, 4]);
    }
    assert_eq!(bpm.is_dirty(target), Some(true));

    for _ in 0..6 {
        drop(bpm.new_page().unwrap());
    }
    assert!(!bpm.contains_page(target));

    let guard = bpm.fetch_page_read(target).unwrap();
    assert_eq!(&guard.as_slice()[100..104], &[1, 2, 3, 4]);
}

/// Flushed pages survive dropping the pool and reopening the file.
#[test]
fn test_flush_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let data = b"persistent!";

    let pid = {
        let bpm = BufferPoolManager::new(10, 2, FileDiskManager::create(&path).unwrap()).unwrap();

        let mut guard = bpm.new_page().unwrap();
        let pid = guard.page_id();
        guard.as_mut_slice()[..data.len()].copy_from_slice(data);
        drop(guard);

        bpm.flush_all_pages().unwrap();
        pid
    };

    let bpm = BufferPoolManager::new(10, 2, FileDiskManager::open(&path).unwrap()).unwrap();
    let guard = bpm.fetch_page_read(pid).unwrap();
    assert_eq!(&guard.as_slice()[..data.len()], data);
    assert_ne!(bpm.allocate_page(), pid);
}

/// Several threads hammering different pages through a small pool.
#[test]
fn test_concurrent_writers() {
    let (bpm, _dir) = create_bpm(4);
    let bpm = Arc::new(bpm);

    let page_ids: Vec<PageId> = (0..8).map(|_| bpm.new_page().unwrap().page_id()).collect();

    let handles: Vec<_> = page_ids
        .iter()
        .copied()
        .enumerate()
        .map(|(i, pid)| {
            let bpm = Arc::clone(&bpm);
            thread::spawn(move || {
                for j in 0..50 {
                    // Pool smaller than the working set: retry when full.
                    let mut guard = loop {
                        match bpm.fetch_page_write(pid) {
                            Ok(guard) => break guard,
                            Err(e) if e.is_retryable() => thread::yield_now(),
                            Err(e) => panic!("fetch failed: {}", e),
                        }
                    };
                    guard.as_mut_slice()[0] = ((i * 50 + j) % 256) as u8;
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], ((i * 50 + 49) % 256) as u8);
    }
}

/// Readers and a flusher share a page without blocking each other.
#[test]
fn test_concurrent_flush_and_read() {
    let bpm = Arc::new(BufferPoolManager::new(4, 2, MemoryDiskManager::new()).unwrap());
    let pid = {
        let mut guard = bpm.new_page().unwrap();
        guard.as_mut_slice()[0] = 9;
        guard.page_id()
    };

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let bpm = Arc::clone(&bpm);
            thread::spawn(move || {
                for _ in 0..25 {
                    if t == 0 {
                        bpm.fetch_page_write(pid).unwrap().as_mut_slice()[1] += 1;
                        assert!(bpm.flush_page(pid).unwrap());
                    } else {
                        assert_eq!(bpm.fetch_page_read(pid).unwrap().as_slice()[0], 9);
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(bpm.get_pin_count(pid), Some(0));
    assert_eq!(bpm.is_dirty(pid), Some(false));
    assert_eq!(bpm.fetch_page_read(pid).unwrap().as_slice()[1], 25);
}

/// Hit/miss/eviction counters follow what the pool did.
#[test]
fn test_stats_accuracy() {
    let (bpm, _dir) = create_bpm(2);

    let pid = bpm.new_page().unwrap().page_id();
    for _ in 0..5 {
        drop(bpm.fetch_page_read(pid).unwrap());
    }

    let stats = bpm.stats().snapshot();
    assert_eq!(stats.cache_hits, 5);
    assert_eq!(stats.cache_misses, 0);

    drop(bpm.new_page().unwrap());
    drop(bpm.new_page().unwrap());
    assert_eq!(bpm.stats().snapshot().evictions, 1);

    bpm.stats().reset();
    assert_eq!(bpm.stats().snapshot().evictions, 0);
}

/// Configured construction: validation, multiple workers, log manager.
#[test]
fn test_with_config() {
    let bad = BufferPoolConfig::default().io_workers(0);
    assert!(BufferPoolManager::with_config(bad, MemoryDiskManager::new()).is_err());

    let config = BufferPoolConfig::default()
        .pool_size(8)
        .replacer_k(3)
        .io_workers(4);
    let log = Arc::new(LogManager::new());
    let bpm = BufferPoolManager::with_config(config, MemoryDiskManager::new())
        .unwrap()
        .with_log_manager(Arc::clone(&log));

    assert_eq!(bpm.pool_size(), 8);
    assert_eq!(bpm.replacer_k(), 3);
    assert_eq!(bpm.free_frame_count(), 8);
    log.set_persistent_lsn(42);
    assert_eq!(bpm.log_manager().unwrap().persistent_lsn(), Some(42));

    for i in 0..32u8 {
        bpm.new_page().unwrap().as_mut_slice()[0] = i;
    }
    for i in 0..32u8 {
        let guard = bpm.fetch_page_read(PageId::new(i as u32)).unwrap();
        assert_eq!(guard.as_slice()[0], i);
    }
}
