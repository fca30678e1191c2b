//! Index lifecycle against the RocksDB backend.

#![cfg(feature = "rocks")]

use std::error::Error;

use rand::prelude::*;
use tempfile::tempdir;

use hmsearch::{HmIndex, HmSearchError};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn create_then_open_returns_the_same_parameters() -> TestResult {
    let tmp = tempdir()?;
    let path = tmp.path().join("index");

    HmIndex::create(&path, 128, 10)?;
    let index = HmIndex::open(&path)?;
    assert_eq!(index.hash_bits(), 128);
    assert_eq!(index.max_error(), 10);
    assert_eq!(index.params().partitions, 6);
    Ok(())
}

#[test]
fn second_create_at_same_path_fails() -> TestResult {
    let tmp = tempdir()?;
    let path = tmp.path().join("index");

    HmIndex::create(&path, 64, 6)?;
    assert!(matches!(
        HmIndex::create(&path, 64, 6),
        Err(HmSearchError::StorageExists(_))
    ));
    // The original parameters survive the failed attempt.
    let index = HmIndex::open(&path)?;
    assert_eq!(index.hash_bits(), 64);
    Ok(())
}

#[test]
fn create_validates_parameters_before_touching_disk() -> TestResult {
    let tmp = tempdir()?;
    let path = tmp.path().join("index");

    assert!(matches!(
        HmIndex::create(&path, 12, 2),
        Err(HmSearchError::InvalidHashBits(12))
    ));
    assert!(matches!(
        HmIndex::create(&path, 8, 0),
        Err(HmSearchError::InvalidMaxError(0))
    ));
    assert!(!path.exists());

    // The path is still usable afterwards.
    HmIndex::create(&path, 8, 2)?;
    Ok(())
}

#[test]
fn open_of_missing_store_fails() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("nothing-here");
    assert!(matches!(
        HmIndex::open(&path),
        Err(HmSearchError::StorageMissing(_))
    ));
    assert!(matches!(
        HmIndex::open_read_only(&path),
        Err(HmSearchError::StorageMissing(_))
    ));
}

#[test]
fn inserted_hashes_survive_reopen() -> TestResult {
    let tmp = tempdir()?;
    let path = tmp.path().join("index");
    HmIndex::create(&path, 64, 6)?;

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let hashes: Vec<[u8; 8]> = (0..100).map(|_| rng.gen::<u64>().to_be_bytes()).collect();

    {
        let mut index = HmIndex::open(&path)?;
        for hash in &hashes {
            index.insert(hash)?;
        }
        index.close()?;
    }

    let index = HmIndex::open(&path)?;
    for hash in &hashes {
        let hits = index.lookup(hash)?;
        assert!(
            hits.iter().any(|h| h.hash == hash && h.distance == 0),
            "hash {hash:02x?} lost across reopen"
        );
    }
    Ok(())
}

#[test]
fn appends_accumulate_across_sessions() -> TestResult {
    // Two inserts into the same slot in separate sessions must both be
    // there afterwards; the slot grows, it is not replaced.
    let tmp = tempdir()?;
    let path = tmp.path().join("index");
    HmIndex::create(&path, 8, 2)?;

    {
        let mut index = HmIndex::open(&path)?;
        index.insert(&[0xa5])?;
    }
    {
        let mut index = HmIndex::open(&path)?;
        index.insert(&[0xa4])?;
    }

    let index = HmIndex::open(&path)?;
    let mut hits = index.lookup(&[0xa5])?;
    hits.sort_by(|a, b| a.hash.cmp(&b.hash));
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].hash, vec![0xa4]);
    assert_eq!(hits[1].hash, vec![0xa5]);
    Ok(())
}

#[test]
fn read_only_open_serves_lookups_but_rejects_inserts() -> TestResult {
    let tmp = tempdir()?;
    let path = tmp.path().join("index");
    HmIndex::create(&path, 8, 2)?;
    {
        let mut index = HmIndex::open(&path)?;
        index.insert(&[0xa5])?;
    }

    let mut index = HmIndex::open_read_only(&path)?;
    let hits = index.lookup(&[0xa5])?;
    assert_eq!(hits.len(), 1);
    assert!(matches!(
        index.insert(&[0xa4]),
        Err(HmSearchError::StorageIo(_))
    ));
    Ok(())
}

#[test]
fn dump_walks_persisted_slots() -> TestResult {
    let tmp = tempdir()?;
    let path = tmp.path().join("index");
    HmIndex::create(&path, 8, 2)?;
    {
        let mut index = HmIndex::open(&path)?;
        index.insert(&[0xa5])?;
    }

    let index = HmIndex::open(&path)?;
    let mut out = Vec::new();
    index.dump(&mut out)?;
    let text = String::from_utf8(out)?;
    assert!(text.contains("Partition 0"), "dump was:\n{text}");
    assert!(text.contains("    a5"), "dump was:\n{text}");
    Ok(())
}

#[test]
fn closed_handle_keeps_store_reusable() -> TestResult {
    let tmp = tempdir()?;
    let path = tmp.path().join("index");
    HmIndex::create(&path, 8, 2)?;

    let mut index = HmIndex::open(&path)?;
    index.insert(&[0xa5])?;
    index.close()?;
    assert_eq!(index.lookup(&[0xa5]).unwrap_err(), HmSearchError::Closed);
    drop(index);

    // The store lock is released; a fresh open sees the data.
    let index = HmIndex::open(&path)?;
    assert_eq!(index.lookup(&[0xa5])?.len(), 1);
    Ok(())
}
