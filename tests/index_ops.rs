use hash_index::{ChunkEntry, ChunkIndex, Error, Location, LocationIndex};
use test_log::test;

fn make_key(x: usize) -> Vec<u8> {
    format!("{x:032}").into_bytes()
}

fn location(x: u32) -> Location {
    Location {
        segment: x,
        offset: x,
    }
}

fn chunk(x: u32) -> ChunkEntry {
    ChunkEntry {
        refcount: x,
        size: x,
        csize: x,
    }
}

#[test]
fn location_index_full_cycle() -> hash_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("objects.idx");

    let mut index = LocationIndex::new(32);
    assert_eq!(0, index.len());

    for x in 0..100 {
        index.insert(&make_key(x), location(x as u32));
    }
    assert_eq!(100, index.len());

    for x in 0..100 {
        assert_eq!(location(x as u32), index.get(&make_key(x))?);
    }

    // updates replace in place
    for x in 0..100 {
        index.insert(&make_key(x), location(2 * x as u32));
    }
    assert_eq!(100, index.len());

    for x in 0..100 {
        assert_eq!(location(2 * x as u32), index.get(&make_key(x))?);
    }

    for x in 0..50 {
        index.remove(&make_key(x))?;
    }
    assert_eq!(50, index.len());

    index.write(&path)?;
    drop(index);

    let index = LocationIndex::read(&path, 32)?;
    assert_eq!(50, index.len());

    for x in 50..100 {
        assert_eq!(location(2 * x as u32), index.get(&make_key(x))?);
    }
    for x in 0..50 {
        assert!(!index.contains(&make_key(x)));
    }

    let mut index = index;
    index.clear();
    assert_eq!(0, index.len());

    index.write(&path)?;
    assert_eq!(0, LocationIndex::read(&path, 32)?.len());

    Ok(())
}

#[test]
fn chunk_index_full_cycle() -> hash_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("chunks.idx");

    let mut index = ChunkIndex::new(32);
    assert_eq!(0, index.len());

    for x in 0..100 {
        index.insert(&make_key(x), chunk(x as u32));
    }
    assert_eq!(100, index.len());

    for x in 0..100 {
        index.insert(&make_key(x), chunk(2 * x as u32));
    }
    assert_eq!(100, index.len());

    for x in 0..50 {
        index.remove(&make_key(x))?;
    }
    assert_eq!(50, index.len());

    index.write(&path)?;
    drop(index);

    let index = ChunkIndex::read(&path, 32)?;
    assert_eq!(50, index.len());

    for x in 50..100 {
        assert_eq!(chunk(2 * x as u32), index.get(&make_key(x))?);
    }

    let mut index = index;
    index.clear();
    assert_eq!(0, index.len());

    index.write(&path)?;
    assert_eq!(0, ChunkIndex::read(&path, 32)?.len());

    Ok(())
}

#[test]
fn random_fingerprints_roundtrip() -> hash_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("objects.idx");

    let mut index = LocationIndex::new(32);

    let keys: Vec<Vec<u8>> = (0..1_000)
        .map(|_| format!("{:<32}", nanoid::nanoid!()).into_bytes())
        .collect();

    for (i, key) in keys.iter().enumerate() {
        index.insert(key, location(i as u32));
    }
    assert_eq!(1_000, index.len());

    index.write(&path)?;

    let index = LocationIndex::read(&path, 32)?;

    for (i, key) in keys.iter().enumerate() {
        assert_eq!(location(i as u32), index.get(key)?);
    }

    Ok(())
}

#[test]
fn read_rejects_wrong_key_size() -> hash_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("objects.idx");

    let mut index = LocationIndex::new(32);
    index.insert(&make_key(1), location(1));
    index.write(&path)?;

    assert!(matches!(
        LocationIndex::read(&path, 16),
        Err(Error::KeySizeMismatch((32, 16))),
    ));

    Ok(())
}

#[test]
fn read_rejects_wrong_index_kind() -> hash_index::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("chunks.idx");

    let mut index = ChunkIndex::new(32);
    index.insert(&make_key(1), chunk(1));
    index.write(&path)?;

    // a chunk index file is not a location index file
    assert!(matches!(
        LocationIndex::read(&path, 32),
        Err(Error::ValueSizeMismatch((12, 8))),
    ));

    Ok(())
}
