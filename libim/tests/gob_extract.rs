//! End-to-end GOB extraction: build an archive in memory, load it back through
//! the public API, and write each entry out to a real directory the way
//! `gobext` does, then confirm the files on disk match what went in.

use libim::gob::{write_gob, VfContainer};
use libim::stream::MemoryStream;

#[test]
fn extracts_entries_to_matching_files() {
    let mat_bytes: Vec<u8> = (0x00..=0x0B).collect();
    let key_bytes: Vec<u8> = (0x30..=0x36).collect();
    assert_eq!(mat_bytes.len(), 12);
    assert_eq!(key_bytes.len(), 7);

    let files = vec![
        ("a/b.mat".to_owned(), mat_bytes.clone()),
        ("c.key".to_owned(), key_bytes.clone()),
    ];

    let mut s = MemoryStream::new();
    write_gob(&mut s, &files).unwrap();
    let container = VfContainer::load(MemoryStream::with_bytes(s.into_inner())).unwrap();

    let vf = container.get("a/b.mat").unwrap();
    assert_eq!(vf.read_all().unwrap(), mat_bytes);
    let vf = container.get("c.key").unwrap();
    assert_eq!(vf.read_all().unwrap(), key_bytes);

    let dir = std::env::temp_dir().join(format!("libim-gob-extract-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    for path in container.paths() {
        let vf = container.get(path).unwrap();
        let bytes = vf.read_all().unwrap();
        let dest = dir.join(path.replace('\\', "/").split('/').collect::<std::path::PathBuf>());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&dest, &bytes).unwrap();
    }

    assert_eq!(std::fs::read(dir.join("a/b.mat")).unwrap(), mat_bytes);
    assert_eq!(std::fs::read(dir.join("c.key")).unwrap(), key_bytes);

    std::fs::remove_dir_all(&dir).ok();
}
