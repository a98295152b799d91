use dupfinder::config::Settings;
use dupfinder::duplicates::DuplicateFinder;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn settings() -> Settings {
    Settings {
        min_file_size: 1,
        show_progress: false,
        ..Settings::default()
    }
}

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_scan_two_non_overlapping_directories() {
    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    write(dir1.path(), "a.txt", b"dup");
    write(dir2.path(), "b.txt", b"dup");

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, summary) = finder
        .find_duplicates(&[dir1.path().to_path_buf(), dir2.path().to_path_buf()])
        .unwrap();

    assert_eq!(store.num_groups(), 1);
    assert_eq!(store.num_total_files(), 2);
    assert_eq!(summary.files_scanned, 2);
}

#[test]
fn test_scan_overlapping_directories() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"content");
    write(dir.path(), "sub/b.txt", b"content");

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, summary) = finder
        .find_duplicates(&[dir.path().to_path_buf(), dir.path().join("sub")])
        .unwrap();

    // sub/b.txt is visited twice but only recorded once.
    assert_eq!(summary.files_considered, 2);
    assert_eq!(store.num_total_files(), 2);
}

#[test]
fn test_same_root_twice() {
    let dir = tempdir().unwrap();
    write(dir.path(), "only.txt", b"lonely file");

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let root = dir.path().to_path_buf();
    let (store, _) = finder.find_duplicates(&[root.clone(), root]).unwrap();

    assert!(store.is_empty());
}

#[test]
fn test_nonexistent_root_alongside_valid_root() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.bin", b"twin content");
    let b = write(dir.path(), "nested/b.bin", b"twin content");

    let roots = vec![
        dir.path().join("no-such-directory"),
        dir.path().to_path_buf(),
    ];
    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, summary) = finder.find_duplicates(&roots).unwrap();

    let mut paths: Vec<_> = store.map_all_files(|r| r.path().to_path_buf()).collect();
    paths.sort();
    assert_eq!(paths, vec![a, b]);
    assert_eq!(summary.path_errors, 1);
    assert!(summary.has_errors());
}

#[test]
fn test_cross_directory_group_membership() {
    let photos = tempdir().unwrap();
    let backup = tempdir().unwrap();
    write(photos.path(), "2020/img.jpg", &[7u8; 4_000]);
    write(backup.path(), "old/img.jpg", &[7u8; 4_000]);
    write(backup.path(), "old/other.jpg", &[8u8; 4_000]);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, _) = finder
        .find_duplicates(&[photos.path().to_path_buf(), backup.path().to_path_buf()])
        .unwrap();

    assert_eq!(store.num_groups(), 1);
    let (_, group) = store.groups().next().unwrap();
    assert!(group.files().iter().any(|r| r.path().starts_with(photos.path())));
    assert!(group.files().iter().any(|r| r.path().starts_with(backup.path())));
    assert!(!group.files().iter().any(|r| r.path().ends_with("other.jpg")));
}
