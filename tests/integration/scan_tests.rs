use dupfinder::config::Settings;
use dupfinder::duplicates::DuplicateFinder;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn settings() -> Settings {
    Settings {
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
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let mut finder = DuplicateFinder::new(settings()).unwrap();

    let (store, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(store.is_empty());
    assert_eq!(summary.files_scanned, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_three_identical_files() {
    let dir = tempdir().unwrap();
    let content = vec![0x5Au8; 50 * 1024];
    write(dir.path(), "a.bin", &content);
    write(dir.path(), "sub/b.bin", &content);
    write(dir.path(), "sub/deeper/c.bin", &content);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(store.num_groups(), 1);
    assert_eq!(store.num_total_files(), 3);
    assert_eq!(store.num_duplicated_files(), 2);
    assert_eq!(store.total_duplicated_size(), 100 * 1024);
    assert_eq!(summary.duplicated_size, 100 * 1024);
    assert_eq!(summary.duplicate_files, 2);
}

#[test]
fn test_divergence_inside_partial_window() {
    let dir = tempdir().unwrap();
    let base = vec![1u8; 200_000];
    let mut other = base.clone();
    other[100] = 2;
    write(dir.path(), "a.bin", &base);
    write(dir.path(), "b.bin", &other);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (by_size, _) = finder.enumerate(&[dir.path().to_path_buf()]);
    assert_eq!(by_size.num_total_files(), 2);

    let partial = finder.partial_phase(by_size).unwrap();
    assert!(partial.is_empty());
}

#[test]
fn test_divergence_after_partial_window() {
    let dir = tempdir().unwrap();
    let base = vec![1u8; 200_000];
    let mut other = base.clone();
    other[150_000] = 2;
    write(dir.path(), "a.bin", &base);
    write(dir.path(), "b.bin", &other);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (by_size, _) = finder.enumerate(&[dir.path().to_path_buf()]);
    let partial = finder.partial_phase(by_size).unwrap();
    assert_eq!(partial.num_total_files(), 2);
    assert!(partial.map_all_files(|r| !r.is_fully_hashed()).all(|b| b));

    let full = finder.full_phase(partial).unwrap();
    assert!(full.is_empty());
}

#[test]
fn test_file_below_minimum_size_is_excluded() {
    let dir = tempdir().unwrap();
    write(dir.path(), "tiny1", &[9u8; 5_000]);
    write(dir.path(), "tiny2", &[9u8; 5_000]);
    let big1 = write(dir.path(), "big1", &[3u8; 20_000]);
    let big2 = write(dir.path(), "big2", &[3u8; 20_000]);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    let mut paths: Vec<_> = store.map_all_files(|r| r.path().to_path_buf()).collect();
    paths.sort();
    assert_eq!(paths, vec![big1, big2]);
    assert_eq!(summary.files_scanned, 4);
    assert_eq!(summary.files_considered, 2);
}

#[test]
fn test_unique_sizes_never_hashed() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", &[0u8; 10_001]);
    write(dir.path(), "b", &[0u8; 10_002]);
    write(dir.path(), "c", &[0u8; 10_003]);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (by_size, _) = finder.enumerate(&[dir.path().to_path_buf()]);

    assert!(by_size.is_empty());
    let stats = by_size.reduction_stats().unwrap();
    assert_eq!(stats.files_before, 3);
    assert_eq!(stats.files_after, 0);
}

#[test]
fn test_multiple_groups() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x1", &[1u8; 12_000]);
    write(dir.path(), "x2", &[1u8; 12_000]);
    write(dir.path(), "y1", &[2u8; 12_000]);
    write(dir.path(), "y2", &[2u8; 12_000]);
    write(dir.path(), "y3", &[2u8; 12_000]);
    write(dir.path(), "z", &[3u8; 12_000]);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(store.num_groups(), 2);
    assert_eq!(summary.duplicate_files, 3);
    assert_eq!(summary.duplicated_size, 3 * 12_000);
    for (_, group) in store.groups() {
        assert!(group.len() >= 2);
        assert!(group.files().iter().all(|r| r.signature().len() == 64));
    }
}

#[test]
fn test_min_copies_three() {
    let dir = tempdir().unwrap();
    write(dir.path(), "pair1", &[1u8; 11_000]);
    write(dir.path(), "pair2", &[1u8; 11_000]);
    write(dir.path(), "triple1", &[2u8; 11_000]);
    write(dir.path(), "triple2", &[2u8; 11_000]);
    write(dir.path(), "triple3", &[2u8; 11_000]);

    let mut finder = DuplicateFinder::new(Settings {
        min_copies: 3,
        ..settings()
    })
    .unwrap();
    let (store, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(store.num_groups(), 1);
    assert_eq!(store.num_total_files(), 3);
}
