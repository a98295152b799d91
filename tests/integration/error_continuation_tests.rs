use dupfinder::config::Settings;
use dupfinder::duplicates::{CandidateStore, DuplicateFinder};
use dupfinder::scanner::FileRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn settings() -> Settings {
    Settings {
        min_file_size: 1,
        partial_hash_bytes: 1_024,
        show_progress: false,
        ..Settings::default()
    }
}

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_large_file_vanishing_between_phases() {
    let dir = tempdir().unwrap();
    let content = vec![0xEEu8; 8_192];
    write(dir.path(), "a.bin", &content);
    write(dir.path(), "b.bin", &content);
    let doomed = write(dir.path(), "c.bin", &content);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (by_size, _) = finder.enumerate(&[dir.path().to_path_buf()]);
    let partial = finder.partial_phase(by_size).unwrap();
    assert_eq!(partial.num_total_files(), 3);

    fs::remove_file(&doomed).unwrap();
    let full = finder.full_phase(partial).unwrap();

    assert_eq!(full.num_total_files(), 2);
    assert!(full.map_all_files(|r| r.path() != doomed).all(|b| b));
    assert!(full.map_all_files(|r| !r.has_error()).all(|b| b));
    assert_eq!(finder.hash_failures(), 1);
}

#[test]
fn test_small_file_vanishing_after_partial_phase_is_kept() {
    let dir = tempdir().unwrap();
    let small_a = write(dir.path(), "a.txt", b"fits in the window");
    let small_b = write(dir.path(), "b.txt", b"fits in the window");

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (by_size, _) = finder.enumerate(&[dir.path().to_path_buf()]);
    let partial = finder.partial_phase(by_size).unwrap();

    fs::remove_file(&small_a).unwrap();
    let full = finder.full_phase(partial).unwrap();

    let mut paths: Vec<_> = full.map_all_files(|r| r.path().to_path_buf()).collect();
    paths.sort();
    assert_eq!(paths, vec![small_a, small_b]);
    assert_eq!(finder.hash_failures(), 0);
}

#[test]
fn test_unreadable_records_are_dropped() {
    let dir = tempdir().unwrap();
    let records = vec![
        FileRecord::new(dir.path().join("ghost1"), 100),
        FileRecord::new(dir.path().join("ghost2"), 100),
    ];
    let store = CandidateStore::from_records("File size check", 2, records);

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let partial = finder.partial_phase(store).unwrap();

    assert!(partial.is_empty());
    assert_eq!(finder.hash_failures(), 2);
}

#[cfg(unix)]
#[test]
fn test_permission_denied_directory_continues() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write(&locked, "hidden.bin", b"same bytes");
    write(dir.path(), "one.bin", b"same bytes");
    write(dir.path(), "two.bin", b"same bytes");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Running with privileges that ignore permissions.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let result = finder.find_duplicates(&[dir.path().to_path_buf()]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let (store, summary) = result.unwrap();
    assert_eq!(store.num_total_files(), 2);
    assert_eq!(summary.path_errors, 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped_silently() {
    use dupfinder::error::ExitCode;
    use dupfinder::exit_code_for;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(dir.path(), "one.bin", &[9u8; 64]);
    write(dir.path(), "two.bin", &[9u8; 64]);
    let locked = write(dir.path(), "three.bin", &[9u8; 64]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        // Running with privileges that ignore permissions.
        return;
    }

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (by_size, stats) = finder.enumerate(&[dir.path().to_path_buf()]);
    assert_eq!(stats.files_added, 2);
    assert_eq!(stats.rule_exclusions, 1);
    assert_eq!(by_size.num_total_files(), 2);

    let (store, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(store.num_total_files(), 2);
    assert_eq!(summary.hash_failures, 0);
    assert!(!summary.has_errors());
    assert_eq!(exit_code_for(&store, &summary), ExitCode::Success);
}
