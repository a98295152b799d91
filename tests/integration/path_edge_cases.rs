use dupfinder::config::Settings;
use dupfinder::duplicates::{DuplicateFinder, ScanSummary};
use dupfinder::output::TextOutput;
use std::fs;
use tempfile::tempdir;

fn settings() -> Settings {
    Settings {
        min_file_size: 1,
        show_progress: false,
        ..Settings::default()
    }
}

#[test]
fn test_paths_with_spaces_and_unicode() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("with space.txt"), b"content").unwrap();
    fs::write(dir.path().join("ünïcødé.txt"), b"content").unwrap();

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(store.num_total_files(), 2);

    let text = TextOutput::new(&store, &summary, true).render().unwrap();
    assert!(text.contains("with space.txt\""));
    assert!(text.contains("ünïcødé.txt\""));
}

#[cfg(not(windows))]
#[test]
fn test_paths_with_quotes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("file_with_\"quote\".txt"), b"content").unwrap();
    fs::write(dir.path().join("duplicate.txt"), b"content").unwrap();

    let mut finder = DuplicateFinder::new(settings()).unwrap();
    let (store, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(store.num_groups(), 1);
    assert!(store
        .map_all_files(|r| r.path().to_string_lossy().contains('"'))
        .any(|b| b));
}

#[test]
fn test_excluded_directory_names_are_substrings() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("my_node_modules_copy")).unwrap();
    fs::write(dir.path().join("my_node_modules_copy/a.js"), b"module").unwrap();
    fs::write(dir.path().join("b.js"), b"module").unwrap();

    let mut finder = DuplicateFinder::new(Settings {
        exclude_dirs: vec!["node_modules".to_string()],
        ..settings()
    })
    .unwrap();
    let (store, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(store.is_empty());
    assert_eq!(summary.files_scanned, 1);
}

#[test]
fn test_empty_files_grouped_when_allowed() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("empty1"), b"").unwrap();
    fs::write(dir.path().join("empty2"), b"").unwrap();

    let mut finder = DuplicateFinder::new(Settings {
        min_file_size: 0,
        ..settings()
    })
    .unwrap();
    let (store, summary): (_, ScanSummary) =
        finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(store.num_total_files(), 2);
    assert_eq!(summary.duplicated_size, 0);
}
