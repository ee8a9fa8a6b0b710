use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use pullfind::compare::entry::ByName;
use pullfind::compare::Reverse;
use pullfind::{search, Entry, EntryKind, FindError, Matcher, State};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory tree for testing.
///
/// Structure:
/// ```text
/// tmp/
///   invoice_jan.txt
///   invoice_feb.txt
///   report.txt
///   notes.md
///   subdir/
///     invoice_mar.txt
///     other.rs
/// ```
fn setup_test_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::write(root.join("invoice_jan.txt"), "january invoice").unwrap();
    fs::write(root.join("invoice_feb.txt"), "february invoice").unwrap();
    fs::write(root.join("report.txt"), "quarterly report").unwrap();
    fs::write(root.join("notes.md"), "some notes").unwrap();

    let sub = root.join("subdir");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("invoice_mar.txt"), "march invoice").unwrap();
    fs::write(sub.join("other.rs"), "fn main() {}").unwrap();

    dir
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn finds_matching_files() {
    let dir = setup_test_dir();
    let results = search()
        .root(dir.path())
        .matching("invoice")
        .collect_paths(true)
        .run()
        .unwrap();

    assert_eq!(results.matches, 3, "should find 3 invoice files");
    assert_eq!(results.paths.len(), 3);
    assert!(results.paths.iter().all(|p| p
        .file_name()
        .unwrap()
        .to_string_lossy()
        .contains("invoice")));
    assert!(results.completed);
}

#[test]
fn matching_ignores_case() {
    let dir = setup_test_dir();
    let results = search().root(dir.path()).matching("INVOICE").run().unwrap();
    assert_eq!(results.matches, 3);
}

#[test]
fn respects_limit() {
    let dir = setup_test_dir();
    let results = search()
        .root(dir.path())
        .matching("invoice")
        .limit(2)
        .collect_paths(true)
        .run()
        .unwrap();

    assert_eq!(results.matches, 2, "stepping stops exactly at the limit");
    assert_eq!(results.paths.len(), 2);
    assert!(!results.completed);
}

#[test]
fn all_entries_when_no_matcher() {
    let dir = setup_test_dir();
    let results = search().root(dir.path()).run().unwrap();

    // 6 files + 1 subdir = 7 entries total
    assert_eq!(results.matches, 7);
    assert_eq!(
        results.stats.files + results.stats.dirs,
        7,
        "should scan all 7 entries"
    );
}

#[test]
fn stats_are_populated() {
    let dir = setup_test_dir();
    let results = search().root(dir.path()).run().unwrap();

    assert!(results.stats.duration.as_nanos() > 0);
    assert_eq!(results.stats.files, 6);
    assert_eq!(results.stats.dirs, 1);
    assert_eq!(results.stats.members, 0);
}

#[test]
fn custom_matcher_works() {
    struct RustMatcher;
    impl Matcher for RustMatcher {
        fn is_match(&self, entry: &Entry) -> bool {
            entry.path.extension().map(|e| e == "rs").unwrap_or(false)
        }
    }

    let dir = setup_test_dir();
    let results = search()
        .root(dir.path())
        .with_matcher(RustMatcher)
        .collect_paths(true)
        .run()
        .unwrap();

    assert_eq!(results.matches, 1, "should find exactly 1 .rs file");
    assert!(results.paths[0].to_string_lossy().ends_with("other.rs"));
}

#[test]
fn closure_matcher_works() {
    let dir = setup_test_dir();
    let results = search()
        .root(dir.path())
        .with_matcher(|e: &Entry| e.kind == EntryKind::Dir)
        .collect_paths(true)
        .run()
        .unwrap();

    assert_eq!(names(&results.paths), vec!["subdir"]);
}

#[test]
fn paths_empty_when_not_collecting() {
    let dir = setup_test_dir();
    let results = search()
        .root(dir.path())
        .matching("invoice")
        .run()
        .unwrap();

    assert!(
        results.paths.is_empty(),
        "paths should be empty when collect_paths is false"
    );
    assert_eq!(results.matches, 3, "matches should still be counted");
}

#[test]
fn errors_empty_when_not_collecting() {
    let dir = setup_test_dir();
    let results = search().root(dir.path()).run().unwrap();

    assert!(
        results.errors.is_empty(),
        "errors should be empty when collect_errors is false"
    );
}

#[test]
fn default_order_is_dirs_then_natural_per_level() {
    let dir = setup_test_dir();
    let results = search().root(dir.path()).collect_paths(true).run().unwrap();

    assert_eq!(
        names(&results.paths),
        vec![
            "subdir",
            "invoice_feb.txt",
            "invoice_jan.txt",
            "notes.md",
            "report.txt",
            "invoice_mar.txt",
            "other.rs",
        ]
    );
}

#[test]
fn sort_by_replaces_default_order() {
    let dir = setup_test_dir();
    let results = search()
        .root(dir.path())
        .sort_by(Reverse(ByName))
        .collect_paths(true)
        .run()
        .unwrap();

    assert_eq!(
        names(&results.paths),
        vec![
            "subdir",
            "report.txt",
            "notes.md",
            "invoice_jan.txt",
            "invoice_feb.txt",
            "other.rs",
            "invoice_mar.txt",
        ]
    );
}

#[test]
fn non_recursive_stays_at_root() {
    let dir = setup_test_dir();
    let results = search()
        .root(dir.path())
        .matching("invoice")
        .recursive(false)
        .run()
        .unwrap();

    assert_eq!(results.matches, 2);
    assert!(results.completed);
}

#[test]
fn max_depth_limits_descent() {
    let dir = setup_test_dir();
    fs::create_dir(dir.path().join("subdir").join("deeper")).unwrap();
    fs::write(dir.path().join("subdir").join("deeper").join("invoice_apr.txt"), "").unwrap();

    let count = |depth| {
        search()
            .root(dir.path())
            .matching("invoice")
            .max_depth(depth)
            .run()
            .unwrap()
            .matches
    };

    assert_eq!(count(0), 0);
    assert_eq!(count(1), 2);
    assert_eq!(count(2), 3);
    assert_eq!(count(3), 4);
}

#[test]
fn hidden_entries_can_be_skipped() {
    let dir = setup_test_dir();
    fs::write(dir.path().join(".invoice_draft.txt"), "").unwrap();

    let all = search().root(dir.path()).matching("invoice").run().unwrap();
    assert_eq!(all.matches, 4);

    let visible = search()
        .root(dir.path())
        .matching("invoice")
        .hidden(true)
        .run()
        .unwrap();
    assert_eq!(visible.matches, 3);
}

#[test]
fn ignore_files_are_honoured_on_request() {
    let dir = setup_test_dir();
    fs::write(dir.path().join(".ignore"), "subdir/\n").unwrap();

    let all = search().root(dir.path()).matching("invoice").run().unwrap();
    assert_eq!(all.matches, 3);

    let filtered = search()
        .root(dir.path())
        .matching("invoice")
        .ignore_files(true)
        .run()
        .unwrap();
    assert_eq!(filtered.matches, 2);
}

#[test]
fn finds_same_paths_as_walkdir() {
    let dir = setup_test_dir();
    fs::create_dir_all(dir.path().join("a").join("b").join("c")).unwrap();
    fs::write(dir.path().join("a").join("b").join("c").join("leaf"), "").unwrap();
    fs::write(dir.path().join("a").join("mid"), "").unwrap();

    let results = search().root(dir.path()).collect_paths(true).run().unwrap();
    let found: BTreeSet<PathBuf> = results.paths.into_iter().collect();

    let expected: BTreeSet<PathBuf> = walkdir::WalkDir::new(dir.path())
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap().into_path())
        .collect();

    assert_eq!(found, expected);
    assert_eq!(results.matches, expected.len());
}

#[test]
fn paused_state_stops_before_first_step() {
    let dir = setup_test_dir();
    let state = State::new();
    state.pause(true);

    let results = search().root(dir.path()).state(state.clone()).run().unwrap();

    assert_eq!(results.matches, 0);
    assert!(!results.completed);
    assert!(!state.is_done());
}

#[test]
fn finished_state_is_marked_done() {
    let dir = setup_test_dir();
    let root = State::new();
    let state = root.child();

    let results = search().root(dir.path()).state(state.clone()).run().unwrap();

    assert!(results.completed);
    assert!(state.is_done());
    assert!(!root.is_done());
}

#[test]
fn root_errors_are_fatal() {
    let dir = setup_test_dir();

    let err = search().run().unwrap_err();
    assert!(matches!(err, FindError::InvalidSource(_)));

    let err = search().root(dir.path().join("missing")).run().unwrap_err();
    assert!(matches!(err, FindError::NotFound(_)));
    assert!(!err.is_recoverable());

    let err = search().root(dir.path().join("report.txt")).run().unwrap_err();
    assert!(matches!(err, FindError::NotADirectory(ref p) if p.ends_with("report.txt")));
}

#[cfg(unix)]
#[test]
fn unreadable_directory_is_collected() {
    use std::os::unix::fs::PermissionsExt;

    let dir = setup_test_dir();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("invoice_secret.txt"), "").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to observe then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let results = search()
        .root(dir.path())
        .matching("invoice")
        .collect_errors(true)
        .run()
        .unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(results.matches, 3);
    assert!(results.completed);
    assert!(!results.errors.is_empty());
    assert!(results.errors.iter().all(FindError::is_recoverable));
    assert!(results
        .errors
        .iter()
        .any(|e| e.path().map(Path::new) == Some(locked.as_path())));
}
