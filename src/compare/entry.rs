//! Ready-made rules over [`Entry`].

use std::cmp::Ordering;
use std::time::SystemTime;

use super::Comparer;
use crate::entry::{Entry, EntryKind};

/// Directories sort before everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirsFirst;

impl super::Comparator<Entry> for DirsFirst {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        let rank = |e: &Entry| if e.kind == EntryKind::Dir { 0 } else { 1 };
        rank(a).cmp(&rank(b))
    }
}

/// Natural ("human") name order: `page2` before `page10`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Natural;

impl super::Comparator<Entry> for Natural {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        natord::compare(&a.name, &b.name)
    }
}

/// Plain lexicographic name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByName;

impl super::Comparator<Entry> for ByName {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        a.name.cmp(&b.name)
    }
}

/// Full path order. Never ties for distinct entries, so it makes a good
/// last rule in a chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByPath;

impl super::Comparator<Entry> for ByPath {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        a.path.cmp(&b.path)
    }
}

/// Oldest modification time first.
///
/// Uses the metadata cached when the entry was listed and falls back to a
/// `stat` of the path. Entries whose time cannot be read (archive members,
/// dangling symlinks, vanished files) sort before all others and tie only
/// with each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByModified;

impl ByModified {
    fn modified(entry: &Entry) -> Option<SystemTime> {
        match &entry.metadata {
            Some(meta) => meta.modified().ok(),
            None => std::fs::metadata(&entry.path)
                .and_then(|m| m.modified())
                .ok(),
        }
    }
}

impl super::Comparator<Entry> for ByModified {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        Self::modified(a).cmp(&Self::modified(b))
    }
}

/// The chain used when a search does not configure one: directories first,
/// then natural name order, then full path.
pub fn default_comparer() -> Comparer<Entry> {
    Comparer::new().with(DirsFirst).with(Natural).with(ByPath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{Comparator, Reverse};
    use rstest::rstest;

    fn file(path: &str) -> Entry {
        Entry::new(path, EntryKind::File, 1)
    }

    fn dir(path: &str) -> Entry {
        Entry::new(path, EntryKind::Dir, 1)
    }

    #[rstest]
    #[case("page2", "page10", Ordering::Less)]
    #[case("page10", "page2", Ordering::Greater)]
    #[case("a", "b", Ordering::Less)]
    #[case("same", "same", Ordering::Equal)]
    fn natural_order(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(Natural.compare(&file(a), &file(b)), expected);
    }

    #[rstest]
    #[case("page2", "page10", Ordering::Greater)]
    #[case("B", "a", Ordering::Less)]
    fn name_order_is_bytewise(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(ByName.compare(&file(a), &file(b)), expected);
    }

    #[test]
    fn dirs_sort_first() {
        assert_eq!(DirsFirst.compare(&dir("z"), &file("a")), Ordering::Less);
        assert_eq!(DirsFirst.compare(&file("a"), &file("b")), Ordering::Equal);
    }

    #[test]
    fn default_chain() {
        let comparer = default_comparer();
        let mut entries = vec![
            file("/r/img10.png"),
            dir("/r/zeta"),
            file("/r/img2.png"),
            dir("/r/alpha"),
        ];
        comparer.sort(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta", "img2.png", "img10.png"]);
    }

    #[test]
    fn descending_natural() {
        let comparer = Comparer::new().with(Reverse(Natural));
        let mut entries = vec![file("1"), file("3"), file("20")];
        comparer.sort(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["20", "3", "1"]);
    }

    #[test]
    fn modified_ties_when_unreadable() {
        let a = file("/definitely/not/here/a");
        let b = file("/definitely/not/here/b");
        assert_eq!(ByModified.compare(&a, &b), Ordering::Equal);
    }

    #[cfg(unix)]
    #[test]
    fn modified_orders_unreadable_times_first() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("3_old");
        let new = dir.path().join("1_new");
        let dangling = dir.path().join("2_dangling");
        std::fs::write(&old, "o").unwrap();
        std::fs::write(&new, "n").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), &dangling).unwrap();
        let past = SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let entries = [file(old.to_str().unwrap()), file(new.to_str().unwrap()), file(dangling.to_str().unwrap())];
        let comparer = Comparer::new().with(ByModified).with(ByPath);

        // No precedence cycle among any three entries.
        for a in &entries {
            for b in &entries {
                assert_eq!(comparer.compare(a, b), comparer.compare(b, a).reverse());
                for c in &entries {
                    if comparer.precedes(a, b) && comparer.precedes(b, c) {
                        assert!(comparer.precedes(a, c));
                    }
                }
            }
        }

        let mut sorted = entries.to_vec();
        comparer.sort(&mut sorted);
        let names: Vec<_> = sorted.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["2_dangling", "3_old", "1_new"]);
    }

    #[test]
    fn modified_prefers_cached_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listed");
        std::fs::write(&path, "x").unwrap();
        let mut listed = file(path.to_str().unwrap());
        listed.metadata = std::fs::metadata(&path).ok();
        std::fs::remove_file(&path).unwrap();

        // The cached time still orders it after an unreadable entry.
        let vanished = file(dir.path().join("never").to_str().unwrap());
        assert_eq!(ByModified.compare(&vanished, &listed), Ordering::Less);
    }

    #[test]
    fn modified_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        std::fs::write(&old, "x").unwrap();
        std::fs::write(&new, "y").unwrap();

        let past = SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let old = Entry::from_path(old, 1);
        let new = Entry::from_path(new, 1);
        assert_eq!(ByModified.compare(&old, &new), Ordering::Less);
    }
}
