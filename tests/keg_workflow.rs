//! End-to-end keg workflows over real directories.

use std::fs;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use keg::collab::{Chooser, Editor};
use keg::engine::dex::parse_time;
use keg::{Config, EditOutcome, Keg, KegError, PlainRenderer, Target};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Editor that replaces the file with fixed content.
struct Writes(&'static str);

impl Editor for Writes {
    fn edit(&self, path: &Path) -> keg::Result<()> {
        fs::write(path, self.0)?;
        Ok(())
    }
}

/// Editor that looks and leaves.
struct Untouched;

impl Editor for Untouched {
    fn edit(&self, _path: &Path) -> keg::Result<()> {
        Ok(())
    }
}

/// Chooser that always picks the given index.
struct Picks(usize);

impl Chooser for Picks {
    fn choose(&mut self, _labels: &[String]) -> keg::Result<Option<usize>> {
        Ok(Some(self.0))
    }
}

fn set_mtime(path: &Path, secs: u64) {
    let f = fs::File::options().write(true).open(path).unwrap();
    f.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
}

fn new_keg() -> (tempfile::TempDir, Keg) {
    let dir = tempfile::tempdir().unwrap();
    let keg = Keg::init(dir.path(), &Config::default()).unwrap();
    (dir, keg)
}

fn table(keg: &Keg) -> String {
    fs::read_to_string(keg.path().join("dex/nodes.tsv")).unwrap()
}

#[test]
fn init_writes_descriptor_and_zero_node() {
    let (dir, keg) = new_keg();
    assert!(dir.path().join("keg").is_file());
    assert_eq!(keg.lookup(0).unwrap().t, "Sorry, planned but not yet available");
    assert!(dir.path().join("dex/changes.md").is_file());

    // a second init leaves existing content alone
    fs::write(dir.path().join("0/README.md"), "# Mine\n").unwrap();
    let keg = Keg::init(dir.path(), &Config::default()).unwrap();
    assert_eq!(keg.lookup(0).unwrap().t, "Mine");
}

#[test]
fn create_edit_and_empty_lifecycle() {
    let (_dir, keg) = new_keg();

    let id = keg.create(&Writes("# First Note\n\nBody.\n"), false).unwrap().unwrap();
    assert_eq!(id, 1);
    assert_eq!(keg.last_changed().unwrap().n, 1);
    assert_eq!(keg.lookup(1).unwrap().t, "First Note");

    set_mtime(&keg.store().content_path(id), 1_000_000);
    assert_eq!(keg.edit(id, &Untouched).unwrap(), EditOutcome::Unchanged);

    let outcome = keg.edit(id, &Writes("# Renamed\n")).unwrap();
    assert_eq!(outcome, EditOutcome::Updated);
    assert_eq!(keg.lookup(1).unwrap().t, "Renamed");

    assert_eq!(keg.edit(id, &Writes("")).unwrap(), EditOutcome::Removed);
    assert!(!keg.node_dir(id).exists());
    assert!(matches!(keg.lookup(1), Err(KegError::NodeNotFound(1))));
    assert!(!table(&keg).lines().any(|l| l.starts_with("1\t")));
}

#[test]
fn untouched_edit_keeps_changes_in_rebuild_order() {
    let (_dir, keg) = new_keg();
    keg.create(&Writes("# Older\n"), false).unwrap();
    keg.create(&Writes("# Newer\n"), false).unwrap();
    set_mtime(&keg.store().content_path(0), 1_700_000_000);
    set_mtime(&keg.store().content_path(1), 1_700_000_100);
    set_mtime(&keg.store().content_path(2), 1_700_000_200);
    keg.publisher().rebuild().unwrap();
    let rebuilt = fs::read_to_string(keg.path().join("dex/changes.md")).unwrap();

    assert_eq!(keg.edit(1, &Untouched).unwrap(), EditOutcome::Unchanged);
    let changes = fs::read_to_string(keg.path().join("dex/changes.md")).unwrap();
    assert_eq!(changes, rebuilt);
    assert_eq!(keg.last_changed().unwrap().n, 2);
}

#[test]
fn multiline_and_non_utf8_never_wedge_the_dex() {
    let (_dir, keg) = new_keg();
    keg.create(&Writes("---\ntitle: \"Line one\\nLine two\"\n---\n\n# Body\n"), false)
        .unwrap();
    assert_eq!(keg.changes(5).unwrap().entries()[0].t, "Line one Line two");
    assert_eq!(keg.last_changed().unwrap().n, 1);

    fs::write(keg.path().join("dex/nodes.tsv"), b"\xff\xfe garbage\n").unwrap();
    fs::write(keg.path().join("dex/changes.md"), b"\xff\xfe garbage\n").unwrap();
    assert_eq!(keg.changes(5).unwrap().len(), 2);
    assert_eq!(keg.dex().unwrap().len(), 2);
    keg.publisher().publish().unwrap();
}

#[test]
fn create_left_empty_is_discarded() {
    let (_dir, keg) = new_keg();
    let before = table(&keg);

    assert_eq!(keg.create(&Untouched, false).unwrap(), None);
    assert!(!keg.node_dir(1).exists());
    assert_eq!(table(&keg), before);

    // sample content survives an editor that does nothing
    assert_eq!(keg.create(&Untouched, true).unwrap(), Some(1));
    assert_eq!(keg.lookup(1).unwrap().t, "Sample Title (max 70 chars)");
}

#[test]
fn ids_grow_past_deleted_nodes() {
    let (_dir, keg) = new_keg();
    for n in 1..=3 {
        let id = keg.create(&Writes("# Node\n"), false).unwrap().unwrap();
        assert_eq!(id, n);
    }
    keg.delete(2).unwrap();
    assert_eq!(keg.create(&Writes("# Next\n"), false).unwrap(), Some(4));

    let ids: Vec<_> = keg.dex().unwrap().iter().map(|e| e.n).collect();
    assert_eq!(ids, vec![0, 1, 3, 4]);
    assert!(matches!(keg.delete(2), Err(KegError::NodeNotFound(2))));
}

#[test]
fn titles_follow_front_matter_then_heading() {
    let (_dir, keg) = new_keg();
    keg.create(&Writes("---\ntitle: From Meta\n---\n\n# From Heading\n"), false).unwrap();
    keg.create(&Writes("Just a paragraph, no heading.\n"), false).unwrap();

    assert_eq!(keg.lookup(1).unwrap().t, "From Meta");
    assert_eq!(keg.lookup(2).unwrap().t, "");
    assert!(table(&keg).lines().any(|l| l.starts_with("2\t") && l.ends_with('\t')));
}

#[test]
fn changes_are_newest_first_and_rebuild_is_stable() {
    let (_dir, keg) = new_keg();
    for body in ["# A\n", "# B\n", "# C\n"] {
        keg.create(&Writes(body), false).unwrap();
    }
    let base = 1_700_000_000;
    for (id, offset) in [(0, 0), (1, 300), (2, 100), (3, 200)] {
        set_mtime(&keg.store().content_path(id), base + offset);
    }

    keg.publisher().rebuild().unwrap();
    let changes: Vec<_> = keg.changes(10).unwrap().iter().map(|e| e.n).collect();
    assert_eq!(changes, vec![1, 3, 2, 0]);
    assert_eq!(keg.changes(2).unwrap().len(), 2);
    assert_eq!(keg.last_changed().unwrap().u, parse_time("2023-11-14 22:18:20Z").unwrap());

    let tsv = table(&keg);
    let md = fs::read_to_string(keg.path().join("dex/changes.md")).unwrap();
    keg.publisher().rebuild().unwrap();
    assert_eq!(table(&keg), tsv);
    assert_eq!(fs::read_to_string(keg.path().join("dex/changes.md")).unwrap(), md);
}

#[test]
fn missing_artifacts_are_rebuilt_on_read() {
    let (_dir, keg) = new_keg();
    keg.create(&Writes("# Kept\n"), false).unwrap();
    fs::remove_dir_all(keg.path().join("dex")).unwrap();

    assert_eq!(keg.changes(5).unwrap().len(), 2);
    assert_eq!(keg.dex().unwrap().len(), 2);
}

#[test]
fn title_search_ignores_case_by_default() {
    let (_dir, keg) = new_keg();
    keg.create(&Writes("# Rust Traits\n"), false).unwrap();
    keg.create(&Writes("# Go interfaces\n"), false).unwrap();

    let hits: Vec<_> = keg.titles("rust").unwrap().iter().map(|e| e.n).collect();
    assert_eq!(hits, vec![1]);
    assert!(keg.titles("python").unwrap().is_empty());

    let hit = keg.resolve(&Target::Pattern("traits".into()), &mut Picks(0)).unwrap();
    assert_eq!(hit.map(|e| e.n), Some(1));
    assert!(matches!(
        keg.resolve(&Target::Pattern("python".into()), &mut Picks(0)),
        Err(KegError::NoCandidates)
    ));
}

#[test]
fn resolve_same_last_and_id() {
    let (_dir, keg) = new_keg();
    keg.create(&Writes("# One\n"), false).unwrap();
    keg.create(&Writes("# Two\n"), false).unwrap();
    set_mtime(&keg.store().content_path(1), 1_000_000);
    keg.edit(1, &Writes("# One Again\n")).unwrap();

    let same = keg.resolve(&"same".parse().unwrap(), &mut Picks(0)).unwrap().unwrap();
    assert_eq!(same.n, 1);
    let last = keg.resolve(&"last".parse().unwrap(), &mut Picks(0)).unwrap().unwrap();
    assert_eq!(last.n, 2);
    assert!(keg.resolve(&Target::Id(9), &mut Picks(0)).is_err());
}

#[test]
fn grep_view_and_random() {
    let (_dir, keg) = new_keg();
    keg.create(&Writes("# Alpha\n\nneedle here\n"), false).unwrap();
    keg.create(&Writes("# Beta\n\nno match\nNEEDLE again\n"), false).unwrap();

    let hits: Vec<_> = keg.grep("needle").unwrap().into_iter().map(|h| (h.id, h.line)).collect();
    assert_eq!(hits, vec![(1, 3), (2, 4)]);

    assert_eq!(keg.view(1, &PlainRenderer).unwrap(), "# Alpha\n\nneedle here\n");

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        assert!(keg.random(&mut rng).unwrap().n <= 2);
    }
}

#[test]
fn import_copies_nodes_and_skips_noise() {
    let (_dir, keg) = new_keg();

    let other = tempfile::tempdir().unwrap();
    for (n, title) in [(0, "Old Zero"), (5, "Old Five")] {
        let node = other.path().join(n.to_string());
        fs::create_dir(&node).unwrap();
        fs::write(node.join("README.md"), format!("# {}\n", title)).unwrap();
        fs::write(node.join("notes.txt~"), "backup").unwrap();
    }
    fs::create_dir(other.path().join("dex")).unwrap();

    let ids = keg.import(&[other.path().to_path_buf()]).unwrap();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(keg.lookup(1).unwrap().t, "Old Zero");
    assert_eq!(keg.lookup(2).unwrap().t, "Old Five");
    assert!(!keg.node_dir(1).join("notes.txt~").exists());

    let inside = keg.node_dir(1);
    assert!(keg.import(&[inside]).is_err());
}
