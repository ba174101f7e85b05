//! Integration tests for packrat
//!
//! These tests drive whole runs through the public API:
//! 1. Pack and unpack round trips
//! 2. Archive idempotence
//! 3. Duplicate handling before packing
//! 4. Dry-run mode verification
//! 5. Configuration and filtering
//! 6. Unpack target selection

use packrat::cli::{OrganizeSummary, RunOptions, organize_directory};
use packrat::config::{Config, Settings};
use packrat::container::ContainerManager;
use packrat::dry_run;
use packrat::file_organizer::PackMode;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary target directory plus the configuration used against it.
struct TestFixture {
    temp_dir: TempDir,
    config: Config,
}

impl TestFixture {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir, config }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn create_text_file(&self, name: &str, content: &str) {
        fs::write(self.path().join(name), content).expect("Failed to write file content");
    }

    fn create_files(&self, files: &[(&str, &str)]) {
        for (name, content) in files {
            self.create_text_file(name, content);
        }
    }

    fn settings(&mut self, delete: bool, rename: bool) {
        self.config.settings = Settings {
            delete_duplicate_files: delete,
            rename_orphaned_duplicates: rename,
            ..Default::default()
        };
    }

    fn containers(&self) -> ContainerManager {
        ContainerManager::new(
            self.path(),
            self.config.category_index().expect("valid categories"),
        )
    }

    fn run(&self, options: RunOptions) -> OrganizeSummary {
        let filters = self.config.compile_filters().expect("valid filters");
        organize_directory(&self.containers(), &filters, &self.config.settings, &options)
            .expect("run should start")
    }

    /// Every regular file under the target, keyed by relative path.
    fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, String>) {
            for entry in fs::read_dir(dir).expect("readable directory") {
                let path = entry.expect("readable entry").path();
                if path.is_dir() {
                    walk(root, &path, out);
                } else {
                    let content = fs::read(&path).expect("readable file");
                    out.insert(
                        path.strip_prefix(root).unwrap().to_path_buf(),
                        String::from_utf8_lossy(&content).into_owned(),
                    );
                }
            }
        }
        let mut out = BTreeMap::new();
        walk(self.path(), self.path(), &mut out);
        out
    }

    fn top_level_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path())
            .expect("readable directory")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn archive_members(&self, archive: &str) -> Vec<String> {
        let file = fs::File::open(self.path().join(archive)).expect("archive exists");
        let mut names: Vec<String> = ZipArchive::new(file)
            .expect("valid archive")
            .file_names()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    fn read_member(&self, archive: &str, member: &str) -> String {
        let file = fs::File::open(self.path().join(archive)).expect("archive exists");
        let mut zip = ZipArchive::new(file).expect("valid archive");
        let mut content = String::new();
        zip.by_name(member)
            .expect("member exists")
            .read_to_string(&mut content)
            .expect("readable member");
        content
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "Path should not exist: {}", path.display());
    }
}

fn pack(mode: PackMode) -> RunOptions {
    RunOptions {
        mode: Some(mode),
        ..Default::default()
    }
}

fn unpack_all() -> RunOptions {
    RunOptions {
        unpack: Some(Vec::new()),
        ..Default::default()
    }
}

fn sample_files(fixture: &TestFixture) {
    fixture.create_files(&[
        ("photo.JPG", "jpeg bytes"),
        ("song.mp3", "mp3 bytes"),
        ("notes.txt", "some notes"),
        ("report.pdf", "pdf bytes"),
        ("backup.tar.gz", "tarball"),
        ("Makefile", "all:"),
        ("weird.qqq", "???"),
    ]);
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_move_then_unpack_restores_directory() {
    let fixture = TestFixture::new();
    sample_files(&fixture);
    let before = fixture.snapshot();

    let summary = fixture.run(pack(PackMode::Move));
    assert!(summary.all());
    fixture.assert_file_exists("images/photo.JPG");
    fixture.assert_file_exists("audio/song.mp3");
    fixture.assert_file_exists("documents/notes.txt");
    fixture.assert_file_exists("archives/backup.tar.gz");
    fixture.assert_file_exists("unknowns/Makefile");
    fixture.assert_file_exists("unknowns/weird.qqq");
    assert!(summary.unknown_extensions.contains(&"qqq".to_string()));
    assert!(summary.unknown_extensions.contains(&"<none>".to_string()));

    let summary = fixture.run(unpack_all());
    assert!(summary.all());
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_archive_then_unpack_restores_directory() {
    let fixture = TestFixture::new();
    sample_files(&fixture);
    let before = fixture.snapshot();

    let summary = fixture.run(pack(PackMode::Archive));
    assert!(summary.all());
    assert_eq!(
        fixture.top_level_names(),
        vec![
            "archives.zip",
            "audio.zip",
            "documents.zip",
            "images.zip",
            "unknowns.zip"
        ]
    );
    assert_eq!(
        fixture.archive_members("documents.zip"),
        vec!["notes.txt", "report.pdf"]
    );
    assert_eq!(fixture.read_member("documents.zip", "notes.txt"), "some notes");

    let summary = fixture.run(unpack_all());
    assert!(summary.all());
    let unpack = summary.unpack.as_ref().unwrap();
    assert_eq!(unpack.removed_containers.len(), 5);
    assert_eq!(fixture.snapshot(), before);
}

// ============================================================================
// Archive idempotence
// ============================================================================

#[test]
fn test_archive_twice_does_not_duplicate_members() {
    let fixture = TestFixture::new();
    fixture.create_text_file("notes.txt", "first");
    fixture.run(pack(PackMode::Archive));

    fixture.create_text_file("notes.txt", "second");
    let summary = fixture.run(pack(PackMode::Archive));

    let pack_report = summary.pack.as_ref().unwrap();
    assert!(summary.all());
    assert_eq!(pack_report.skipped.len(), 1);
    assert_eq!(fixture.archive_members("documents.zip"), vec!["notes.txt"]);
    assert_eq!(fixture.read_member("documents.zip", "notes.txt"), "first");
    fixture.assert_file_exists("notes.txt");
}

#[test]
fn test_user_zip_is_packed_but_own_archives_are_not() {
    let fixture = TestFixture::new();
    fixture.create_text_file("holiday.zip", "not really a zip");
    fixture.create_text_file("notes.txt", "n");
    fixture.run(pack(PackMode::Archive));

    let summary = fixture.run(pack(PackMode::Archive));
    assert_eq!(summary.pack.as_ref().unwrap().total_processed(), 0);
    assert_eq!(fixture.archive_members("archives.zip"), vec!["holiday.zip"]);
}

// ============================================================================
// Duplicate handling
// ============================================================================

#[test]
fn test_dedupe_then_move() {
    let mut fixture = TestFixture::new();
    fixture.settings(true, true);
    fixture.create_files(&[
        ("song.mp3", "original"),
        ("song (1).mp3", "copy"),
        ("song (2nd copy).mp3", "copy"),
        ("lonely (Copy).txt", "orphan"),
    ]);

    let summary = fixture.run(RunOptions {
        remove_duplicates: true,
        mode: Some(PackMode::Move),
        ..Default::default()
    });

    assert!(summary.all());
    let reconcile = summary.reconcile.as_ref().unwrap();
    assert_eq!(reconcile.duplicates_removed.len(), 2);
    assert_eq!(reconcile.orphans_renamed.len(), 1);
    assert_eq!(
        fs::read_to_string(fixture.path().join("audio/song.mp3")).unwrap(),
        "original"
    );
    assert_eq!(
        fs::read_to_string(fixture.path().join("documents/lonely.txt")).unwrap(),
        "orphan"
    );
    fixture.assert_not_exists("audio/song (1).mp3");
}

#[test]
fn test_dedupe_without_settings_changes_nothing_but_fails() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("a.txt", "a"), ("a (1).txt", "a"), ("b (copy).txt", "b")]);
    let before = fixture.snapshot();

    let summary = fixture.run(RunOptions {
        remove_duplicates: true,
        ..Default::default()
    });

    assert!(!summary.all());
    assert!(summary.reconcile.as_ref().unwrap().no_action_enabled);
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_irregular_ordinal_is_not_a_copy() {
    let mut fixture = TestFixture::new();
    fixture.settings(true, true);
    fixture.create_files(&[("a.txt", "a"), ("a (11st copy).txt", "odd")]);

    let summary = fixture.run(RunOptions {
        remove_duplicates: true,
        ..Default::default()
    });

    assert!(summary.all());
    fixture.assert_file_exists("a (11st copy).txt");
}

// ============================================================================
// Dry run
// ============================================================================

#[test]
fn test_dry_run_mutates_nothing() {
    let mut fixture = TestFixture::new();
    fixture.settings(true, true);
    sample_files(&fixture);
    fixture.create_files(&[("notes (1).txt", "dup"), ("solo (copy).pdf", "orphan")]);
    fs::create_dir(fixture.path().join("videos")).unwrap();
    let before = fixture.snapshot();
    let names_before = fixture.top_level_names();

    let filters = fixture.config.compile_filters().unwrap();
    let options = RunOptions {
        unpack: Some(Vec::new()),
        remove_duplicates: true,
        mode: Some(PackMode::Archive),
    };
    let plan = dry_run::plan(
        &fixture.containers(),
        &filters,
        &fixture.config.settings,
        &options,
    )
    .unwrap();

    assert_eq!(plan.unpack_targets, vec![fixture.path().join("videos")]);
    assert_eq!(plan.deletions, vec![fixture.path().join("notes (1).txt")]);
    assert_eq!(plan.renames.len(), 1);
    assert!(!plan.placements.is_empty());
    assert_eq!(fixture.snapshot(), before);
    assert_eq!(fixture.top_level_names(), names_before);
}

// ============================================================================
// Configuration and filtering
// ============================================================================

#[test]
fn test_custom_categories_and_filters_from_file() {
    let config_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = config_dir.path().join("packrat.toml");
    fs::write(
        &config_path,
        r#"
        [filters.exclude]
        filenames = ["keep.txt"]
        patterns = ["*.part"]

        [categories]
        text = ["txt", "md"]
        pictures = ["png"]
        notes = ["txt"]
        "#,
    )
    .unwrap();

    let fixture = TestFixture::with_config(Config::load(Some(config_path.as_path())).unwrap());
    fixture.create_files(&[
        ("a.txt", "a"),
        ("b.png", "b"),
        ("keep.txt", "k"),
        ("movie.mkv.part", "partial"),
        (".hidden.png", "h"),
    ]);

    let summary = fixture.run(pack(PackMode::Move));

    assert!(summary.all());
    fixture.assert_file_exists("text/a.txt");
    fixture.assert_file_exists("pictures/b.png");
    fixture.assert_file_exists("keep.txt");
    fixture.assert_file_exists("movie.mkv.part");
    fixture.assert_file_exists(".hidden.png");
    fixture.assert_not_exists("notes");
}

#[test]
fn test_unpack_ignores_folders_outside_categories() {
    let fixture = TestFixture::new();
    fs::create_dir(fixture.path().join("holiday")).unwrap();
    fixture.create_text_file("holiday/beach.png", "sand");

    let summary = fixture.run(unpack_all());

    assert!(summary.all());
    fixture.assert_file_exists("holiday/beach.png");
    fixture.assert_not_exists("beach.png");
}

// ============================================================================
// Unpack target selection
// ============================================================================

#[test]
fn test_unpack_missing_target_fails_but_later_phases_run() {
    let fixture = TestFixture::new();
    fixture.create_text_file("notes.txt", "n");

    let summary = fixture.run(RunOptions {
        unpack: Some(vec!["nothing.zip".to_string()]),
        mode: Some(PackMode::Move),
        ..Default::default()
    });

    assert!(!summary.unpack_succeeded());
    assert!(summary.pack_succeeded());
    assert!(!summary.all());
    fixture.assert_file_exists("documents/notes.txt");
}

#[test]
fn test_unpack_selected_container_only() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("notes.txt", "n"), ("photo.png", "p")]);
    fixture.run(pack(PackMode::Archive));

    let summary = fixture.run(RunOptions {
        unpack: Some(vec!["images.zip".to_string()]),
        ..Default::default()
    });

    assert!(summary.all());
    fixture.assert_file_exists("photo.png");
    fixture.assert_not_exists("images.zip");
    fixture.assert_file_exists("documents.zip");
    fixture.assert_not_exists("notes.txt");
}
