use std::fs;

use tempfile::TempDir;

use dory_index::{IndexHandle, VaultIndex, TOP_HEADING};

fn vault_with(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }
    dir
}

#[test]
fn builds_sections_and_notes() {
    let dir = vault_with(&[
        (
            "Pricing.md",
            "# Priser\n\n| Basis | 499 kr. |\n\n## Detaljer\nmere tekst\n",
        ),
        ("notes/Plain.md", "just a line\nand another\n"),
        ("ignored.txt", "not markdown"),
    ]);
    let index = VaultIndex::build(Some(dir.path()));

    assert_eq!(index.notes().count(), 2);
    let plain: Vec<_> = index
        .sections()
        .iter()
        .filter(|s| s.path.ends_with("Plain.md"))
        .collect();
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].heading, TOP_HEADING);
    assert_eq!((plain[0].line_start, plain[0].line_end), (1, 2));

    let pricing: Vec<_> = index
        .sections()
        .iter()
        .filter(|s| s.path == "Pricing.md")
        .collect();
    assert_eq!(pricing.len(), 2);
    assert_eq!(pricing[0].heading, "Priser");
    assert_eq!(pricing[1].heading, "Detaljer");
}

#[test]
fn empty_file_produces_no_sections() {
    let dir = vault_with(&[("Empty.md", "")]);
    let index = VaultIndex::build(Some(dir.path()));
    assert_eq!(index.notes().count(), 1);
    assert!(index.sections().is_empty());
}

#[test]
fn missing_root_yields_empty_index() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("nope");
    let index = VaultIndex::build(Some(&missing));
    assert!(index.is_empty());
    assert!(index.find_sections("anything", 5).is_empty());
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("Broken.md"), b"# Heading\nbad \xff byte\n").expect("write");
    let index = VaultIndex::build(Some(dir.path()));
    assert_eq!(index.sections().len(), 1);
    assert!(index.sections()[0].text.contains("bad"));
}

#[test]
fn alias_match_boosts_and_resolves_paths() {
    let dir = vault_with(&[
        ("GS1_Denmark-Overview.md", "facts about the organisation\n"),
        ("Unrelated.md", "# Andet\nnoget andet\n"),
    ]);
    let index = VaultIndex::build(Some(dir.path()));

    let paths = index.find_paths_by_alias("tell me about gs1 denmark please");
    assert_eq!(paths, vec!["GS1_Denmark-Overview.md".to_string()]);

    let hits = index.find_sections("gs1 denmark organisation", 5);
    assert!(!hits.is_empty());
    assert_eq!(hits[0].path, "GS1_Denmark-Overview.md");
    assert!(hits[0].score >= 20.0);
}

#[test]
fn sections_for_paths_preserves_order() {
    let dir = vault_with(&[
        ("A.md", "# One\nx\n# Two\ny\n"),
        ("B.md", "# Three\nz\n"),
    ]);
    let index = VaultIndex::build(Some(dir.path()));
    let sections = index.sections_for_paths(&["A.md".to_string()]);
    let headings: Vec<_> = sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(headings, vec!["One", "Two"]);
}

#[test]
fn open_note_reads_and_truncates() {
    let dir = vault_with(&[("Long.md", "0123456789abcdef")]);
    let index = VaultIndex::build(Some(dir.path()));
    let full = index.open_note("Long.md", 100).expect("open");
    assert_eq!(full, "0123456789abcdef");
    let clipped = index.open_note("Long.md", 4).expect("open");
    assert_eq!(clipped, "0123\n...\n");
}

#[test]
fn open_note_rejects_traversal() {
    let dir = vault_with(&[("Note.md", "content")]);
    let index = VaultIndex::build(Some(dir.path()));
    assert!(index.open_note("../outside.md", 100).is_err());
    assert!(index.open_note("/etc/passwd", 100).is_err());
    assert!(index.open_note("missing.md", 100).is_err());
}

#[test]
fn handle_swaps_snapshots_on_rebuild() {
    let dir = vault_with(&[("First.md", "# A\ntext\n")]);
    let handle = IndexHandle::deferred(Some(dir.path().to_path_buf()));
    let before = handle.snapshot();
    assert!(before.is_empty());

    let built = handle.ensure_built();
    assert_eq!(built.sections().len(), 1);
    // the pre-build snapshot is unchanged
    assert!(before.is_empty());

    fs::write(dir.path().join("Second.md"), "# B\nmore\n").expect("write");
    let rebuilt = handle.rebuild();
    assert_eq!(rebuilt.sections().len(), 2);
    assert_eq!(built.sections().len(), 1);
}
