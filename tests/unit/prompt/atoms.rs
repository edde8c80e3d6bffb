//! Validates atom file loading, stripping, caching, and selection

use comfywall::math::probability::RandomSelector;
use comfywall::prompt::atoms::AtomStore;
use comfywall::PipelineError;
use std::fs;

fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, AtomStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, content) in files {
        let path = dir.path().join(format!("{name}.txt"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create atom subdir");
        }
        fs::write(&path, content).expect("write atom file");
    }
    let store = AtomStore::new(dir.path().to_path_buf());
    (dir, store)
}

#[test]
fn test_comments_and_blanks_stripped() {
    let (_dir, mut store) = store_with(&[(
        "color",
        "# palette\nred\n\n  \n  green  \n# trailing comment\nblue\n",
    )]);

    let atoms = store.lookup("color").expect("atoms load");
    assert_eq!(atoms, ["red", "green", "blue"]);
}

#[test]
fn test_line_order_preserved() {
    let (_dir, mut store) = store_with(&[("moods", "somber\nvivid\nquiet\n")]);
    let atoms = store.lookup("moods").expect("atoms load");
    assert_eq!(atoms, ["somber", "vivid", "quiet"]);
}

#[test]
fn test_nested_names_resolve_subdirectories() {
    let (_dir, mut store) = store_with(&[("subjects/nature", "forest\n")]);
    let atoms = store.lookup("subjects/nature").expect("atoms load");
    assert_eq!(atoms, ["forest"]);
}

#[test]
fn test_missing_file_reports_name_and_path() {
    let (_dir, mut store) = store_with(&[]);
    let error = store.lookup("absent").expect_err("must fail");
    match error {
        PipelineError::AtomMissing { name, path } => {
            assert_eq!(name, "absent");
            assert!(path.to_string_lossy().ends_with("absent.txt"));
        }
        other => panic!("expected AtomMissing, got {other:?}"),
    }
}

#[test]
fn test_empty_after_stripping_is_atom_empty() {
    let (_dir, mut store) = store_with(&[("hollow", "# only comments\n\n")]);
    let mut selector = RandomSelector::new(1);
    let error = store.select("hollow", &mut selector).expect_err("must fail");
    assert!(matches!(error, PipelineError::AtomEmpty { .. }));
}

#[test]
fn test_contents_cached_after_first_read() {
    let (dir, mut store) = store_with(&[("color", "red\n")]);
    store.lookup("color").expect("first load");

    // Rewrite on disk; the cached copy must win for the process lifetime
    fs::write(dir.path().join("color.txt"), "blue\n").expect("rewrite");
    let atoms = store.lookup("color").expect("cached load");
    assert_eq!(atoms, ["red"]);
}

#[test]
fn test_select_returns_a_candidate() {
    let (_dir, mut store) = store_with(&[("color", "red\ngreen\nblue\n")]);
    let mut selector = RandomSelector::new(42);
    let picked = store.select("color", &mut selector).expect("selection");
    assert!(["red", "green", "blue"].contains(&picked.as_str()));
}

#[test]
fn test_select_single_candidate_is_that_candidate() {
    let (_dir, mut store) = store_with(&[("only", "lone atom\n")]);
    let mut selector = RandomSelector::new(9);
    assert_eq!(store.select("only", &mut selector).expect("selection"), "lone atom");
}
