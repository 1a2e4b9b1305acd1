//! Property tests for discovery and path mapping over generated trees

use proptest::prelude::*;
use sqlfy_engine::{discover, map_path};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Relative file paths like `d1/d0/f3.tpl`
fn tree_strategy() -> impl Strategy<Value = BTreeSet<(Vec<u8>, u8, &'static str)>> {
    prop::collection::btree_set(
        (
            prop::collection::vec(0u8..3, 0..4),
            0u8..5,
            prop::sample::select(vec!["tpl", "sql", "TPL", "txt"]),
        ),
        0..20,
    )
}

fn rel_path(dirs: &[u8], file: u8, ext: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for d in dirs {
        path.push(format!("d{d}"));
    }
    path.push(format!("f{file}.{ext}"));
    path
}

/// Directory names never collide with file names, so any generated set is a valid tree
fn materialize(root: &Path, tree: &BTreeSet<(Vec<u8>, u8, &'static str)>) -> BTreeSet<PathBuf> {
    let mut written = BTreeSet::new();
    for (dirs, file, ext) in tree {
        let rel = rel_path(dirs, *file, ext);
        let full = root.join(&rel);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, "x").unwrap();
        written.insert(rel);
    }
    written
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn discovery_returns_exactly_matching_files(tree in tree_strategy()) {
        let dir = TempDir::new().unwrap();
        let written = materialize(dir.path(), &tree);

        let found: BTreeSet<PathBuf> = discover(dir.path(), ".tpl")
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        let expected: BTreeSet<PathBuf> = written
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == "tpl"))
            .collect();

        prop_assert_eq!(found, expected);
    }

    #[test]
    fn mapping_keeps_subtree_and_sets_sql_extension(
        dirs in prop::collection::vec(0u8..3, 0..4),
        file in 0u8..5,
    ) {
        let rel = rel_path(&dirs, file, "tpl");
        let source = Path::new("/proj/src").join(&rel);

        let dest = map_path(&source, Path::new("/proj/src"), Path::new("/proj/dist")).unwrap();

        prop_assert_eq!(dest.clone(), Path::new("/proj/dist").join(rel.with_extension("sql")));
        prop_assert!(dest.starts_with("/proj/dist"));
    }

    #[test]
    fn distinct_templates_map_to_distinct_outputs(
        tree in prop::collection::btree_set((prop::collection::vec(0u8..3, 0..3), 0u8..5), 1..10),
    ) {
        let outputs: BTreeSet<PathBuf> = tree
            .iter()
            .map(|(dirs, file)| {
                let source = Path::new("src").join(rel_path(dirs, *file, "tpl"));
                map_path(&source, Path::new("src"), Path::new("dist")).unwrap()
            })
            .collect();

        prop_assert_eq!(outputs.len(), tree.len());
    }
}
