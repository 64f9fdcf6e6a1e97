// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;

fn package(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (rel, body) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
    dir
}

#[test]
fn same_tree_same_hash() {
    let a = package(&[("package.json", "{}"), ("src/index.js", "1")]);
    let b = package(&[("src/index.js", "1"), ("package.json", "{}")]);
    assert_eq!(hash_artifact(a.path(), &[]).unwrap(), hash_artifact(b.path(), &[]).unwrap());
}

#[test]
fn content_change_changes_hash() {
    let a = package(&[("src/index.js", "1")]);
    let b = package(&[("src/index.js", "2")]);
    assert_ne!(hash_artifact(a.path(), &[]).unwrap(), hash_artifact(b.path(), &[]).unwrap());
}

#[test]
fn rename_changes_hash() {
    let a = package(&[("src/a.js", "1")]);
    let b = package(&[("src/b.js", "1")]);
    assert_ne!(hash_artifact(a.path(), &[]).unwrap(), hash_artifact(b.path(), &[]).unwrap());
}

#[test]
fn ignored_directories_do_not_count() {
    let a = package(&[("src/index.js", "1")]);
    let b = package(&[("src/index.js", "1"), ("node_modules/x/index.js", "junk")]);
    assert_eq!(hash_artifact(a.path(), &[]).unwrap(), hash_artifact(b.path(), &[]).unwrap());
}

#[test]
fn dependency_hashes_are_order_independent() {
    let a = package(&[("src/index.js", "1")]);
    let h1 = hash_artifact(a.path(), &["x", "y"]).unwrap();
    let h2 = hash_artifact(a.path(), &["y", "x"]).unwrap();
    let h3 = hash_artifact(a.path(), &["x"]).unwrap();
    assert_eq!(h1, h2);
    assert_ne!(h1, h3);
}

#[test]
fn hash_str_is_hex_sha256() {
    assert_eq!(
        hash_str(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
