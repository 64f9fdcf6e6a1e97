// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic content hashing for artifacts.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Directory names never included in an artifact hash.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "target", "dist"];

/// Hex SHA-256 of a string.
pub fn hash_str(s: &str) -> String {
    format!("{:x}", Sha256::digest(s.as_bytes()))
}

/// Hash a package directory together with the hashes of its dependencies.
///
/// Files are visited in sorted relative-path order and each contributes its
/// path and bytes; dependency hashes are sorted first, so the result does not
/// depend on filesystem iteration order or on the order dependencies are given.
pub fn hash_artifact(dir: &Path, dependency_hashes: &[&str]) -> io::Result<String> {
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;
    files.sort();

    let mut hasher = Sha256::new();
    for rel in &files {
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(dir.join(rel))?);
        hasher.update([0u8]);
    }

    let mut deps: Vec<&str> = dependency_hashes.to_vec();
    deps.sort_unstable();
    deps.dedup();
    for dep in deps {
        hasher.update(b"dep:");
        hasher.update(dep.as_bytes());
        hasher.update([0u8]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let name = entry.file_name();
            if IGNORED_DIRS.iter().any(|d| name == *d) {
                continue;
            }
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_path_buf());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "hashing_tests.rs"]
mod tests;
