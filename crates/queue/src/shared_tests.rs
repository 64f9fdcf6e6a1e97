// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn oldest_id_is_forgotten_first() {
    let mut recent = RecentIds::with_capacity(2);
    recent.insert("a".to_string());
    recent.insert("b".to_string());
    recent.insert("c".to_string());

    assert!(!recent.contains("a"));
    assert!(recent.contains("b"));
    assert!(recent.contains("c"));
    assert_eq!(recent.len(), 2);
}

#[test]
fn reinserting_does_not_grow() {
    let mut recent = RecentIds::with_capacity(2);
    recent.insert(1);
    recent.insert(1);
    assert_eq!(recent.len(), 1);
}
