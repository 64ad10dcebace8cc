//! FILENAME: merge-engine/src/naming.rs
//! PURPOSE: Output sheet and table naming.
//! CONTEXT: Result sheet names are user input and must be valid sheet names.
//! Output tables are named `<prefix><n>` with a counter that only moves
//! forward, skipping any name already taken (case-insensitive).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that may not appear in a sheet name.
static RESERVED_SHEET_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[:\\/*?\[\]]").expect("sheet name pattern is valid"));

/// Replaces reserved characters with '_', truncates to `max_len` characters and
/// falls back to `fallback` when nothing is left.
pub fn sanitize_sheet_name(name: &str, max_len: usize, fallback: &str) -> String {
    let replaced = RESERVED_SHEET_CHARS.replace_all(name.trim(), "_");
    let truncated: String = replaced.chars().take(max_len).collect();
    if truncated.trim().is_empty() {
        fallback.to_string()
    } else {
        truncated
    }
}

/// Hands out unique table names for one run.
#[derive(Debug, Clone)]
pub struct TableNameAllocator {
    prefix: String,
    next: u32,
    used: HashSet<String>,
}

impl TableNameAllocator {
    /// `existing` are names already present in the workbook.
    pub fn new<I, S>(prefix: impl Into<String>, existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        TableNameAllocator {
            prefix: prefix.into(),
            next: 1,
            used: existing
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// The next free name. The counter value it used is never offered again.
    pub fn allocate(&mut self) -> String {
        loop {
            let candidate = format!("{}{}", self.prefix, self.next);
            self.next += 1;
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
        }
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(&name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_reserved_and_truncates() {
        assert_eq!(sanitize_sheet_name("Q1: a/b [x]", 31, "Report"), "Q1_ a_b _x_");
        let long = "abcdefghijklmnopqrstuvwxyz0123456789";
        assert_eq!(sanitize_sheet_name(long, 31, "Report").chars().count(), 31);
        assert_eq!(sanitize_sheet_name("   ", 31, "Report"), "Report");
        assert_eq!(sanitize_sheet_name("", 31, "Report"), "Report");
    }

    #[test]
    fn allocation_skips_existing_names_case_insensitively() {
        let mut names = TableNameAllocator::new("Table_", ["table_1", "TABLE_3"]);
        assert_eq!(names.allocate(), "Table_2");
        assert_eq!(names.allocate(), "Table_4");
        assert_eq!(names.allocate(), "Table_5");
        assert!(names.is_used("TABLE_5"));
    }

    #[test]
    fn counter_never_reuses_consumed_values() {
        let mut names = TableNameAllocator::new("T", Vec::<String>::new());
        let all: Vec<String> = (0..4).map(|_| names.allocate()).collect();
        assert_eq!(all, vec!["T1", "T2", "T3", "T4"]);
    }
}
