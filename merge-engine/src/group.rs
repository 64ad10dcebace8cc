//! FILENAME: merge-engine/src/group.rs
//! PURPOSE: Group Partitioner - buckets merged rows by their group-by values.
//! CONTEXT: Groups come out in the order their key is first seen; that order
//! is the order of the output tables. Every input row lands in exactly one
//! group. Without group-by columns every row shares the empty key.

use engine::Row;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::logging::{log_debug, CAT_GROUP};

/// Separator of the encoded key form. Not expected to occur in cell text.
pub const KEY_SEPARATOR: char = '\u{1F}';

/// The trimmed values of the group-by columns, in group-by order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupKey(SmallVec<[String; 4]>);

impl GroupKey {
    pub fn from_row(row: &Row, group_by: &[String]) -> Self {
        GroupKey(group_by.iter().map(|c| row.key_text(c)).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The parts joined with `KEY_SEPARATOR`.
    pub fn encoded(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(KEY_SEPARATOR);
            }
            out.push_str(part);
        }
        out
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// One output group.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: GroupKey,
    pub rows: Vec<Row>,
}

/// Partitions `rows` by `group_by`, keeping first-seen key order and source
/// order inside each group.
pub fn partition(rows: Vec<Row>, group_by: &[String]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut slot_by_key: FxHashMap<GroupKey, usize> = FxHashMap::default();

    for row in rows {
        let key = GroupKey::from_row(&row, group_by);
        match slot_by_key.get(&key) {
            Some(&slot) => groups[slot].rows.push(row),
            None => {
                slot_by_key.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    rows: vec![row],
                });
            }
        }
    }

    log_debug!(
        CAT_GROUP,
        "{} group(s) on [{}]",
        groups.len(),
        group_by.join(", ")
    );
    groups
}
