//! Grouping of assigned pages by student.

use serde::Serialize;
use std::collections::HashMap;

use super::assign::PageRecord;

/// All pages of one student, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGroup {
    /// The student's routing key.
    pub routing_key: String,
    /// The student's pages.
    pub pages: Vec<PageRecord>,
}

/// Group assigned records by routing key.
///
/// Groups appear in the order their key is first seen. Unassigned records
/// are skipped.
pub fn group(records: &[PageRecord]) -> Vec<StudentGroup> {
    let mut groups: Vec<StudentGroup> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let Some(key) = record.routing_key.as_deref() else {
            continue;
        };

        match positions.get(key) {
            Some(&position) => groups[position].pages.push(record.clone()),
            None => {
                positions.insert(key, groups.len());
                groups.push(StudentGroup {
                    routing_key: key.to_string(),
                    pages: vec![record.clone()],
                });
            }
        }
    }

    groups
}
