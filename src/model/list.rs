//! Saved list data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{Source, SourceRecord};

pub const DEFAULT_LIST_NAME: &str = "Untitled list";

/// A frozen snapshot of a record taken when it was added to a list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub record: SourceRecord,
    pub added_at: DateTime<Utc>,
}

/// A named, ordered collection of previously matched records
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedList {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<ListItem>,
}

impl SavedList {
    pub fn contains(&self, source: Source, id: &str) -> bool {
        self.position(source, id).is_some()
    }

    pub fn position(&self, source: Source, id: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.record.key() == (source, id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
