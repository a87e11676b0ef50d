//! List store - named, ordered lists of matched records
//!
//! The store owns the collection and is the only writer to durable storage.
//! Every successful mutation bumps the list's update timestamp and persists
//! the whole collection before returning. Order changes only through the
//! explicit move and sort operations.

mod storage;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{DEFAULT_LIST_NAME, ListItem, SavedList, Source, SourceRecord};

pub use storage::{JsonFileStorage, ListStorage, MemoryStorage, STORAGE_KEY};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no list with id '{0}'")]
    ListNotFound(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored lists are unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Already first (move up) or last (move down)
    AtBoundary,
    OutOfRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Artist,
    Title,
    Album,
    /// Newest first, undated items last
    ReleaseDate,
    AddedAt,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "artist" => Ok(SortKey::Artist),
            "title" => Ok(SortKey::Title),
            "album" => Ok(SortKey::Album),
            "releasedate" => Ok(SortKey::ReleaseDate),
            "addedat" => Ok(SortKey::AddedAt),
            other => Err(format!(
                "unknown sort key '{}' (expected artist, title, album, releaseDate or addedAt)",
                other
            )),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Artist => "artist",
            SortKey::Title => "title",
            SortKey::Album => "album",
            SortKey::ReleaseDate => "releaseDate",
            SortKey::AddedAt => "addedAt",
        })
    }
}

pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

pub struct ListStore<S: ListStorage> {
    storage: S,
    lists: Vec<SavedList>,
    clock: Clock,
}

impl<S: ListStorage> ListStore<S> {
    /// Load the persisted collection
    pub fn open(storage: S) -> Result<Self, StoreError> {
        Self::with_clock(storage, Box::new(Utc::now))
    }

    pub fn with_clock(storage: S, clock: Clock) -> Result<Self, StoreError> {
        let lists = storage.load()?;
        Ok(Self {
            storage,
            lists,
            clock,
        })
    }

    pub fn lists(&self) -> &[SavedList] {
        &self.lists
    }

    pub fn get(&self, list_id: &str) -> Option<&SavedList> {
        self.lists.iter().find(|l| l.id == list_id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SavedList> {
        let name = name.trim();
        self.lists.iter().find(|l| l.name == name)
    }

    pub fn create_list(&mut self, name: &str) -> Result<&SavedList, StoreError> {
        let now = (self.clock)();
        let list = SavedList {
            id: uuid::Uuid::new_v4().to_string(),
            name: list_name(name),
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };
        let (id, name) = (list.id.clone(), list.name.clone());
        self.commit(|lists| {
            lists.push(list);
            Ok(((), true))
        })?;
        tracing::info!(list_id = %id, name = %name, "Created list");
        Ok(&self.lists[self.lists.len() - 1])
    }

    /// Append a frozen snapshot; a second add of the same `(source, id)` is a no-op
    pub fn add_item(&mut self, list_id: &str, record: &SourceRecord) -> Result<AddOutcome, StoreError> {
        let now = (self.clock)();
        self.commit(|lists| {
            let list = find_list(lists, list_id)?;
            if list.contains(record.source, &record.id) {
                tracing::debug!(list_id, source = %record.source, id = %record.id, "Item already in list");
                return Ok((AddOutcome::AlreadyPresent, false));
            }
            list.items.push(ListItem {
                record: record.clone(),
                added_at: now,
            });
            list.updated_at = now;
            Ok((AddOutcome::Added, true))
        })
    }

    /// Returns whether an item was removed
    pub fn remove_item(&mut self, list_id: &str, source: Source, id: &str) -> Result<bool, StoreError> {
        let now = (self.clock)();
        self.commit(|lists| {
            let list = find_list(lists, list_id)?;
            let Some(index) = list.position(source, id) else {
                return Ok((false, false));
            };
            list.items.remove(index);
            list.updated_at = now;
            Ok((true, true))
        })
    }

    pub fn move_up(&mut self, list_id: &str, index: usize) -> Result<MoveOutcome, StoreError> {
        let now = (self.clock)();
        self.commit(|lists| {
            let list = find_list(lists, list_id)?;
            if index >= list.items.len() {
                return Ok((MoveOutcome::OutOfRange, false));
            }
            if index == 0 {
                return Ok((MoveOutcome::AtBoundary, false));
            }
            list.items.swap(index - 1, index);
            list.updated_at = now;
            Ok((MoveOutcome::Moved, true))
        })
    }

    pub fn move_down(&mut self, list_id: &str, index: usize) -> Result<MoveOutcome, StoreError> {
        let now = (self.clock)();
        self.commit(|lists| {
            let list = find_list(lists, list_id)?;
            if index >= list.items.len() {
                return Ok((MoveOutcome::OutOfRange, false));
            }
            if index + 1 == list.items.len() {
                return Ok((MoveOutcome::AtBoundary, false));
            }
            list.items.swap(index, index + 1);
            list.updated_at = now;
            Ok((MoveOutcome::Moved, true))
        })
    }

    pub fn rename(&mut self, list_id: &str, name: &str) -> Result<(), StoreError> {
        let now = (self.clock)();
        self.commit(|lists| {
            let list = find_list(lists, list_id)?;
            list.name = list_name(name);
            list.updated_at = now;
            Ok(((), true))
        })
    }

    pub fn delete_list(&mut self, list_id: &str) -> Result<(), StoreError> {
        self.commit(|lists| {
            let before = lists.len();
            lists.retain(|l| l.id != list_id);
            if lists.len() == before {
                return Err(StoreError::ListNotFound(list_id.to_string()));
            }
            Ok(((), true))
        })?;
        tracing::info!(list_id, "Deleted list");
        Ok(())
    }

    /// Replace the stored order with the sorted order
    pub fn sort_by(&mut self, list_id: &str, key: SortKey) -> Result<(), StoreError> {
        let now = (self.clock)();
        self.commit(|lists| {
            let list = find_list(lists, list_id)?;
            list.items.sort_by(|a, b| compare_items(a, b, key));
            list.updated_at = now;
            Ok(((), true))
        })?;
        tracing::debug!(list_id, key = %key, "Sorted list");
        Ok(())
    }

    /// Apply `change` to a copy of the collection and adopt the copy only once
    /// it is durably saved. `change` reports whether anything changed; no-ops
    /// are not persisted.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Vec<SavedList>) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let mut next = self.lists.clone();
        let (outcome, changed) = change(&mut next)?;
        if changed {
            self.storage.save(&next).inspect_err(|e| {
                tracing::error!(error = %e, "Failed to persist saved lists");
            })?;
            self.lists = next;
        }
        Ok(outcome)
    }
}

fn find_list<'a>(lists: &'a mut [SavedList], list_id: &str) -> Result<&'a mut SavedList, StoreError> {
    lists
        .iter_mut()
        .find(|l| l.id == list_id)
        .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))
}

fn list_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        DEFAULT_LIST_NAME.to_string()
    } else {
        name.to_string()
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_items(a: &ListItem, b: &ListItem, key: SortKey) -> Ordering {
    match key {
        SortKey::Artist => compare_text(&a.record.artist, &b.record.artist),
        SortKey::Title => compare_text(&a.record.title, &b.record.title),
        SortKey::Album => compare_text(&a.record.album, &b.record.album),
        SortKey::ReleaseDate => match (&a.record.release_date, &b.record.release_date) {
            (Some(x), Some(y)) => y.cmp(x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::AddedAt => a.added_at.cmp(&b.added_at),
    }
}
