//! Model module - Records, match results and saved lists
//!
//! Plain data shared by every engine component. Organized by responsibility:
//!
//! - `record`: Provider identity and the normalized per-provider `SourceRecord`
//! - `matching`: Field tags, overall status and the transient `MatchResult`
//! - `list`: Persisted `SavedList` and its frozen item snapshots

mod record;
mod matching;
mod list;

pub use record::{Source, SourceRecord};

pub use matching::{FieldTag, FieldTags, MatchResult, MatchStatus};

pub use list::{ListItem, SavedList, DEFAULT_LIST_NAME};
