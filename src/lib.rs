//! trackmatch - cross-reference a recording between Spotify and MusicBrainz
//!
//! Components, leaves first:
//!
//! - `query`: Normalizes raw input into a canonical `SearchQuery`
//! - `sources`: Provider adapters (Spotify, MusicBrainz)
//! - `reconciler`: Debounced, generation-tagged fan-out to both adapters
//! - `classifier`: Field-level match tags and overall status
//! - `store`: Persisted, ordered saved lists
//! - `export`: Renders a saved list into downloadable formats

pub mod auth;
pub mod classifier;
pub mod config;
pub mod export;
pub mod logging;
pub mod model;
pub mod query;
pub mod reconciler;
pub mod sources;
pub mod store;

pub use config::Config;
pub use model::{FieldTag, FieldTags, MatchResult, MatchStatus, SavedList, Source, SourceRecord};
pub use query::{QueryInput, QueryMode, SearchQuery, ValidationError};
pub use reconciler::{Phase, ReconView, Reconciler};
pub use sources::{MusicBrainzAdapter, SourceAdapter, SpotifyAdapter};
pub use store::{AddOutcome, ListStore, MoveOutcome, SortKey};
