//! Provider identity and normalized provider records

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which metadata provider produced a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Commercial streaming catalog
    Spotify,
    /// Open metadata database
    MusicBrainz,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Spotify => "spotify",
            Source::MusicBrainz => "musicbrainz",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Source::Spotify => "Spotify",
            Source::MusicBrainz => "MusicBrainz",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spotify" => Ok(Source::Spotify),
            "musicbrainz" | "mb" => Ok(Source::MusicBrainz),
            other => Err(format!("unknown source '{}'", other)),
        }
    }
}

/// One provider's view of a recording.
///
/// `(source, id)` identifies the record; everything else is descriptive and
/// may be empty when the provider did not supply it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub source: Source,
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub release_date: Option<String>,
    pub isrc: Option<String>,
    pub duration_ms: Option<u64>,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl SourceRecord {
    /// Identity key used for duplicate detection in lists
    pub fn key(&self) -> (Source, &str) {
        (self.source, self.id.as_str())
    }

    /// Duration formatted as `m:ss`, empty when unknown
    pub fn duration_display(&self) -> String {
        match self.duration_ms {
            Some(ms) => {
                let total_secs = ms / 1000;
                format!("{}:{:02}", total_secs / 60, total_secs % 60)
            }
            None => String::new(),
        }
    }
}
