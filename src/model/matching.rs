//! Match classification output types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::{Source, SourceRecord};

/// Per-field comparison outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldTag {
    Match,
    Partial,
    Close,
    Different,
    /// Both sides present and unequal where equality is expected (industry code)
    Mismatch,
    /// One side is missing the value, nothing to compare
    Inconclusive,
}

impl FieldTag {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldTag::Match => "match",
            FieldTag::Partial => "partial",
            FieldTag::Close => "close",
            FieldTag::Different => "different",
            FieldTag::Mismatch => "mismatch",
            FieldTag::Inconclusive => "inconclusive",
        }
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level tag table, only computed when both providers returned a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTags {
    pub title: FieldTag,
    pub artist: FieldTag,
    pub album: FieldTag,
    pub isrc: FieldTag,
    pub duration: FieldTag,
    pub release_date: FieldTag,
}

impl FieldTags {
    /// `(field name, tag)` pairs in display order
    pub fn entries(&self) -> [(&'static str, FieldTag); 6] {
        [
            ("title", self.title),
            ("artist", self.artist),
            ("album", self.album),
            ("isrc", self.isrc),
            ("duration", self.duration),
            ("releaseDate", self.release_date),
        ]
    }
}

/// Overall reconciliation status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Matched,
    Partial,
    Unmatched,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchStatus::Matched => "matched",
            MatchStatus::Partial => "partial",
            MatchStatus::Unmatched => "unmatched",
        })
    }
}

/// Pairing of up to one record per provider for a single query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Generation of the query that produced this result (0 for immediate lookups)
    pub generation: u64,
    pub spotify: Option<SourceRecord>,
    pub musicbrainz: Option<SourceRecord>,
    pub fields: Option<FieldTags>,
    pub status: MatchStatus,
}

impl MatchResult {
    pub fn record(&self, source: Source) -> Option<&SourceRecord> {
        match source {
            Source::Spotify => self.spotify.as_ref(),
            Source::MusicBrainz => self.musicbrainz.as_ref(),
        }
    }

    /// Record to promote into a list: the streaming catalog's when present
    pub fn preferred_record(&self) -> Option<&SourceRecord> {
        self.spotify.as_ref().or(self.musicbrainz.as_ref())
    }
}
