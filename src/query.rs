//! Query normalization
//!
//! Turns raw user fields plus the active mode into one canonical, immutable
//! [`SearchQuery`]. Invalid input never reaches the provider adapters.

use std::fmt;

use rspotify::model::{AlbumId, TrackId};
use rspotify::prelude::Id;
use thiserror::Error;
use url::Url;

const ISRC_LEN: usize = 12;
const MBID_LEN: usize = 36;
const MUSICBRAINZ_HOSTS: &[&str] = &["musicbrainz.org", "www.musicbrainz.org", "beta.musicbrainz.org"];

/// Which input fields are active
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    Code,
    Keyword,
    Url,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryMode::Code => "code",
            QueryMode::Keyword => "keyword",
            QueryMode::Url => "url",
        })
    }
}

/// Raw, unvalidated form fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryInput {
    pub mode: QueryMode,
    pub code: String,
    pub artist: String,
    pub track: String,
    pub album: String,
    pub year: String,
    pub url: String,
}

impl QueryInput {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            mode: QueryMode::Code,
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn keyword(artist: impl Into<String>, track: impl Into<String>, album: impl Into<String>) -> Self {
        Self {
            mode: QueryMode::Keyword,
            artist: artist.into(),
            track: track.into(),
            album: album.into(),
            ..Default::default()
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            mode: QueryMode::Url,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = year.into();
        self
    }
}

/// Keyword search terms; `artist` plus at least one of `track`/`album`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordQuery {
    pub artist: String,
    pub track: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
}

/// A URL or URI pointing at one provider's resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderUrl {
    SpotifyTrack(String),
    SpotifyAlbum(String),
    MusicBrainzRecording(String),
}

/// Canonical query handed to the adapters
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchQuery {
    Code(String),
    Keyword(KeywordQuery),
    Url(ProviderUrl),
}

impl SearchQuery {
    pub fn mode(&self) -> QueryMode {
        match self {
            SearchQuery::Code(_) => QueryMode::Code,
            SearchQuery::Keyword(_) => QueryMode::Keyword,
            SearchQuery::Url(_) => QueryMode::Url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{mode} search is missing required field(s): {}", .fields.join(", "))]
    MissingFields {
        mode: QueryMode,
        fields: Vec<&'static str>,
    },

    #[error("'{0}' is not a plausible ISRC (expected 12 letters/digits)")]
    MalformedCode(String),

    #[error("'{0}' is not a 4-digit year")]
    MalformedYear(String),

    #[error("'{0}' is not a recognized Spotify or MusicBrainz URL")]
    UnrecognizedUrl(String),
}

/// Validate raw input and produce the canonical query
pub fn normalize(input: &QueryInput) -> Result<SearchQuery, ValidationError> {
    match input.mode {
        QueryMode::Code => normalize_code(&input.code).map(SearchQuery::Code),
        QueryMode::Keyword => normalize_keyword(input).map(SearchQuery::Keyword),
        QueryMode::Url => parse_provider_url(&input.url).map(SearchQuery::Url),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

fn normalize_code(raw: &str) -> Result<String, ValidationError> {
    let code: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_ascii_uppercase();

    if code.is_empty() {
        return Err(ValidationError::MissingFields {
            mode: QueryMode::Code,
            fields: vec!["code"],
        });
    }
    if code.len() != ISRC_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::MalformedCode(raw.trim().to_string()));
    }
    Ok(code)
}

fn normalize_keyword(input: &QueryInput) -> Result<KeywordQuery, ValidationError> {
    let artist = non_empty(&input.artist);
    let track = non_empty(&input.track);
    let album = non_empty(&input.album);

    let mut missing = Vec::new();
    if artist.is_none() {
        missing.push("artist");
    }
    if track.is_none() && album.is_none() {
        missing.push("track or album");
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields {
            mode: QueryMode::Keyword,
            fields: missing,
        });
    }

    let year = match non_empty(&input.year) {
        Some(year) if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) => Some(year),
        Some(year) => return Err(ValidationError::MalformedYear(year)),
        None => None,
    };

    Ok(KeywordQuery {
        artist: artist.unwrap_or_default(),
        track,
        album,
        year,
    })
}

/// Recognize Spotify track/album URLs and URIs and MusicBrainz recording URLs
pub fn parse_provider_url(raw: &str) -> Result<ProviderUrl, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingFields {
            mode: QueryMode::Url,
            fields: vec!["url"],
        });
    }
    let unrecognized = || ValidationError::UnrecognizedUrl(trimmed.to_string());

    if let Some(rest) = trimmed.strip_prefix("spotify:") {
        let (kind, id) = rest.split_once(':').ok_or_else(unrecognized)?;
        return spotify_resource(kind, id).ok_or_else(unrecognized);
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&with_scheme).map_err(|_| unrecognized())?;
    let host = url.host_str().ok_or_else(unrecognized)?.to_ascii_lowercase();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if host == "open.spotify.com" {
        // Localized links carry an `intl-xx` prefix segment
        let segments: Vec<&str> = segments
            .into_iter()
            .skip_while(|seg| seg.starts_with("intl-"))
            .collect();
        return match segments.as_slice() {
            [kind, id, ..] => spotify_resource(kind, id).ok_or_else(unrecognized),
            _ => Err(unrecognized()),
        };
    }

    if MUSICBRAINZ_HOSTS.contains(&host.as_str()) {
        return match segments.as_slice() {
            ["recording", mbid, ..] if is_mbid(mbid) => {
                Ok(ProviderUrl::MusicBrainzRecording(mbid.to_ascii_lowercase()))
            }
            _ => Err(unrecognized()),
        };
    }

    Err(unrecognized())
}

fn spotify_resource(kind: &str, id: &str) -> Option<ProviderUrl> {
    if id.is_empty() {
        return None;
    }
    match kind {
        "track" => TrackId::from_id(id)
            .ok()
            .map(|id| ProviderUrl::SpotifyTrack(id.id().to_string())),
        "album" => AlbumId::from_id(id)
            .ok()
            .map(|id| ProviderUrl::SpotifyAlbum(id.id().to_string())),
        _ => None,
    }
}

fn is_mbid(value: &str) -> bool {
    value.len() == MBID_LEN
        && value.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}
