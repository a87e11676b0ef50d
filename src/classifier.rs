//! Field-level comparison of the two providers' records

use crate::model::{FieldTag, FieldTags, MatchResult, MatchStatus, SourceRecord};

const DURATION_MATCH_MS: u64 = 2_000;
const DURATION_CLOSE_MS: u64 = 5_000;
const YEAR_LEN: usize = 4;

/// Build a `MatchResult` for one generation from whatever each provider returned
pub fn classify(
    generation: u64,
    spotify: Option<SourceRecord>,
    musicbrainz: Option<SourceRecord>,
) -> MatchResult {
    let fields = match (&spotify, &musicbrainz) {
        (Some(a), Some(b)) => Some(compare_fields(a, b)),
        _ => None,
    };
    let status = overall_status(spotify.is_some(), musicbrainz.is_some(), fields.as_ref());

    MatchResult {
        generation,
        spotify,
        musicbrainz,
        fields,
        status,
    }
}

pub fn compare_fields(a: &SourceRecord, b: &SourceRecord) -> FieldTags {
    FieldTags {
        title: compare_title(&a.title, &b.title),
        artist: compare_artist(&a.artist, &b.artist),
        album: compare_exact(&a.album, &b.album),
        isrc: compare_isrc(a.isrc.as_deref(), b.isrc.as_deref()),
        duration: compare_duration(a.duration_ms, b.duration_ms),
        release_date: compare_release_date(a.release_date.as_deref(), b.release_date.as_deref()),
    }
}

/// Presence of both sides decides unless both are present, then the title tag does
pub fn overall_status(has_a: bool, has_b: bool, fields: Option<&FieldTags>) -> MatchStatus {
    match (has_a, has_b, fields) {
        (false, false, _) => MatchStatus::Unmatched,
        (true, true, Some(tags)) => match tags.title {
            FieldTag::Match => MatchStatus::Matched,
            FieldTag::Partial => MatchStatus::Partial,
            _ => MatchStatus::Unmatched,
        },
        _ => MatchStatus::Partial,
    }
}

/// Lowercase and keep only alphanumerics
pub fn normalize_text(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

pub fn compare_title(a: &str, b: &str) -> FieldTag {
    let (a, b) = (normalize_text(a), normalize_text(b));
    if a == b {
        FieldTag::Match
    } else if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
        FieldTag::Partial
    } else {
        FieldTag::Different
    }
}

pub fn compare_artist(a: &str, b: &str) -> FieldTag {
    if normalize_text(a) == normalize_text(b) {
        FieldTag::Match
    } else {
        FieldTag::Different
    }
}

fn compare_exact(a: &str, b: &str) -> FieldTag {
    if a == b {
        FieldTag::Match
    } else {
        FieldTag::Different
    }
}

pub fn compare_isrc(a: Option<&str>, b: Option<&str>) -> FieldTag {
    match (a, b) {
        (Some(a), Some(b)) if a == b => FieldTag::Match,
        (Some(_), Some(_)) => FieldTag::Mismatch,
        _ => FieldTag::Inconclusive,
    }
}

pub fn compare_duration(a: Option<u64>, b: Option<u64>) -> FieldTag {
    let (Some(a), Some(b)) = (a, b) else {
        return FieldTag::Inconclusive;
    };
    let delta = a.abs_diff(b);
    if delta < DURATION_MATCH_MS {
        FieldTag::Match
    } else if delta < DURATION_CLOSE_MS {
        FieldTag::Close
    } else {
        FieldTag::Different
    }
}

pub fn compare_release_date(a: Option<&str>, b: Option<&str>) -> FieldTag {
    let (Some(a), Some(b)) = (a, b) else {
        return FieldTag::Inconclusive;
    };
    if a == b {
        FieldTag::Match
    } else if leading_year(a).is_some() && leading_year(a) == leading_year(b) {
        FieldTag::Close
    } else {
        FieldTag::Different
    }
}

fn leading_year(date: &str) -> Option<&str> {
    date.get(..YEAR_LEN)
        .filter(|year| year.chars().all(|c| c.is_ascii_digit()))
}
