//! MusicBrainz web service adapter

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{FetchError, SourceAdapter, absorb, decode, http_client};
use crate::config::Config;
use crate::model::{Source, SourceRecord};
use crate::query::{KeywordQuery, ProviderUrl};

const SEARCH_LIMIT: u32 = 5;
const RECORDING_INCLUDES: &str = "artist-credits+releases+isrcs";
const RECORDING_PAGE_URL: &str = "https://musicbrainz.org/recording";

#[derive(Debug, Deserialize)]
struct RecordingSearch {
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    title: String,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    id: String,
    title: String,
    #[serde(default)]
    length: Option<u64>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    releases: Vec<Release>,
    #[serde(default)]
    isrcs: Vec<String>,
    #[serde(rename = "first-release-date", default)]
    first_release_date: Option<String>,
}

impl Recording {
    /// `searched_code` wins when the recording lists it among several ISRCs.
    /// A recording with no ISRCs keeps none, whatever was searched.
    fn into_record(self, searched_code: Option<&str>) -> SourceRecord {
        let isrc = match searched_code {
            Some(code) if self.isrcs.iter().any(|i| i.eq_ignore_ascii_case(code)) => Some(code.to_string()),
            _ => self.isrcs.first().map(|i| i.to_ascii_uppercase()),
        };
        let first_release = self.releases.into_iter().next();
        let release_date = self
            .first_release_date
            .filter(|d| !d.is_empty())
            .or_else(|| first_release.as_ref().and_then(|r| r.date.clone()))
            .filter(|d| !d.is_empty());

        SourceRecord {
            source: Source::MusicBrainz,
            external_url: Some(format!("{}/{}", RECORDING_PAGE_URL, self.id)),
            id: self.id,
            title: self.title,
            artist: self.artist_credit.first().map(|c| c.name.clone()).unwrap_or_default(),
            album: first_release.map(|r| r.title).unwrap_or_default(),
            release_date,
            isrc,
            duration_ms: self.length,
            preview_url: None,
            image_url: None,
        }
    }
}

fn phrase(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Boolean search: artist AND optionally recording / release
fn keyword_search_text(query: &KeywordQuery) -> String {
    let mut text = format!("artist:{}", phrase(&query.artist));
    if let Some(track) = &query.track {
        text.push_str(&format!(" AND recording:{}", phrase(track)));
    }
    if let Some(album) = &query.album {
        text.push_str(&format!(" AND release:{}", phrase(album)));
    }
    text
}

pub struct MusicBrainzAdapter {
    http: reqwest::Client,
    api_url: String,
    user_agent: String,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl MusicBrainzAdapter {
    pub fn new(config: &Config) -> Self {
        let quota = Quota::with_period(config.musicbrainz_min_interval)
            .map(|q| q.allow_burst(NonZeroU32::MIN))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));

        Self {
            http: http_client(config.request_timeout),
            api_url: config.musicbrainz_api_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            limiter: RateLimiter::direct(quota),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, FetchError> {
        self.limiter.until_ready().await;
        tracing::debug!(path, "API: musicbrainz GET");

        let response = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .query(query)
            .query(&[("fmt", "json")])
            .send()
            .await?;
        decode(response).await
    }

    async fn search_first(&self, text: String, searched_code: Option<&str>) -> Result<Option<SourceRecord>, FetchError> {
        let response: RecordingSearch = self
            .get("/recording", &[("query", text), ("limit", SEARCH_LIMIT.to_string())])
            .await?;
        tracing::debug!(candidates = response.recordings.len(), "MusicBrainz search returned");
        Ok(response
            .recordings
            .into_iter()
            .next()
            .map(|recording| recording.into_record(searched_code)))
    }
}

impl SourceAdapter for MusicBrainzAdapter {
    fn source(&self) -> Source {
        Source::MusicBrainz
    }

    async fn lookup_code(&self, code: &str) -> Option<SourceRecord> {
        let result = self.search_first(format!("isrc:{}", code), Some(code)).await;
        absorb(Source::MusicBrainz, "code", result)
    }

    async fn lookup_keywords(&self, query: &KeywordQuery) -> Option<SourceRecord> {
        let result = self.search_first(keyword_search_text(query), None).await;
        absorb(Source::MusicBrainz, "keyword", result)
    }

    async fn lookup_url(&self, url: &ProviderUrl) -> Option<SourceRecord> {
        let result = match url {
            ProviderUrl::MusicBrainzRecording(mbid) => self
                .get::<Recording>(
                    &format!("/recording/{}", mbid),
                    &[("inc", RECORDING_INCLUDES.to_string())],
                )
                .await
                .map(|recording| Some(recording.into_record(None))),
            ProviderUrl::SpotifyTrack(_) | ProviderUrl::SpotifyAlbum(_) => Ok(None),
        };
        absorb(Source::MusicBrainz, "url", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn config_for(server: &MockServer) -> Config {
        Config {
            musicbrainz_api_url: server.url("/ws/2"),
            user_agent: "trackmatch-tests/0.1 ( test@example.com )".to_string(),
            musicbrainz_min_interval: Duration::from_millis(1),
            ..Config::default()
        }
    }

    fn recording_json() -> serde_json::Value {
        json!({
            "id": "4b7c1e5a-2f0e-4c9c-a6f2-5c3a0c9f0d11",
            "title": "One More Time",
            "length": 320000,
            "artist-credit": [{ "name": "Daft Punk", "joinphrase": "" }],
            "first-release-date": "2000-11-13",
            "releases": [{ "title": "Discovery", "date": "2001-03-12" }],
            "isrcs": ["GBDUW0000059"]
        })
    }

    #[test]
    fn keyword_text_escapes_quotes() {
        let query = KeywordQuery {
            artist: "The \"Band\"".to_string(),
            track: Some("Song".to_string()),
            album: None,
            year: None,
        };
        assert_eq!(
            keyword_search_text(&query),
            "artist:\"The \\\"Band\\\"\" AND recording:\"Song\""
        );
    }

    #[tokio::test]
    async fn code_lookup_sends_identifying_header() {
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/ws/2/recording")
                    .query_param("query", "isrc:GBDUW0000059")
                    .query_param("fmt", "json")
                    .header("user-agent", "trackmatch-tests/0.1 ( test@example.com )");
                then.status(200).json_body(json!({ "recordings": [recording_json()] }));
            })
            .await;

        let adapter = MusicBrainzAdapter::new(&config_for(&server));
        let record = adapter.lookup_code("GBDUW0000059").await.unwrap();

        search.assert_async().await;
        assert_eq!(record.source, Source::MusicBrainz);
        assert_eq!(record.artist, "Daft Punk");
        assert_eq!(record.album, "Discovery");
        assert_eq!(record.release_date.as_deref(), Some("2000-11-13"));
        assert_eq!(record.duration_ms, Some(320_000));
        assert_eq!(
            record.external_url.as_deref(),
            Some("https://musicbrainz.org/recording/4b7c1e5a-2f0e-4c9c-a6f2-5c3a0c9f0d11")
        );
    }

    #[tokio::test]
    async fn empty_search_is_no_result() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/2/recording");
                then.status(200).json_body(json!({ "count": 0, "recordings": [] }));
            })
            .await;

        let adapter = MusicBrainzAdapter::new(&config_for(&server));
        let query = KeywordQuery {
            artist: "Nobody Anyone Knows".to_string(),
            track: Some("Nothing".to_string()),
            album: None,
            year: None,
        };
        assert!(adapter.lookup_keywords(&query).await.is_none());
    }

    #[tokio::test]
    async fn unexpected_shape_and_errors_are_no_result() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/2/recording");
                then.status(200).json_body(json!({ "error": "nope" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_includes("/ws/2/recording/");
                then.status(503);
            })
            .await;

        let adapter = MusicBrainzAdapter::new(&config_for(&server));
        assert!(adapter.lookup_code("GBDUW0000059").await.is_none());
        assert!(adapter
            .lookup_url(&ProviderUrl::MusicBrainzRecording("4b7c1e5a-2f0e-4c9c-a6f2-5c3a0c9f0d11".to_string()))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn recording_url_fetches_by_mbid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/ws/2/recording/4b7c1e5a-2f0e-4c9c-a6f2-5c3a0c9f0d11")
                    .query_param("inc", RECORDING_INCLUDES);
                then.status(200).json_body(recording_json());
            })
            .await;

        let adapter = MusicBrainzAdapter::new(&config_for(&server));
        let record = adapter
            .lookup_url(&ProviderUrl::MusicBrainzRecording("4b7c1e5a-2f0e-4c9c-a6f2-5c3a0c9f0d11".to_string()))
            .await
            .unwrap();
        assert_eq!(record.isrc.as_deref(), Some("GBDUW0000059"));
    }

    #[tokio::test]
    async fn spotify_urls_are_not_resolved_here() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.path_includes("/");
                then.status(200);
            })
            .await;

        let adapter = MusicBrainzAdapter::new(&config_for(&server));
        let record = adapter
            .lookup_url(&ProviderUrl::SpotifyTrack("0DiWol3AO6WpXZgp0goxAV".to_string()))
            .await;
        assert!(record.is_none());
        any.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn recording_without_isrcs_keeps_none() {
        let server = MockServer::start_async().await;
        let mut recording = recording_json();
        recording["isrcs"] = json!([]);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/2/recording");
                then.status(200).json_body(json!({ "recordings": [recording] }));
            })
            .await;

        let adapter = MusicBrainzAdapter::new(&config_for(&server));
        let record = adapter.lookup_code("GBDUW0000059").await.unwrap();
        assert_eq!(record.isrc, None);
    }

    #[tokio::test]
    async fn back_to_back_requests_respect_min_interval() {
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/2/recording");
                then.status(200).json_body(json!({ "recordings": [] }));
            })
            .await;
        let interval = Duration::from_millis(400);
        let config = Config {
            musicbrainz_min_interval: interval,
            ..config_for(&server)
        };

        let adapter = MusicBrainzAdapter::new(&config);
        let started = std::time::Instant::now();
        adapter.lookup_code("GBDUW0000059").await;
        let first = started.elapsed();
        adapter.lookup_code("GBDUW0000060").await;
        adapter.lookup_code("GBDUW0000061").await;
        let total = started.elapsed();

        search.assert_hits_async(3).await;
        assert!(first < interval, "first request should not wait, took {first:?}");
        // Two waits of one interval each, less a little clock skew
        assert!(total >= interval * 2 - Duration::from_millis(50), "took {total:?}");
    }
}
