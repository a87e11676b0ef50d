//! Spotify Web API adapter

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{FetchError, SourceAdapter, absorb, decode, http_client};
use crate::auth::CredentialCache;
use crate::config::Config;
use crate::model::{Source, SourceRecord};
use crate::query::{KeywordQuery, ProviderUrl};

const SEARCH_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Page<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    isrc: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    name: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: String,
    name: String,
    artists: Vec<ArtistObject>,
    album: AlbumRef,
    duration_ms: u64,
    #[serde(default)]
    external_ids: ExternalIds,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct AlbumTrack {
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    id: String,
    name: String,
    artists: Vec<ArtistObject>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    images: Vec<ImageObject>,
    #[serde(default)]
    external_urls: ExternalUrls,
    tracks: Page<AlbumTrack>,
}

impl From<TrackObject> for SourceRecord {
    fn from(track: TrackObject) -> Self {
        SourceRecord {
            source: Source::Spotify,
            artist: primary_artist(&track.artists),
            image_url: track.album.images.into_iter().next().map(|i| i.url),
            album: track.album.name,
            release_date: track.album.release_date,
            isrc: track.external_ids.isrc.map(|isrc| isrc.to_ascii_uppercase()),
            duration_ms: Some(track.duration_ms),
            preview_url: track.preview_url,
            external_url: track.external_urls.spotify,
            id: track.id,
            title: track.name,
        }
    }
}

impl From<AlbumObject> for SourceRecord {
    fn from(album: AlbumObject) -> Self {
        let duration_ms = (!album.tracks.items.is_empty())
            .then(|| album.tracks.items.iter().map(|t| t.duration_ms).sum());
        SourceRecord {
            source: Source::Spotify,
            artist: primary_artist(&album.artists),
            title: album.name.clone(),
            album: album.name,
            release_date: album.release_date,
            isrc: None,
            duration_ms,
            preview_url: None,
            external_url: album.external_urls.spotify,
            image_url: album.images.into_iter().next().map(|i| i.url),
            id: album.id,
        }
    }
}

fn primary_artist(artists: &[ArtistObject]) -> String {
    artists.first().map(|a| a.name.clone()).unwrap_or_default()
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', ""))
}

/// Field-filtered search text: artist is always present, the rest narrow it
fn keyword_search_text(query: &KeywordQuery) -> String {
    let mut terms = vec![format!("artist:{}", quoted(&query.artist))];
    if let Some(track) = &query.track {
        terms.push(format!("track:{}", quoted(track)));
    }
    if let Some(album) = &query.album {
        terms.push(format!("album:{}", quoted(album)));
    }
    if let Some(year) = &query.year {
        terms.push(format!("year:{}", year));
    }
    terms.join(" ")
}

pub struct SpotifyAdapter {
    http: reqwest::Client,
    api_url: String,
    credentials: CredentialCache,
}

impl SpotifyAdapter {
    pub fn new(config: &Config) -> Self {
        let http = http_client(config.request_timeout);
        let credentials = CredentialCache::new(
            http.clone(),
            config.spotify_auth_url.clone(),
            config.spotify_credentials.clone(),
        );
        Self {
            http,
            api_url: config.spotify_api_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, FetchError> {
        let token = self.credentials.bearer().await?;
        tracing::debug!(path, "API: spotify GET");
        let response = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate().await;
        }
        decode(response).await
    }

    async fn search_first(&self, text: String) -> Result<Option<SourceRecord>, FetchError> {
        let response: SearchResponse = self
            .get(
                "/search",
                &[
                    ("q", text),
                    ("type", "track".to_string()),
                    ("limit", SEARCH_LIMIT.to_string()),
                ],
            )
            .await?;
        tracing::debug!(candidates = response.tracks.items.len(), "Spotify search returned");
        Ok(response.tracks.items.into_iter().next().map(SourceRecord::from))
    }
}

impl SourceAdapter for SpotifyAdapter {
    fn source(&self) -> Source {
        Source::Spotify
    }

    async fn lookup_code(&self, code: &str) -> Option<SourceRecord> {
        let result = self.search_first(format!("isrc:{}", code)).await;
        absorb(Source::Spotify, "code", result)
    }

    async fn lookup_keywords(&self, query: &KeywordQuery) -> Option<SourceRecord> {
        let result = self.search_first(keyword_search_text(query)).await;
        absorb(Source::Spotify, "keyword", result)
    }

    async fn lookup_url(&self, url: &ProviderUrl) -> Option<SourceRecord> {
        let result = match url {
            ProviderUrl::SpotifyTrack(id) => self
                .get::<TrackObject>(&format!("/tracks/{}", id), &[])
                .await
                .map(|track| Some(track.into())),
            ProviderUrl::SpotifyAlbum(id) => self
                .get::<AlbumObject>(&format!("/albums/{}", id), &[])
                .await
                .map(|album| Some(album.into())),
            ProviderUrl::MusicBrainzRecording(_) => Ok(None),
        };
        absorb(Source::Spotify, "url", result)
    }
}
