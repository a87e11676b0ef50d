//! Reconciliation orchestrator
//!
//! Every input change opens a new generation. A generation's task waits out
//! the debounce window, queries both providers concurrently and hands the
//! classified result to [`Inner::apply`], the single point where a result is
//! accepted only if its generation is still the latest. Stale work is never
//! aborted; its output is simply dropped there.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;

use crate::classifier;
use crate::model::MatchResult;
use crate::query::{self, QueryInput, SearchQuery, ValidationError};
use crate::sources::SourceAdapter;

/// Where the latest generation is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Debouncing,
    InFlight,
    Settled,
}

/// Visible orchestrator state published to subscribers
#[derive(Clone, Debug, Default)]
pub struct ReconView {
    pub phase: Phase,
    /// Latest generation issued
    pub generation: u64,
    /// Result of the latest generation that settled
    pub result: Option<MatchResult>,
    pub error: Option<ValidationError>,
}

struct Inner<A, B> {
    spotify: A,
    musicbrainz: B,
    debounce: Duration,
    view: watch::Sender<ReconView>,
}

pub struct Reconciler<A, B> {
    inner: Arc<Inner<A, B>>,
}

impl<A, B> Clone for Reconciler<A, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, B> Inner<A, B>
where
    A: SourceAdapter,
    B: SourceAdapter,
{
    fn is_current(&self, generation: u64) -> bool {
        self.view.borrow().generation == generation
    }

    async fn reconcile(&self, generation: u64, query: &SearchQuery) -> MatchResult {
        let (spotify, musicbrainz) = futures::join!(
            self.spotify.lookup(query),
            self.musicbrainz.lookup(query)
        );
        classifier::classify(generation, spotify, musicbrainz)
    }

    /// Accept a result only if no newer generation has been issued
    fn apply(&self, result: MatchResult) -> bool {
        self.view.send_if_modified(|view| {
            if view.generation != result.generation {
                tracing::debug!(
                    stale = result.generation,
                    current = view.generation,
                    "Dropping stale reconciliation result"
                );
                return false;
            }
            tracing::info!(generation = result.generation, status = %result.status, "Reconciliation settled");
            view.phase = Phase::Settled;
            view.error = None;
            view.result = Some(result);
            true
        })
    }

    async fn run_generation(self: Arc<Self>, generation: u64, query: SearchQuery) {
        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            tracing::debug!(generation, "Query superseded during debounce");
            return;
        }

        self.view.send_if_modified(|view| {
            if view.generation != generation {
                return false;
            }
            view.phase = Phase::InFlight;
            true
        });
        tracing::debug!(generation, mode = %query.mode(), "Querying providers");

        let result = match AssertUnwindSafe(self.reconcile(generation, &query)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(generation, "Provider lookup panicked, settling with no result");
                classifier::classify(generation, None, None)
            }
        };
        self.apply(result);
    }
}

impl<A, B> Reconciler<A, B>
where
    A: SourceAdapter + 'static,
    B: SourceAdapter + 'static,
{
    pub fn new(spotify: A, musicbrainz: B, debounce: Duration) -> Self {
        let (view, _) = watch::channel(ReconView::default());
        Self {
            inner: Arc::new(Inner {
                spotify,
                musicbrainz,
                debounce,
                view,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReconView> {
        self.inner.view.subscribe()
    }

    pub fn snapshot(&self) -> ReconView {
        self.inner.view.borrow().clone()
    }

    /// Register an input change.
    ///
    /// Supersedes whatever generation was debouncing or in flight. Invalid
    /// input settles back to idle with the validation error and issues no
    /// provider calls.
    pub fn submit(&self, input: &QueryInput) -> Result<u64, ValidationError> {
        let mut generation = 0;
        self.inner.view.send_modify(|view| {
            view.generation += 1;
            view.phase = Phase::Debouncing;
            view.error = None;
            generation = view.generation;
        });

        let query = match query::normalize(input) {
            Ok(query) => query,
            Err(e) => {
                tracing::debug!(generation, error = %e, "Rejected query input");
                self.inner.view.send_modify(|view| {
                    if view.generation == generation {
                        view.phase = Phase::Idle;
                        view.error = Some(e.clone());
                    }
                });
                return Err(e);
            }
        };

        tracing::debug!(generation, "Debouncing query");
        tokio::spawn(Arc::clone(&self.inner).run_generation(generation, query));
        Ok(generation)
    }

    /// Supersede any pending generation without issuing a new query
    pub fn cancel(&self) {
        self.inner.view.send_modify(|view| {
            view.generation += 1;
            view.phase = Phase::Idle;
        });
    }

    /// Wait until `generation` settles; `None` once a newer generation supersedes it
    pub async fn settled(&self, generation: u64) -> Option<MatchResult> {
        let mut rx = self.inner.view.subscribe();
        let view = rx
            .wait_for(|view| view.generation != generation || view.phase == Phase::Settled)
            .await
            .ok()?;
        if view.generation != generation {
            return None;
        }
        view.result.clone()
    }

    /// Query both providers immediately, bypassing debounce and generations
    pub async fn lookup_now(&self, query: &SearchQuery) -> MatchResult {
        self.inner.reconcile(0, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchStatus, Source, SourceRecord};
    use crate::query::{KeywordQuery, ProviderUrl};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter answering from a fixed table, keyed by code / artist / URL id
    struct FakeAdapter {
        source: Source,
        answers: HashMap<String, (Duration, Option<SourceRecord>)>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeAdapter {
        fn new(source: Source) -> Self {
            Self {
                source,
                answers: HashMap::new(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn answer(mut self, key: &str, delay_ms: u64, title: Option<&str>) -> Self {
            let record = title.map(|title| SourceRecord {
                source: self.source,
                id: format!("{}-{}", self.source.as_str(), key),
                title: title.to_string(),
                artist: "Artist".to_string(),
                album: "Album".to_string(),
                release_date: Some("2020-01-01".to_string()),
                isrc: Some(key.to_string()),
                duration_ms: Some(200_000),
                preview_url: None,
                external_url: None,
                image_url: None,
            });
            self.answers.insert(key.to_string(), (Duration::from_millis(delay_ms), record));
            self
        }

        async fn respond(&self, key: &str) -> Option<SourceRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, record) = self.answers.get(key).cloned()?;
            tokio::time::sleep(delay).await;
            record
        }
    }

    impl SourceAdapter for FakeAdapter {
        fn source(&self) -> Source {
            self.source
        }

        async fn lookup_code(&self, code: &str) -> Option<SourceRecord> {
            self.respond(code).await
        }

        async fn lookup_keywords(&self, query: &KeywordQuery) -> Option<SourceRecord> {
            self.respond(&query.artist).await
        }

        async fn lookup_url(&self, url: &ProviderUrl) -> Option<SourceRecord> {
            match url {
                ProviderUrl::SpotifyTrack(id)
                | ProviderUrl::SpotifyAlbum(id)
                | ProviderUrl::MusicBrainzRecording(id) => self.respond(id).await,
            }
        }
    }

    const CODE_A: &str = "USAAA0000001";
    const CODE_B: &str = "USBBB0000002";

    fn reconciler(spotify: FakeAdapter, musicbrainz: FakeAdapter) -> Reconciler<FakeAdapter, FakeAdapter> {
        Reconciler::new(spotify, musicbrainz, Duration::from_millis(500))
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_input_issues_only_the_last_query() {
        let spotify = FakeAdapter::new(Source::Spotify)
            .answer(CODE_A, 10, Some("A"))
            .answer(CODE_B, 10, Some("B"));
        let calls = Arc::clone(&spotify.calls);
        let recon = reconciler(spotify, FakeAdapter::new(Source::MusicBrainz));

        recon.submit(&QueryInput::code(CODE_A)).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let last = recon.submit(&QueryInput::code(CODE_B)).unwrap();
        assert_eq!(recon.snapshot().phase, Phase::Debouncing);

        let result = recon.settled(last).await.unwrap();
        assert_eq!(result.spotify.unwrap().title, "B");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_result_never_overwrites_newer_one() {
        let spotify = FakeAdapter::new(Source::Spotify)
            .answer(CODE_A, 3_000, Some("A"))
            .answer(CODE_B, 50, Some("B"));
        let musicbrainz = FakeAdapter::new(Source::MusicBrainz)
            .answer(CODE_A, 3_000, Some("A"))
            .answer(CODE_B, 50, Some("B"));
        let recon = reconciler(spotify, musicbrainz);

        let first = recon.submit(&QueryInput::code(CODE_A)).unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(recon.snapshot().phase, Phase::InFlight);

        let second = recon.submit(&QueryInput::code(CODE_B)).unwrap();
        assert!(recon.settled(first).await.is_none());
        let result = recon.settled(second).await.unwrap();
        assert_eq!(result.generation, second);

        // Let the first generation's slow calls finish
        tokio::time::sleep(Duration::from_secs(5)).await;
        let view = recon.snapshot();
        assert_eq!(view.generation, second);
        let visible = view.result.unwrap();
        assert_eq!(visible.generation, second);
        assert_eq!(visible.spotify.unwrap().title, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn one_provider_missing_is_partial_and_both_missing_is_unmatched() {
        let spotify = FakeAdapter::new(Source::Spotify).answer(CODE_A, 10, Some("A"));
        let recon = reconciler(spotify, FakeAdapter::new(Source::MusicBrainz));

        let generation = recon.submit(&QueryInput::code(CODE_A)).unwrap();
        let result = recon.settled(generation).await.unwrap();
        assert_eq!(result.status, MatchStatus::Partial);
        assert!(result.musicbrainz.is_none());

        let generation = recon.submit(&QueryInput::code(CODE_B)).unwrap();
        let result = recon.settled(generation).await.unwrap();
        assert_eq!(result.status, MatchStatus::Unmatched);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_cancels_pending_work_and_calls_nothing() {
        let spotify = FakeAdapter::new(Source::Spotify).answer(CODE_A, 10, Some("A"));
        let calls = Arc::clone(&spotify.calls);
        let recon = reconciler(spotify, FakeAdapter::new(Source::MusicBrainz));

        let pending = recon.submit(&QueryInput::code(CODE_A)).unwrap();
        let err = recon.submit(&QueryInput::keyword("", "", "")).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFields { .. }));
        assert!(recon.settled(pending).await.is_none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let view = recon.snapshot();
        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(view.error, Some(err));
        assert!(view.result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_supersedes_in_flight_generation() {
        let spotify = FakeAdapter::new(Source::Spotify).answer(CODE_A, 1_000, Some("A"));
        let recon = reconciler(spotify, FakeAdapter::new(Source::MusicBrainz));

        let generation = recon.submit(&QueryInput::code(CODE_A)).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        recon.cancel();

        assert!(recon.settled(generation).await.is_none());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(recon.snapshot().result.is_none());
    }

    /// Adapter whose every lookup panics
    struct PanickingAdapter;

    impl SourceAdapter for PanickingAdapter {
        fn source(&self) -> Source {
            Source::Spotify
        }

        async fn lookup_code(&self, code: &str) -> Option<SourceRecord> {
            panic!("unexpected payload for {code}")
        }

        async fn lookup_keywords(&self, _query: &KeywordQuery) -> Option<SourceRecord> {
            panic!("unexpected payload")
        }

        async fn lookup_url(&self, _url: &ProviderUrl) -> Option<SourceRecord> {
            panic!("unexpected payload")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_provider_still_settles_the_generation() {
        let musicbrainz = FakeAdapter::new(Source::MusicBrainz).answer(CODE_A, 10, Some("A"));
        let recon = Reconciler::new(PanickingAdapter, musicbrainz, Duration::from_millis(500));

        let generation = recon.submit(&QueryInput::code(CODE_A)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), recon.settled(generation))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.status, MatchStatus::Unmatched);
        assert_eq!(recon.snapshot().phase, Phase::Settled);
    }

    #[tokio::test]
    async fn lookup_now_queries_both_providers() {
        let spotify = FakeAdapter::new(Source::Spotify).answer(CODE_A, 0, Some("Same Title"));
        let musicbrainz = FakeAdapter::new(Source::MusicBrainz).answer(CODE_A, 0, Some("same title"));
        let recon = reconciler(spotify, musicbrainz);

        let result = recon.lookup_now(&SearchQuery::Code(CODE_A.to_string())).await;
        assert_eq!(result.generation, 0);
        assert_eq!(result.status, MatchStatus::Matched);
    }
}
