//! Onboarding delivery engine.
//!
//! The engine is the explicit context object of the system: constructed once
//! at startup, shared via `Arc`, and responsible for the cache-or-fetch
//! initialization transition, the derived auth header, and the telemetry
//! surface. Observers follow its lifecycle through a broadcast event stream.
//!
//! State machine, one run per instance:
//! `Uninitialized → (CacheHit | Fetching) → (Initialized | InitializationFailed)`

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::Stream;
use secrecy::ExposeSecret;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::cache::SessionCache;
use crate::config::EngineConfig;
use crate::error::{ConfigError, NetworkError, Result};
use crate::model::{EmptyResponse, EventRequest, InitializeRequest, OnboardingPayload};
use crate::net::{ApiClient, Endpoint};

/// Lifecycle events observers can subscribe to. Delivery order matches
/// emission order; at most one of the two initialization outcomes is ever
/// emitted per engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    AppInitialized,
    AppInitializationFailed(String),
    OnboardingStarted,
    OnboardingCompleted,
}

/// Analytics events forwarded to `POST /sendEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsEvent {
    Started,
    ScreenViewed,
    Completed,
}

impl AnalyticsEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "onboarding_started",
            Self::ScreenViewed => "onboarding_screen_viewed",
            Self::Completed => "onboarding_completed",
        }
    }
}

impl std::fmt::Display for AnalyticsEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boxed stream view over the engine's event channel.
pub type EventStream = Pin<Box<dyn Stream<Item = EngineEvent> + Send>>;

pub struct OnboardingEngine {
    config: EngineConfig,
    client: ApiClient,
    cache: SessionCache,
    payload: RwLock<Option<OnboardingPayload>>,
    events: broadcast::Sender<EngineEvent>,
    initialized: AtomicBool,
}

impl OnboardingEngine {
    /// Build the engine. Cheap; no I/O happens until [`initialize`] runs.
    ///
    /// Construct exactly one per process and pass it by `Arc` — single
    /// construction site replaces the old configure-once singleton guard.
    ///
    /// [`initialize`]: OnboardingEngine::initialize
    pub fn new(config: EngineConfig, client: ApiClient, cache: SessionCache) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config,
            client,
            cache,
            payload: RwLock::new(None),
            events,
            initialized: AtomicBool::new(false),
        }
    }

    /// Subscribe to lifecycle events. Subscribe before calling
    /// [`initialize`](OnboardingEngine::initialize) to observe the outcome.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Stream view over [`subscribe`](OnboardingEngine::subscribe).
    pub fn events(&self) -> EventStream {
        let stream = BroadcastStream::new(self.events.subscribe()).filter_map(|item| item.ok());
        Box::pin(stream)
    }

    /// Run the initialization transition: adopt the cached payload if one
    /// exists (no network call, cache is trusted indefinitely), otherwise
    /// fetch from `POST /initializeApp` and cache the result.
    ///
    /// Runs exactly once per instance; a second call is a
    /// [`ConfigError::AlreadyInitialized`]. Failure leaves the cache empty
    /// and the system retryable by relaunch.
    pub async fn initialize(&self) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(ConfigError::AlreadyInitialized.into());
        }

        if let Some(payload) = self.cache.payload() {
            info!("onboarding payload served from cache");
            self.adopt(payload);
            self.emit(EngineEvent::AppInitialized);
            return Ok(());
        }

        let request = self.initialize_request();
        match self
            .client
            .send::<OnboardingPayload, _>(Endpoint::InitializeApp, &request, vec![])
            .await
        {
            Ok(payload) => {
                self.cache.set_payload(Some(&payload));
                self.cache.set_started();
                info!(
                    onboarding_id = payload.onboarding.id,
                    screens = payload.onboarding.screens.len(),
                    "onboarding payload fetched"
                );
                self.adopt(payload);
                self.emit(EngineEvent::AppInitialized);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "app initialization failed");
                self.emit(EngineEvent::AppInitializationFailed(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// The payload currently owned by the engine, if initialized.
    pub fn payload(&self) -> Option<OnboardingPayload> {
        self.payload
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `Authorization: Bearer <token>` whenever a payload is held, else
    /// no headers at all.
    pub fn auth_header(&self) -> Vec<(String, String)> {
        match self.payload() {
            Some(payload) => vec![(
                "Authorization".to_string(),
                format!("Bearer {}", payload.session.token),
            )],
            None => vec![],
        }
    }

    /// Forward a telemetry event to the server with the derived auth header.
    /// Not retried; callers wanting retries wrap this in
    /// [`retrying`](crate::net::retrying) themselves.
    pub async fn send_event(
        &self,
        event: AnalyticsEvent,
        attributes: HashMap<String, String>,
    ) -> std::result::Result<(), NetworkError> {
        let request = EventRequest {
            event: event.as_str().to_string(),
            attributes,
        };
        self.client
            .send::<EmptyResponse, _>(Endpoint::SendEvent, &request, self.auth_header())
            .await?;
        Ok(())
    }

    /// Fire-and-forget telemetry: spawned onto the runtime, at-most-once,
    /// failures observed in the log and nowhere else. No ordering guarantee
    /// between two detached sends.
    pub fn send_event_detached(
        self: &Arc<Self>,
        event: AnalyticsEvent,
        attributes: HashMap<String, String>,
    ) {
        let engine = Arc::clone(self);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = engine.send_event(event, attributes).await {
                        warn!(event = %event, error = %err, "telemetry event failed");
                    }
                });
            }
            Err(_) => {
                warn!(event = %event, "no async runtime, dropping telemetry event");
            }
        }
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        // No subscribers means nobody is watching yet; that is fine.
        let _ = self.events.send(event);
    }

    fn adopt(&self, payload: OnboardingPayload) {
        *self
            .payload
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(payload);
    }

    fn initialize_request(&self) -> InitializeRequest {
        InitializeRequest {
            api_key: self.config.api_key.expose_secret().to_string(),
            device_id: self.config.device_id.clone(),
            device_os: self.config.device_os.clone(),
            app_version: self.config.app_version.clone(),
            device_model: self.config.device_model.clone(),
            device_locale: self.config.device_locale.clone(),
            app_store_country: self.config.app_store_country.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::cache::{BlobStore, MemoryStore};
    use crate::content::{ContentItem, ItemType, Variant};
    use crate::content::{BackgroundItem, BackgroundKind, ButtonItem, TextItem};
    use crate::model::{Onboarding, Screen, Session};
    use crate::net::StubTransport;

    pub fn config() -> EngineConfig {
        EngineConfig {
            base_url: "https://onboarding.test".to_string(),
            api_key: "key-under-test".to_string().into(),
            device_id: "device-1".to_string(),
            device_os: "17.4".to_string(),
            app_version: "2.3.1".to_string(),
            device_model: "Pixel 9".to_string(),
            device_locale: "CA".to_string(),
            app_store_country: "CA".to_string(),
        }
    }

    /// Two screens: text + video background, then a button. Screen ids are
    /// index-valued on purpose so partition tests can assert `screen_id`.
    pub fn two_screen_payload() -> OnboardingPayload {
        let background = ContentItem::new(Variant::Background(BackgroundItem {
            kind: BackgroundKind::Video,
            url: Some("https://cdn.example.com/bg.mp4".to_string()),
            ..BackgroundItem::default()
        }));
        let text = ContentItem::new(Variant::Text(TextItem::default()));
        let button = ContentItem::new(Variant::Button(ButtonItem::default()));
        OnboardingPayload {
            onboarding: Onboarding {
                id: 11,
                onboarding_id: 110,
                screens: vec![
                    Screen {
                        id: 0,
                        title: "Welcome".to_string(),
                        items: vec![text, background],
                    },
                    Screen {
                        id: 1,
                        title: "Get started".to_string(),
                        items: vec![button],
                    },
                ],
            },
            session: Session {
                token: "session-token".to_string(),
            },
        }
    }

    pub fn payload_with_screens(count: usize) -> OnboardingPayload {
        let screens = (0..count)
            .map(|i| Screen {
                id: i as i64,
                title: format!("Screen {i}"),
                items: vec![ContentItem::bare(ItemType::Spacer)],
            })
            .collect();
        OnboardingPayload {
            onboarding: Onboarding {
                id: 11,
                onboarding_id: 110,
                screens,
            },
            session: Session {
                token: "session-token".to_string(),
            },
        }
    }

    pub struct Harness {
        pub engine: Arc<OnboardingEngine>,
        pub stub: Arc<StubTransport>,
        pub cache: SessionCache,
    }

    pub fn harness(stub: StubTransport, precached: Option<&OnboardingPayload>) -> Harness {
        let stub = Arc::new(stub);
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let cache = SessionCache::new(Arc::clone(&store));
        if let Some(payload) = precached {
            cache.set_started();
            cache.set_payload(Some(payload));
        }
        let client = ApiClient::with_transport(
            "https://onboarding.test",
            Arc::clone(&stub) as Arc<dyn crate::net::Transport>,
        );
        let engine = Arc::new(OnboardingEngine::new(config(), client, cache.clone()));
        Harness {
            engine,
            stub,
            cache,
        }
    }
}
