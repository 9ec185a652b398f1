use std::sync::Arc;

use gm_onboarding::cache::{FileStore, SessionCache};
use gm_onboarding::config::EngineConfig;
use gm_onboarding::content::{
    BackgroundItem, BackgroundKind, ButtonItem, ContentItem, TextItem, Variant,
};
use gm_onboarding::engine::{EngineEvent, OnboardingEngine};
use gm_onboarding::model::{Onboarding, OnboardingPayload, Screen, Session};
use gm_onboarding::navigation::ScreenFlow;
use gm_onboarding::net::{ApiClient, StubTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let base_url = std::env::var("GM_BASE_URL").ok();
    // A real server needs a real key; only the offline stub gets a demo one.
    let api_key = match &base_url {
        Some(_) => EngineConfig::required(
            "GM_API_KEY",
            std::env::var("GM_API_KEY").ok(),
            "set it to the project API key for the configured server",
        )?,
        None => std::env::var("GM_API_KEY").unwrap_or_else(|_| "demo-key".to_string()),
    };
    let device_id = std::env::var("GM_DEVICE_ID").unwrap_or_else(|_| "demo-device".to_string());
    let cache_dir =
        std::env::var("GM_CACHE_DIR").unwrap_or_else(|_| "./data/onboarding".to_string());

    let config = EngineConfig {
        base_url: base_url
            .clone()
            .unwrap_or_else(|| "https://onboarding.offline".to_string()),
        api_key: api_key.into(),
        device_id,
        device_os: std::env::consts::OS.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        device_model: "demo".to_string(),
        device_locale: "US".to_string(),
        app_store_country: "US".to_string(),
    };

    let client = match &base_url {
        Some(url) => {
            eprintln!("gm-onboarding demo — server {url}");
            ApiClient::new(url.clone())
        }
        None => {
            eprintln!("gm-onboarding demo — GM_BASE_URL unset, running against a stub fixture");
            let stub = StubTransport::new()
                .with_json("/initializeApp", 200, &fixture_payload())
                .with_fixture("/sendEvent", 200, "{}");
            ApiClient::with_transport(config.base_url.clone(), Arc::new(stub))
        }
    };

    let cache = SessionCache::new(Arc::new(FileStore::new(cache_dir)));
    let engine = Arc::new(OnboardingEngine::new(config, client, cache));
    let mut events = engine.subscribe();

    if let Err(err) = engine.initialize().await {
        eprintln!("initialization failed: {err}");
    }

    match events.recv().await? {
        EngineEvent::AppInitialized => {}
        EngineEvent::AppInitializationFailed(reason) => {
            anyhow::bail!("app initialization failed: {reason}");
        }
        other => anyhow::bail!("unexpected event before initialization: {other:?}"),
    }

    let mut flow = ScreenFlow::new(Arc::clone(&engine));
    eprintln!("onboarding has {} screen(s)", flow.screen_count());

    for _ in 0..flow.screen_count() {
        if let Some(screen) = flow.current_screen() {
            eprintln!(
                "  [{}] {} — {} foreground / {} background item(s)",
                flow.current_index(),
                screen.title,
                flow.foreground_items().len(),
                flow.background_items().len()
            );
        }
        flow.advance();
    }

    // Let the fire-and-forget telemetry drain before the process exits.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    eprintln!("done");
    Ok(())
}

/// Payload served in the offline demo mode.
fn fixture_payload() -> OnboardingPayload {
    OnboardingPayload {
        onboarding: Onboarding {
            id: 1,
            onboarding_id: 1,
            screens: vec![
                Screen {
                    id: 1,
                    title: "Welcome".to_string(),
                    items: vec![
                        ContentItem::new(Variant::Background(BackgroundItem {
                            kind: BackgroundKind::Image,
                            url: Some("https://cdn.example.com/welcome.png".to_string()),
                            ..BackgroundItem::default()
                        })),
                        ContentItem::new(Variant::Text(TextItem {
                            text: "Welcome aboard".to_string(),
                            ..TextItem::default()
                        })),
                    ],
                },
                Screen {
                    id: 2,
                    title: "Get started".to_string(),
                    items: vec![ContentItem::new(Variant::Button(ButtonItem {
                        text: "Continue".to_string(),
                        ..ButtonItem::default()
                    }))],
                },
            ],
        },
        session: Session {
            token: "offline-token".to_string(),
        },
    }
}
