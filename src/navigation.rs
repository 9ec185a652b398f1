//! Screen navigation state machine.
//!
//! Walks the cached payload's screens linearly on CTA actions, keeping the
//! current screen's items partitioned into background (`backgroundView`) and
//! foreground (everything else). Progress telemetry is fire-and-forget: a
//! failed send is logged and never blocks navigation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::content::{ContentItem, ItemType};
use crate::engine::{AnalyticsEvent, EngineEvent, OnboardingEngine};
use crate::model::Screen;

pub struct ScreenFlow {
    engine: Arc<OnboardingEngine>,
    onboarding_id: i64,
    screens: Vec<Screen>,
    cursor: usize,
    background: Vec<ContentItem>,
    foreground: Vec<ContentItem>,
}

impl ScreenFlow {
    /// Build a flow over the engine's payload. Construct only after the
    /// engine reported `AppInitialized`; without a payload the flow comes up
    /// empty and every action is a no-op.
    ///
    /// Construction reports `onboarding_started` telemetry and emits
    /// [`EngineEvent::OnboardingStarted`].
    pub fn new(engine: Arc<OnboardingEngine>) -> Self {
        let Some(payload) = engine.payload() else {
            warn!("screen flow constructed without an initialized payload");
            return Self {
                engine,
                onboarding_id: 0,
                screens: Vec::new(),
                cursor: 0,
                background: Vec::new(),
                foreground: Vec::new(),
            };
        };

        let onboarding_id = payload.onboarding.id;
        let screens = payload.onboarding.screens;
        let (background, foreground) = partition(screens.first());

        engine.send_event_detached(
            AnalyticsEvent::Started,
            attributes(onboarding_id, None),
        );
        engine.emit(EngineEvent::OnboardingStarted);

        Self {
            engine,
            onboarding_id,
            screens,
            cursor: 0,
            background,
            foreground,
        }
    }

    /// Handle a CTA action.
    ///
    /// Before the last screen: reports `onboarding_screen_viewed` for the
    /// screen being left, then moves the cursor and recomputes both
    /// partitions in this same call, so no reader can observe a cursor that
    /// disagrees with its partitions. On the last screen: reports
    /// `onboarding_completed` and emits the engine-level
    /// [`EngineEvent::OnboardingCompleted`]; the cursor stays put.
    pub fn advance(&mut self) {
        let Some(current) = self.screens.get(self.cursor) else {
            return;
        };
        let screen_id = current.id;

        if self.cursor < self.screens.len() - 1 {
            self.engine.send_event_detached(
                AnalyticsEvent::ScreenViewed,
                attributes(self.onboarding_id, Some(screen_id)),
            );
            self.cursor += 1;
            let (background, foreground) = partition(self.screens.get(self.cursor));
            self.background = background;
            self.foreground = foreground;
        } else {
            self.engine.send_event_detached(
                AnalyticsEvent::Completed,
                attributes(self.onboarding_id, Some(screen_id)),
            );
            self.engine.emit(EngineEvent::OnboardingCompleted);
        }
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    pub fn current_screen(&self) -> Option<&Screen> {
        self.screens.get(self.cursor)
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    /// `backgroundView` items of the current screen, wire order preserved.
    pub fn background_items(&self) -> &[ContentItem] {
        &self.background
    }

    /// All non-background items of the current screen, wire order preserved.
    pub fn foreground_items(&self) -> &[ContentItem] {
        &self.foreground
    }
}

fn partition(screen: Option<&Screen>) -> (Vec<ContentItem>, Vec<ContentItem>) {
    let Some(screen) = screen else {
        return (Vec::new(), Vec::new());
    };
    screen
        .items
        .iter()
        .cloned()
        .partition(|item| item.item_type == ItemType::BackgroundView)
}

fn attributes(onboarding_id: i64, screen_id: Option<i64>) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    attributes.insert("onboarding_id".to_string(), onboarding_id.to_string());
    if let Some(screen_id) = screen_id {
        attributes.insert("screen_id".to_string(), screen_id.to_string());
    }
    attributes
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::test_support::{harness, payload_with_screens, two_screen_payload};
    use crate::net::{RequestBody, StubTransport};

    /// Telemetry is spawned, so give the runtime a beat before asserting on
    /// recorded requests.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    fn event_bodies(stub: &crate::net::StubTransport) -> Vec<serde_json::Value> {
        stub.recorded()
            .iter()
            .filter(|req| req.url.ends_with("/sendEvent"))
            .map(|req| match &req.body {
                RequestBody::Json(bytes) => serde_json::from_slice(bytes).unwrap(),
                other => panic!("unexpected body {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn partitions_first_screen_on_construction() {
        let stub = StubTransport::new().with_fixture("/sendEvent", 200, "{}");
        let h = harness(stub, Some(&two_screen_payload()));
        h.engine.initialize().await.unwrap();

        let flow = ScreenFlow::new(Arc::clone(&h.engine));
        assert_eq!(flow.current_index(), 0);
        assert_eq!(flow.background_items().len(), 1);
        assert_eq!(flow.background_items()[0].item_type, ItemType::BackgroundView);
        assert_eq!(flow.foreground_items().len(), 1);
        assert_eq!(flow.foreground_items()[0].item_type, ItemType::Text);

        settle().await;
        let bodies = event_bodies(&h.stub);
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["event"], "onboarding_started");
        assert_eq!(bodies[0]["attributes"]["onboarding_id"], "11");
    }

    #[tokio::test]
    async fn advance_reports_left_screen_then_repartitions() {
        let stub = StubTransport::new().with_fixture("/sendEvent", 200, "{}");
        let h = harness(stub, Some(&two_screen_payload()));
        h.engine.initialize().await.unwrap();

        let mut flow = ScreenFlow::new(Arc::clone(&h.engine));
        flow.advance();

        assert_eq!(flow.current_index(), 1);
        assert!(flow.background_items().is_empty());
        assert_eq!(flow.foreground_items().len(), 1);
        assert_eq!(flow.foreground_items()[0].item_type, ItemType::Button);

        settle().await;
        let bodies = event_bodies(&h.stub);
        let viewed: Vec<_> = bodies
            .iter()
            .filter(|b| b["event"] == "onboarding_screen_viewed")
            .collect();
        assert_eq!(viewed.len(), 1);
        // The event names the screen that was left, not the one entered.
        assert_eq!(viewed[0]["attributes"]["screen_id"], "0");
    }

    #[tokio::test]
    async fn n_minus_one_advances_walk_to_the_end() {
        let stub = StubTransport::new().with_fixture("/sendEvent", 200, "{}");
        let h = harness(stub, Some(&payload_with_screens(5)));
        h.engine.initialize().await.unwrap();

        let mut flow = ScreenFlow::new(Arc::clone(&h.engine));
        for expected in 1..5 {
            flow.advance();
            assert_eq!(flow.current_index(), expected);
        }
        assert_eq!(flow.current_index(), 4);
    }

    #[tokio::test]
    async fn terminal_advance_emits_completed_and_holds_cursor() {
        let stub = StubTransport::new().with_fixture("/sendEvent", 200, "{}");
        let h = harness(stub, Some(&payload_with_screens(2)));
        h.engine.initialize().await.unwrap();

        let mut flow = ScreenFlow::new(Arc::clone(&h.engine));
        let mut events = h.engine.subscribe();
        flow.advance();
        flow.advance(); // terminal
        assert_eq!(flow.current_index(), 1);
        flow.advance(); // still terminal, still no move
        assert_eq!(flow.current_index(), 1);

        assert_eq!(events.recv().await.unwrap(), EngineEvent::OnboardingCompleted);

        settle().await;
        let bodies = event_bodies(&h.stub);
        let completed: Vec<_> = bodies
            .iter()
            .filter(|b| b["event"] == "onboarding_completed")
            .collect();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0]["attributes"]["screen_id"], "1");
    }

    #[tokio::test]
    async fn telemetry_failure_never_blocks_navigation() {
        // No /sendEvent fixture: every telemetry call fails in the stub.
        let stub = StubTransport::new();
        let h = harness(stub, Some(&payload_with_screens(3)));
        h.engine.initialize().await.unwrap();

        let mut flow = ScreenFlow::new(Arc::clone(&h.engine));
        flow.advance();
        flow.advance();
        assert_eq!(flow.current_index(), 2);
        settle().await;
    }

    #[tokio::test]
    async fn missing_payload_yields_empty_flow() {
        let stub = StubTransport::new();
        let h = harness(stub, None);
        // Engine deliberately not initialized.
        let mut flow = ScreenFlow::new(Arc::clone(&h.engine));
        assert_eq!(flow.screen_count(), 0);
        assert!(flow.current_screen().is_none());
        flow.advance(); // no-op, no panic
        assert_eq!(flow.current_index(), 0);
        assert_eq!(h.stub.request_count(), 0);
    }
}
