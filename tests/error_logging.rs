//! Engine errors are settled locally and logged at the level their kind
//! deserves: stale measurements at debug, missing host documents at warn,
//! missing structural nodes at error. None of them reach the banner state.

use std::sync::{Arc, Mutex};

use alert_banner::{HostOptions, Playground, PlaygroundOptions};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Clone, Debug)]
struct CapturedEvent {
    level: Level,
    context: Option<String>,
    message: String,
}

#[derive(Default)]
struct FieldCapture {
    context: Option<String>,
    message: String,
}

impl Visit for FieldCapture {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "context" {
            self.context = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "context" => self.context = Some(format!("{value:?}").trim_matches('"').to_string()),
            _ => {}
        }
    }
}

/// A layer recording every event with its level and `context` field.
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = FieldCapture::default();
        event.record(&mut fields);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            context: fields.context,
            message: fields.message,
        });
    }
}

fn capture<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn with_context<'a>(events: &'a [CapturedEvent], context: &str) -> Vec<&'a CapturedEvent> {
    events
        .iter()
        .filter(|e| e.context.as_deref() == Some(context))
        .collect()
}

// ============================================================================
// Levels
// ============================================================================

#[test]
fn test_missing_host_document_logs_warning() {
    let events = capture(|| {
        let options =
            PlaygroundOptions::default().host(HostOptions::default().provide_documents(false));
        let mut playground = Playground::new(options);
        playground.run_until_idle();
        assert_eq!(playground.store().writes().height, 0);
    });

    let mount = with_context(&events, "mount live preview");
    assert_eq!(mount.len(), 1, "{events:?}");
    assert_eq!(mount[0].level, Level::WARN);
    assert_eq!(mount[0].message, "skipped");

    let request = with_context(&events, "request measurement");
    assert_eq!(request.len(), 1, "{events:?}");
    assert_eq!(request[0].level, Level::WARN);
}

#[test]
fn test_healthy_run_logs_no_errors() {
    let events = capture(|| {
        let mut playground = Playground::default();
        playground.run_until_idle();
        playground.edit_live_text("Hello").unwrap();
        playground.run_until_idle();
    });

    assert!(
        events
            .iter()
            .all(|e| e.level != Level::ERROR && e.level != Level::WARN),
        "{events:?}"
    );
    assert!(events.iter().any(|e| e.message == "measurement complete"));
    assert!(events.iter().any(|e| e.message == "live preview ready"));
}

#[test]
fn test_task_budget_exhaustion_warns() {
    let events = capture(|| {
        let mut playground = Playground::new(PlaygroundOptions::default().max_tasks_per_turn(1));
        assert_eq!(playground.run_until_idle(), 1);
    });
    assert!(
        events
            .iter()
            .any(|e| e.level == Level::WARN && e.message.starts_with("task budget exhausted"))
    );
}
