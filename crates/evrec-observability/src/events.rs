//! Bridges `tracing::error!` events into the `system_events` table
//! through a `tracing_subscriber::Layer`, so call sites never write
//! `dr.record_event(...)` by hand.
//!
//! The subscriber side stays synchronous: `on_event` only extracts the
//! message and hands it to an unbounded channel, and a background task
//! owns the actual `SystemEventsRepository::record` call.

use std::sync::Arc;

use evrec_dr::SystemEventsRepository;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

pub struct SystemEventLayer {
    tx: UnboundedSender<(String, String)>,
}

impl SystemEventLayer {
    pub fn new(events: Arc<dyn SystemEventsRepository>) -> Self {
        let (tx, mut rx) = unbounded_channel::<(String, String)>();
        tokio::spawn(async move {
            while let Some((source, message)) = rx.recv().await {
                if let Err(err) = events.record("error", &source, &message).await {
                    tracing::warn!(error = %err, "failed to persist system event");
                }
            }
        });
        Self { tx }
    }
}

impl<S: Subscriber> Layer<S> for SystemEventLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let source = event.metadata().target().to_string();
        // Best-effort: a full channel or a closed receiver just drops the
        // event rather than blocking the tracing call site.
        let _ = self.tx.send((source, visitor.message));
    }
}
