//! Event dispatcher: routes named frames to typed patch decoding
//!
//! Every inbound frame is matched against the closed set of event kinds.
//! Unknown names are ignored (forward compatibility); a payload that fails
//! to decode drops that single frame and nothing else. The maximum event id
//! seen so far is recorded regardless of the outcome.

use std::sync::Arc;
use tracing::debug;

use crate::observability::Metrics;
use crate::proto::{
    EventFrame, EventKind, HelloPayload, LogEntry, LogPayload, MetricsPayload, OpsStats,
    QueueCounters, QueuePayload, ResetNotice, TaskPayload, Worker, WorkerPayload,
};

/// Partial state update produced from one event.
#[derive(Debug, Clone)]
pub enum Patch {
    Hello { replay_window_seconds: i64 },
    Metrics(OpsStats),
    Queue(QueueCounters),
    Workers(Vec<Worker>),
    Task(TaskPayload),
    Log(LogEntry),
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Patch(Patch),
    Reset(ResetNotice),
    Ignored,
    Malformed,
}

pub struct Dispatcher {
    highest_seen: Option<i64>,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            highest_seen: None,
            metrics,
        }
    }

    /// Highest event id observed this epoch; monotonically non-decreasing
    /// even when events arrive out of order.
    pub fn highest_seen(&self) -> Option<i64> {
        self.highest_seen
    }

    pub fn dispatch(&mut self, frame: &EventFrame) -> Outcome {
        self.metrics.event_received();
        if let Some(id) = frame.id {
            self.highest_seen = Some(self.highest_seen.map_or(id, |prev| prev.max(id)));
        }

        let Some(kind) = EventKind::parse(&frame.name) else {
            self.metrics.event_ignored();
            return Outcome::Ignored;
        };

        let outcome = match kind {
            EventKind::Hello => decode::<HelloPayload>(frame).map(|p| {
                Outcome::Patch(Patch::Hello {
                    replay_window_seconds: p.replay_window_seconds,
                })
            }),
            EventKind::Metrics => {
                decode::<MetricsPayload>(frame).map(|p| Outcome::Patch(Patch::Metrics(p.stats)))
            }
            EventKind::Queue => {
                decode::<QueuePayload>(frame).map(|p| Outcome::Patch(Patch::Queue(p.queue)))
            }
            EventKind::Worker => {
                decode::<WorkerPayload>(frame).map(|p| Outcome::Patch(Patch::Workers(p.workers)))
            }
            EventKind::Task => decode::<TaskPayload>(frame).map(|p| Outcome::Patch(Patch::Task(p))),
            EventKind::Log => decode::<LogPayload>(frame).map(|p| {
                Outcome::Patch(Patch::Log(LogEntry {
                    event_id: frame.id.unwrap_or(0),
                    ts: p.ts,
                    level: p.level,
                    scope: p.scope,
                    message: p.message,
                    meta: p.meta,
                }))
            }),
            EventKind::Reset => decode::<ResetNotice>(frame).map(Outcome::Reset),
        };

        match outcome {
            Some(outcome) => outcome,
            None => {
                self.metrics.event_malformed();
                Outcome::Malformed
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(frame: &EventFrame) -> Option<T> {
    match serde_json::from_str(&frame.data) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(event = %frame.name, id = ?frame.id, error = %err, "dropping malformed event payload");
            None
        }
    }
}
