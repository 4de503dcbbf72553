use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::views::{OpsStats, QueueCounters, TaskKey, Worker};

/// One decoded frame off the event stream. `id` is the server-assigned
/// stream cursor; `name` is the declared event name; `data` is the raw JSON
/// payload (decoded per kind by the dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    pub id: Option<i64>,
    pub name: String,
    pub data: String,
}

/// Closed set of recognized event kinds. Anything else on the wire is
/// ignored for forward compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Hello,
    Metrics,
    Queue,
    Worker,
    Task,
    Log,
    Reset,
}

impl EventKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ops.hello" => Some(Self::Hello),
            "ops.metrics" => Some(Self::Metrics),
            "ops.queue" => Some(Self::Queue),
            "ops.worker" => Some(Self::Worker),
            "ops.task" => Some(Self::Task),
            "ops.log" => Some(Self::Log),
            "ops.reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Sent once per connection open; announces the server's replay window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloPayload {
    pub server_time: String,
    pub range: crate::proto::Range,
    pub replay_window_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPayload {
    pub server_time: String,
    pub range: crate::proto::Range,
    pub stats: OpsStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePayload {
    pub queue: QueueCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPayload {
    pub workers: Vec<Worker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    Enqueued,
    Started,
    Finished,
}

/// Run metadata attached to started/finished task events. The wire carries
/// more (fetch/parse/error detail); only what the reconciled view needs is
/// decoded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub run_id: i64,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub ok: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub phase: TaskPhase,
    pub key: TaskKey,
    pub reason_counts: Option<HashMap<String, i64>>,
    pub run: Option<RunInfo>,
}

/// Log event payload. Carries no id of its own; the frame id becomes the
/// entry's `event_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPayload {
    pub ts: String,
    pub level: String,
    pub scope: String,
    pub message: String,
    pub meta: Option<Value>,
}

/// Server-declared stream invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetNotice {
    pub server_time: String,
    pub reason: String,
    pub details: Option<String>,
}
