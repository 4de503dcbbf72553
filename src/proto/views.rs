use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Full authoritative state document returned by the snapshot endpoint.
///
/// Tasks arrive as a list on the wire; the reconciled model re-keys them by
/// composite key (see `state::OpsState`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDoc {
    pub server_time: String,
    pub range: crate::proto::Range,
    pub replay_window_seconds: i64,
    pub queue: QueueCounters,
    pub workers: Vec<Worker>,
    pub tasks: Vec<TaskView>,
    pub stats: OpsStats,
    pub sparks: SparkSeries,
    pub log_tail: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCounters {
    pub pending: i64,
    pub running: i64,
    pub deduped: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Running,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerError {
    pub ts: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub worker_id: String,
    pub state: WorkerState,
    pub task: Option<TaskKey>,
    pub started_at: Option<String>,
    pub last_error: Option<WorkerError>,
}

/// Composite task identity. Uniqueness is over the (fid, gid) pair, not fid
/// alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskKey {
    pub fid: String,
    pub gid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRun {
    pub ended_at: String,
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub key: TaskKey,
    pub state: TaskState,
    pub enqueued_at: String,
    #[serde(default)]
    pub reason_counts: HashMap<String, i64>,
    pub last_run: Option<LastRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateBucket {
    pub total: i64,
    pub success: i64,
    pub failure: i64,
    pub success_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyStats {
    pub telegram: Option<RateBucket>,
    pub web_push: Option<RateBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsStats {
    pub collection: RateBucket,
    pub notify: NotifyStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkSeries {
    pub bucket_seconds: i64,
    pub volume: Vec<i64>,
    pub collection_success_rate_pct: Vec<f64>,
    pub notify_telegram_success_rate_pct: Vec<f64>,
    pub notify_web_push_success_rate_pct: Vec<f64>,
}

/// One entry of the bounded log tail. `event_id` is the server-assigned
/// stream id, also used for resumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub event_id: i64,
    pub ts: String,
    pub level: String,
    pub scope: String,
    pub message: String,
    pub meta: Option<Value>,
}
