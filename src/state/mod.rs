//! Reconciled in-memory model
//!
//! `OpsState` is the single coherent state object consumers read. It has
//! exactly one writer (the engine task); every published view wraps a fresh
//! `Arc`, so readers never observe a half-applied patch.

pub mod merge;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::proto::{
    LogEntry, OpsStats, QueueCounters, Range, ResetNotice, SnapshotDoc, SparkSeries, TaskKey,
    TaskView, Worker,
};

/// Reconciled operational state. Tasks form a set keyed by composite key;
/// iteration order is not meaningful. The log tail is a bounded FIFO.
#[derive(Debug, Clone)]
pub struct OpsState {
    pub server_time: String,
    pub range: Range,
    pub replay_window_seconds: i64,
    pub queue: QueueCounters,
    pub workers: Vec<Worker>,
    pub tasks: HashMap<TaskKey, TaskView>,
    pub stats: OpsStats,
    pub sparks: SparkSeries,
    pub log_tail: VecDeque<LogEntry>,
}

impl OpsState {
    /// Build the baseline from a freshly fetched snapshot document,
    /// enforcing the local log-tail cap.
    pub fn from_snapshot(doc: SnapshotDoc, log_cap: usize) -> Self {
        let tasks = doc
            .tasks
            .into_iter()
            .map(|t| (t.key.clone(), t))
            .collect::<HashMap<_, _>>();
        let mut log_tail: VecDeque<LogEntry> = doc.log_tail.into();
        while log_tail.len() > log_cap {
            log_tail.pop_front();
        }
        Self {
            server_time: doc.server_time,
            range: doc.range,
            replay_window_seconds: doc.replay_window_seconds,
            queue: doc.queue,
            workers: doc.workers,
            tasks,
            stats: doc.stats,
            sparks: doc.sparks,
            log_tail,
        }
    }
}

/// Connection phase as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Reconnecting,
    Connected,
    Reset,
}

impl ConnectionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reconnecting => "reconnecting",
            Self::Connected => "connected",
            Self::Reset => "reset",
        }
    }
}

/// Ephemeral connection summary; not part of the snapshot.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    pub phase: ConnectionPhase,
    pub epoch: u64,
    pub replay_window_seconds: Option<i64>,
    pub last_event_id: Option<i64>,
    pub last_reset: Option<ResetNotice>,
    pub last_error: Option<String>,
}

/// What consumers receive on the watch channel: the latest fully-formed
/// state (if a baseline exists) plus the connection summary.
#[derive(Debug, Clone, Default)]
pub struct EngineView {
    pub snapshot: Option<Arc<OpsState>>,
    pub conn: ConnectionStatus,
}
