//! Wire model for the ops endpoints
//!
//! Payload shapes shared by the snapshot document and the event stream.
//! All JSON is camelCase; timestamps are RFC3339 strings and stay opaque
//! on the client side.

mod event;
mod views;

pub use event::{
    EventFrame, EventKind, HelloPayload, LogPayload, MetricsPayload, QueuePayload, ResetNotice,
    RunInfo, TaskPayload, TaskPhase, WorkerPayload,
};
pub use views::{
    LastRun, LogEntry, NotifyStats, OpsStats, QueueCounters, RateBucket, SnapshotDoc, SparkSeries,
    TaskKey, TaskState, TaskView, Worker, WorkerError, WorkerState,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting range selecting the window the snapshot and stream cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Range {
    #[default]
    H24,
    D7,
    D30,
}

impl Range {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "24h" => Some(Self::H24),
            "7d" => Some(Self::D7),
            "30d" => Some(Self::D30),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::H24 => "24h",
            Self::D7 => "7d",
            Self::D30 => "30d",
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Range {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Range {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Range::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown range: {raw:?}")))
    }
}
