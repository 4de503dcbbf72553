//! Pure reducer applying dispatcher patches to the reconciled state
//!
//! `apply` never mutates its input; the engine installs the returned state
//! behind a new `Arc`. Merge rules per field: wholesale replace for queue
//! counters, worker list, rate stats and replay window; upsert-or-remove by
//! composite key for tasks; bounded append for the log tail.

use std::collections::HashMap;

use crate::dispatch::Patch;
use crate::proto::{TaskPhase, TaskState, TaskView};

use super::OpsState;

/// Apply one patch, producing the next state. `now` is the client clock
/// (RFC3339), used only when a task is first sighted via the stream and the
/// wire carries no enqueue timestamp.
pub fn apply(current: &OpsState, patch: &Patch, log_cap: usize, now: &str) -> OpsState {
    let mut next = current.clone();
    match patch {
        Patch::Hello {
            replay_window_seconds,
        } => {
            next.replay_window_seconds = *replay_window_seconds;
        }
        Patch::Metrics(stats) => {
            next.stats = stats.clone();
        }
        Patch::Queue(queue) => {
            next.queue = queue.clone();
        }
        Patch::Workers(workers) => {
            next.workers = workers.clone();
        }
        Patch::Task(update) => match update.phase {
            TaskPhase::Finished => {
                next.tasks.remove(&update.key);
            }
            TaskPhase::Enqueued | TaskPhase::Started => {
                let entry = next
                    .tasks
                    .entry(update.key.clone())
                    .or_insert_with(|| TaskView {
                        key: update.key.clone(),
                        state: TaskState::Pending,
                        enqueued_at: now.to_string(),
                        reason_counts: HashMap::new(),
                        last_run: None,
                    });
                if update.phase == TaskPhase::Started {
                    entry.state = TaskState::Running;
                }
                if let Some(counts) = &update.reason_counts {
                    entry.reason_counts = counts.clone();
                }
            }
        },
        Patch::Log(entry) => {
            next.log_tail.push_back(entry.clone());
            while next.log_tail.len() > log_cap {
                next.log_tail.pop_front();
            }
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{LogEntry, QueueCounters, TaskKey, TaskPayload, Worker, WorkerState};
    use crate::state::test_support::base_state;

    const NOW: &str = "2024-06-01T12:30:00Z";

    fn key(fid: &str, gid: Option<&str>) -> TaskKey {
        TaskKey {
            fid: fid.to_string(),
            gid: gid.map(str::to_string),
        }
    }

    fn task_patch(
        phase: TaskPhase,
        key: TaskKey,
        reason_counts: Option<Vec<(&str, i64)>>,
    ) -> Patch {
        Patch::Task(TaskPayload {
            phase,
            key,
            reason_counts: reason_counts.map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect()
            }),
            run: None,
        })
    }

    #[test]
    fn test_queue_patch_replaces_wholesale() {
        let state = base_state();
        assert_eq!(state.queue.pending, 3);
        let next = apply(
            &state,
            &Patch::Queue(QueueCounters {
                pending: 2,
                running: 2,
                deduped: 5,
            }),
            200,
            NOW,
        );
        assert_eq!(next.queue.pending, 2);
        assert_eq!(next.queue.running, 2);
        assert_eq!(next.queue.deduped, 5);
        // input untouched
        assert_eq!(state.queue.pending, 3);
    }

    #[test]
    fn test_worker_patch_is_idempotent() {
        let state = base_state();
        let workers = vec![Worker {
            worker_id: "w1".into(),
            state: WorkerState::Running,
            task: Some(key("7", Some("40"))),
            started_at: Some(NOW.into()),
            last_error: None,
        }];
        let once = apply(&state, &Patch::Workers(workers.clone()), 200, NOW);
        let twice = apply(&once, &Patch::Workers(workers.clone()), 200, NOW);
        assert_eq!(once.workers, twice.workers);
        assert_eq!(twice.workers.len(), 1);
    }

    #[test]
    fn test_task_lifecycle_leaves_empty_set() {
        let state = base_state();
        let k = key("7", Some("40"));
        let s1 = apply(
            &state,
            &task_patch(TaskPhase::Enqueued, k.clone(), Some(vec![("scheduled", 1)])),
            200,
            NOW,
        );
        assert_eq!(s1.tasks[&k].state, TaskState::Pending);
        let s2 = apply(&s1, &task_patch(TaskPhase::Started, k.clone(), None), 200, NOW);
        assert_eq!(s2.tasks[&k].state, TaskState::Running);
        let s3 = apply(&s2, &task_patch(TaskPhase::Finished, k.clone(), None), 200, NOW);
        assert!(s3.tasks.is_empty());
    }

    #[test]
    fn test_enqueued_does_not_downgrade_running_task() {
        let state = base_state();
        let k = key("7", None);
        let s1 = apply(&state, &task_patch(TaskPhase::Started, k.clone(), None), 200, NOW);
        let s2 = apply(
            &s1,
            &task_patch(TaskPhase::Enqueued, k.clone(), Some(vec![("retry", 2)])),
            200,
            NOW,
        );
        assert_eq!(s2.tasks[&k].state, TaskState::Running);
        assert_eq!(s2.tasks[&k].reason_counts["retry"], 2);
    }

    #[test]
    fn test_enqueue_time_preserved_from_first_sighting() {
        let state = base_state();
        let k = key("9", None);
        let s1 = apply(&state, &task_patch(TaskPhase::Enqueued, k.clone(), None), 200, NOW);
        let first_seen = s1.tasks[&k].enqueued_at.clone();
        let s2 = apply(
            &s1,
            &task_patch(TaskPhase::Started, k.clone(), None),
            200,
            "2024-06-01T12:45:00Z",
        );
        assert_eq!(s2.tasks[&k].enqueued_at, first_seen);
    }

    #[test]
    fn test_reason_counts_replaced_when_present_else_preserved() {
        let state = base_state();
        let k = key("7", Some("40"));
        let s1 = apply(
            &state,
            &task_patch(TaskPhase::Enqueued, k.clone(), Some(vec![("scheduled", 1)])),
            200,
            NOW,
        );
        // absent counts leave the map alone
        let s2 = apply(&s1, &task_patch(TaskPhase::Started, k.clone(), None), 200, NOW);
        assert_eq!(s2.tasks[&k].reason_counts["scheduled"], 1);
        // present counts replace, not merge
        let s3 = apply(
            &s2,
            &task_patch(TaskPhase::Enqueued, k.clone(), Some(vec![("manual_refresh", 1)])),
            200,
            NOW,
        );
        assert_eq!(s3.tasks[&k].reason_counts.len(), 1);
        assert_eq!(s3.tasks[&k].reason_counts["manual_refresh"], 1);
    }

    #[test]
    fn test_task_set_keyed_by_full_pair() {
        let state = base_state();
        let s1 = apply(
            &state,
            &task_patch(TaskPhase::Enqueued, key("7", Some("40")), None),
            200,
            NOW,
        );
        let s2 = apply(
            &s1,
            &task_patch(TaskPhase::Enqueued, key("7", None), None),
            200,
            NOW,
        );
        assert_eq!(s2.tasks.len(), 2);
        let s3 = apply(
            &s2,
            &task_patch(TaskPhase::Finished, key("7", Some("40")), None),
            200,
            NOW,
        );
        assert_eq!(s3.tasks.len(), 1);
        assert!(s3.tasks.contains_key(&key("7", None)));
    }

    #[test]
    fn test_log_tail_bounded_fifo() {
        let mut state = base_state();
        let cap = 5;
        for i in 0..8 {
            let entry = LogEntry {
                event_id: i,
                ts: NOW.into(),
                level: "info".into(),
                scope: "ops".into(),
                message: format!("entry {i}"),
                meta: None,
            };
            state = apply(&state, &Patch::Log(entry), cap, NOW);
        }
        assert_eq!(state.log_tail.len(), cap);
        let ids: Vec<i64> = state.log_tail.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_hello_updates_replay_window() {
        let state = base_state();
        let next = apply(
            &state,
            &Patch::Hello {
                replay_window_seconds: 1800,
            },
            200,
            NOW,
        );
        assert_eq!(next.replay_window_seconds, 1800);
    }
}
