//! Reconciliation engine: bootstrap, subscribe, merge, resync
//!
//! One tokio task owns the whole pipeline, so every merge runs to
//! completion between awaits and there is never more than one logical
//! writer. Cross-epoch event delivery is prevented structurally: the
//! subscription stream for epoch n is dropped before the snapshot for
//! epoch n+1 is fetched and before its stream is opened.

mod backoff;

pub use backoff::{ResetBackoff, ResetBackoffConfig};

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{OpsApi, TransportItem};
use crate::dispatch::{Dispatcher, Outcome, Patch};
use crate::observability::{Metrics, MetricsSnapshot};
use crate::proto::Range;
use crate::state::{ConnectionPhase, ConnectionStatus, EngineView, OpsState, merge};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub range: Range,
    pub log_tail_cap: usize,
    pub resync: ResetBackoffConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            range: Range::H24,
            log_tail_cap: 200,
            resync: ResetBackoffConfig::default(),
        }
    }
}

#[derive(Debug)]
enum Command {
    SetRange(Range),
    Shutdown,
}

enum CycleEnd {
    Resync,
    RangeChange(Range),
    Shutdown,
}

enum Bootstrap {
    Ready,
    Interrupted(CycleEnd),
}

/// Handle to a running engine. Dropping it (or calling [`shutdown`]) closes
/// the live subscription; there is no other disposal path.
///
/// [`shutdown`]: EngineHandle::shutdown
pub struct EngineHandle {
    views: watch::Receiver<EngineView>,
    cmds: mpsc::Sender<Command>,
    metrics: Arc<Metrics>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Subscribe to published views. Every borrowed view is fully formed.
    pub fn view(&self) -> watch::Receiver<EngineView> {
        self.views.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Switch the reporting range: closes the live subscription, discards
    /// the current state and any in-flight fetch, and starts a fresh cycle.
    pub async fn set_range(&self, range: Range) -> bool {
        self.cmds.send(Command::SetRange(range)).await.is_ok()
    }

    pub async fn shutdown(self) {
        let _ = self.cmds.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

pub struct Engine<A: OpsApi> {
    api: Arc<A>,
    range: Range,
    log_cap: usize,
    epoch: u64,
    snapshot: Option<Arc<OpsState>>,
    conn: ConnectionStatus,
    backoff: ResetBackoff,
    views: watch::Sender<EngineView>,
    cmds: mpsc::Receiver<Command>,
    metrics: Arc<Metrics>,
}

impl<A: OpsApi> Engine<A> {
    pub fn spawn(config: EngineConfig, api: A) -> EngineHandle {
        let metrics = Arc::new(Metrics::new());
        let (view_tx, view_rx) = watch::channel(EngineView::default());
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let engine = Engine {
            api: Arc::new(api),
            range: config.range,
            log_cap: config.log_tail_cap,
            epoch: 0,
            snapshot: None,
            conn: ConnectionStatus::default(),
            backoff: ResetBackoff::new(config.resync),
            views: view_tx,
            cmds: cmd_rx,
            metrics: metrics.clone(),
        };
        let task = tokio::spawn(engine.run());

        EngineHandle {
            views: view_rx,
            cmds: cmd_tx,
            metrics,
            task,
        }
    }

    async fn run(mut self) {
        info!(range = %self.range, "ops engine starting");
        loop {
            match self.cycle().await {
                CycleEnd::Resync => {}
                CycleEnd::RangeChange(range) => {
                    info!(%range, "reporting range changed");
                    self.range = range;
                    self.snapshot = None;
                    self.backoff.clear();
                    self.conn.last_reset = None;
                    self.conn.last_error = None;
                    self.publish();
                }
                CycleEnd::Shutdown => break,
            }
        }
        info!("ops engine stopped");
    }

    /// One subscription epoch: wait out the resync backoff, fetch the
    /// baseline, then route stream events until a reset, a command, or a
    /// dead transport ends the cycle.
    async fn cycle(&mut self) -> CycleEnd {
        self.epoch += 1;
        self.conn.epoch = self.epoch;
        self.conn.phase = ConnectionPhase::Reconnecting;
        self.conn.last_event_id = None;
        self.publish();

        let delay = self.backoff.delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "delaying resync after repeated resets");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                cmd = self.cmds.recv() => return handle_command(cmd),
            }
        }

        match self.bootstrap().await {
            Bootstrap::Ready => {}
            Bootstrap::Interrupted(end) => return end,
        }

        let mut dispatcher = Dispatcher::new(self.metrics.clone());
        let mut stream = self.api.subscribe(self.range);

        loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(TransportItem::Opened) => {
                        self.conn.phase = ConnectionPhase::Connected;
                        self.publish();
                    }
                    Some(TransportItem::Disconnected { error }) => {
                        self.metrics.reconnect();
                        debug!(%error, "event stream disconnected; transport will retry");
                        self.conn.phase = ConnectionPhase::Reconnecting;
                        self.publish();
                    }
                    Some(TransportItem::Event(frame)) => match dispatcher.dispatch(&frame) {
                        Outcome::Patch(patch) => {
                            self.conn.last_event_id = dispatcher.highest_seen();
                            self.apply(&patch);
                            self.publish();
                        }
                        Outcome::Reset(notice) => {
                            // close the subscription before anything else;
                            // the refetch and re-subscribe happen in the
                            // next cycle, on a bumped epoch
                            drop(stream);
                            warn!(reason = %notice.reason, "server reset the event stream");
                            self.metrics.reset();
                            self.backoff.record(Instant::now());
                            self.conn.phase = ConnectionPhase::Reset;
                            self.conn.last_reset = Some(notice);
                            self.publish();
                            return CycleEnd::Resync;
                        }
                        Outcome::Ignored | Outcome::Malformed => {
                            self.conn.last_event_id = dispatcher.highest_seen();
                            self.publish();
                        }
                    },
                    None => {
                        warn!("event stream ended; restarting cycle");
                        self.backoff.record(Instant::now());
                        self.conn.phase = ConnectionPhase::Reconnecting;
                        self.publish();
                        return CycleEnd::Resync;
                    }
                },
                cmd = self.cmds.recv() => {
                    // stream dropped on return: single disposal path for
                    // range change and shutdown alike
                    return handle_command(cmd);
                }
            }
        }
    }

    /// Fetch the baseline, retrying once immediately on failure. A command
    /// arriving mid-fetch wins the race and the fetch result is discarded,
    /// never applied.
    async fn bootstrap(&mut self) -> Bootstrap {
        let api = self.api.clone();
        let range = self.range;
        let metrics = self.metrics.clone();
        let fetch = async move {
            metrics.snapshot_fetch();
            match api.fetch_snapshot(range).await {
                Ok(doc) => Ok(doc),
                Err(first) => {
                    warn!(error = %first, "snapshot fetch failed; retrying once");
                    metrics.snapshot_fetch();
                    api.fetch_snapshot(range).await
                }
            }
        };
        tokio::pin!(fetch);

        tokio::select! {
            result = &mut fetch => {
                match result {
                    Ok(doc) => {
                        let state = OpsState::from_snapshot(doc, self.log_cap);
                        self.conn.replay_window_seconds = Some(state.replay_window_seconds);
                        self.conn.last_error = None;
                        self.snapshot = Some(Arc::new(state));
                    }
                    Err(err) => {
                        // keep going: the stream still gets opened so the
                        // next server reset can recover the baseline
                        error!(error = %err, "snapshot fetch failed; no baseline for this epoch");
                        self.metrics.snapshot_error();
                        self.conn.last_error = Some(err.to_string());
                    }
                }
                self.publish();
                Bootstrap::Ready
            }
            cmd = self.cmds.recv() => Bootstrap::Interrupted(handle_command(cmd)),
        }
    }

    fn apply(&mut self, patch: &Patch) {
        match &self.snapshot {
            Some(current) => {
                let next = merge::apply(current, patch, self.log_cap, &now_rfc3339());
                self.snapshot = Some(Arc::new(next));
                self.metrics.patch_applied();
            }
            None => {
                // patches are only meaningful against an established baseline
                self.metrics.patch_dropped();
            }
        }
        if let Patch::Hello {
            replay_window_seconds,
        } = patch
        {
            self.conn.replay_window_seconds = Some(*replay_window_seconds);
        }
    }

    fn publish(&self) {
        let _ = self.views.send_replace(EngineView {
            snapshot: self.snapshot.clone(),
            conn: self.conn.clone(),
        });
    }
}

fn handle_command(cmd: Option<Command>) -> CycleEnd {
    match cmd {
        Some(Command::SetRange(range)) => CycleEnd::RangeChange(range),
        Some(Command::Shutdown) | None => CycleEnd::Shutdown,
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
