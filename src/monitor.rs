use tracing::{info, warn};

use opswatch::api::OpsClient;
use opswatch::config::Config;
use opswatch::engine::Engine;
use opswatch::proto::Range;
use opswatch::state::{ConnectionPhase, EngineView};

use crate::cli::WatchArgs;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(args: WatchArgs) -> Result<(), AnyError> {
    let mut config = match args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(base_url) = args.base_url {
        config.server.base_url = base_url;
    }
    if let Some(raw) = args.range {
        config.engine.range =
            Range::parse(&raw).ok_or_else(|| format!("invalid range: {raw:?}"))?;
    }

    let client = OpsClient::new(config.server.base_url.clone(), config.client_config())?;
    let handle = Engine::spawn(config.engine_config(), client);
    let mut views = handle.view();

    info!(
        base_url = %config.server.base_url,
        range = %config.engine.range,
        "watching ops state"
    );

    let mut reporter = Reporter::default();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                reporter.report(&view);
            }
        }
    }

    info!("shutting down");
    handle.shutdown().await;
    Ok(())
}

#[derive(Default)]
struct Reporter {
    phase: Option<ConnectionPhase>,
    fetch_error: Option<String>,
    log_cursor: i64,
}

impl Reporter {
    fn report(&mut self, view: &EngineView) {
        if self.phase != Some(view.conn.phase) {
            match view.conn.phase {
                ConnectionPhase::Connected => info!(epoch = view.conn.epoch, "connected"),
                ConnectionPhase::Reconnecting => warn!(epoch = view.conn.epoch, "reconnecting"),
                ConnectionPhase::Reset => {
                    let reason = view
                        .conn
                        .last_reset
                        .as_ref()
                        .map(|r| r.reason.as_str())
                        .unwrap_or("unknown");
                    warn!(epoch = view.conn.epoch, reason, "stream reset by server");
                }
            }
            self.phase = Some(view.conn.phase);
        }

        if view.conn.last_error != self.fetch_error {
            if let Some(error) = &view.conn.last_error {
                warn!(%error, "snapshot fetch failed");
            }
            self.fetch_error = view.conn.last_error.clone();
        }

        if let Some(snapshot) = &view.snapshot {
            let cursor = self.log_cursor;
            for entry in snapshot.log_tail.iter().filter(|e| e.event_id > cursor) {
                info!(
                    target: "ops.log",
                    id = entry.event_id,
                    level = %entry.level,
                    scope = %entry.scope,
                    "{}",
                    entry.message
                );
                self.log_cursor = self.log_cursor.max(entry.event_id);
            }
        }
    }
}
