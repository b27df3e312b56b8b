//! Periodic heartbeat loop for one activity task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::RecordActivityTaskHeartbeatRequest;
use crate::transport::SwsTransport;

/// Spawn the heartbeat loop
///
/// Every `interval` the loop sends the latest progress string published
/// since the previous tick (earlier ones are dropped) and cancels `cancel`
/// when the service reports a cancel request. Failed heartbeats are logged
/// and the next tick is armed regardless. The loop exits when `stop` is
/// cancelled, abandoning a heartbeat that is still in flight.
pub(crate) fn spawn(
    transport: Arc<dyn SwsTransport>,
    task_token: String,
    interval: Duration,
    mut progress: watch::Receiver<Option<String>>,
    cancel: CancellationToken,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let details = match progress.has_changed() {
                Ok(true) => progress.borrow_and_update().clone(),
                _ => None,
            };

            let request = RecordActivityTaskHeartbeatRequest {
                task_token: task_token.clone(),
                details,
            };

            let result = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                result = transport.record_activity_task_heartbeat(request) => result,
            };

            match result {
                Ok(status) if status.cancel_requested => {
                    if !cancel.is_cancelled() {
                        info!("service requested activity cancellation");
                    }
                    cancel.cancel();
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "heartbeat failed"),
            }
        }

        debug!("heartbeat loop stopped");
    })
}
