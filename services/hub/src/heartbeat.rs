//! Heartbeat monitor
//!
//! Periodically scans per-adapter last-data timestamps and pushes adapters
//! that have gone silent into the reconnection path. This is also the
//! recovery net for the case where a session's disconnect signal was
//! dropped by a full inbound buffer: the silence itself triggers recovery.

use crate::hub::HubInner;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};

pub(crate) fn spawn(inner: Arc<HubInner>) {
    tokio::spawn(async move { run(inner).await });
}

async fn run(inner: Arc<HubInner>) {
    let period = inner.config.heartbeat_interval();
    let threshold = inner.config.stale_after();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut shutdown = inner.shutdown.subscribe();

    tracing::debug!(
        "Heartbeat monitor started (period {:?}, stale after {:?})",
        period,
        threshold
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::debug!("Heartbeat monitor stopping");
                    return;
                }
                continue;
            }
        }

        // The reconnection guard makes this idempotent: an adapter stays
        // stale across several ticks but gets exactly one recovery loop
        for adapter in inner.stale_adapters() {
            tracing::warn!(
                "No data from adapter {} for over {:?}, forcing reconnect",
                adapter,
                threshold
            );
            inner.clone().maybe_start_reconnect(&adapter);
        }
    }
}
