//! ==============================================================================
//! refresh.rs - periodic reader of the reading buffer
//! ==============================================================================
//!
//! purpose:
//!     the single timer-driven consumer. every tick it copies a snapshot out
//!     of the buffer, computes the dashboard summary and publishes it on a
//!     watch channel. the web server only ever reads the latest published
//!     summary, so page loads never contend with the tcp writers.
//!
//! ==============================================================================

use crate::buffer::SharedBuffer;
use crate::domain::{now_ms, Summary};
use crate::stats;

use std::time::Duration;
use tokio::sync::watch;

/// compute a summary from the current buffer contents
pub async fn refresh_once(buffer: &SharedBuffer) -> Summary {
    let (snapshot, ingest) = buffer.snapshot_with_stats().await;
    let capacity = buffer.capacity().await;
    stats::summarize(&snapshot, capacity, ingest, now_ms())
}

/// publish a fresh summary every `interval` until every receiver is gone
pub async fn run(
    buffer: SharedBuffer,
    interval: Duration,
    tx: watch::Sender<Summary>,
    show_summary: bool,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let summary = refresh_once(&buffer).await;

        if show_summary {
            if let (Some(max_t), Some(avg_h)) = (summary.max_temperature, summary.avg_humidity) {
                tracing::info!(
                    "[REFRESH] {} readings | max temp {:.2}°C | avg humidity {:.2}% | rejected {}",
                    summary.count,
                    max_t,
                    avg_h,
                    summary.ingest.rejected
                );
            }
        }

        if tx.send(summary).is_err() {
            tracing::debug!("no summary subscribers left, stopping refresh loop");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "20,21,22,23,40,41,42,50,51,21.5";

    #[tokio::test]
    async fn test_refresh_once() {
        let buffer = SharedBuffer::new(20);
        buffer.append(LINE, 1).await.unwrap();
        buffer.append("bad", 2).await.unwrap_err();

        let s = refresh_once(&buffer).await;
        assert_eq!(s.count, 1);
        assert_eq!(s.capacity, 20);
        assert_eq!(s.max_temperature, Some(23.0));
        assert_eq!(s.ingest.accepted, 1);
        assert_eq!(s.ingest.rejected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_publishes_updates() {
        let buffer = SharedBuffer::default();
        let (tx, mut rx) = watch::channel(Summary::default());
        tokio::spawn(run(buffer.clone(), Duration::from_millis(500), tx, false));

        // first tick fires immediately on an empty buffer
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().count, 0);

        buffer.append(LINE, 1).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().count, 1);
    }

    #[tokio::test]
    async fn test_run_stops_without_receivers() {
        let (tx, rx) = watch::channel(Summary::default());
        drop(rx);
        let handle = tokio::spawn(run(SharedBuffer::default(), Duration::from_millis(100), tx, false));
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("refresh loop should exit")
            .unwrap();
    }
}
