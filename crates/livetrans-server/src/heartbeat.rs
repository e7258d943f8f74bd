//! Heartbeat ping/pong liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::connection::Connection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped responding within the timeout window.
    TimedOut,
    /// The outbound channel closed; the connection is already going away.
    Disconnected,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Ping the client every `interval` until it stops answering.
///
/// Each tick first checks whether anything arrived since the previous tick.
/// After `max_missed = timeout / interval` (at least 1) consecutive silent
/// ticks the connection is declared dead. The first ping goes out one full
/// interval after the connection opens.
pub async fn run_heartbeat(
    connection: Arc<Connection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let max_missed = max_missed(interval, timeout);
    let mut missed: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if connection.check_alive() {
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
                if !connection.ping() {
                    return HeartbeatResult::Disconnected;
                }
                trace!(session_id = %connection.id(), missed, "sent ping");
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}

fn max_missed(interval: Duration, timeout: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    let ratio = timeout.as_millis() / interval_ms;
    u32::try_from(ratio).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::Message;
    use livetrans_core::SessionId;
    use tokio::sync::mpsc;

    fn make_connection() -> (Arc<Connection>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(32);
        (Arc::new(Connection::new(SessionId::from_raw(1), tx)), rx)
    }

    #[test]
    fn max_missed_ratio() {
        assert_eq!(max_missed(Duration::from_secs(30), Duration::from_secs(30)), 1);
        assert_eq!(max_missed(Duration::from_secs(10), Duration::from_secs(30)), 3);
        assert_eq!(max_missed(Duration::from_secs(30), Duration::from_secs(5)), 1);
        assert_eq!(max_missed(Duration::ZERO, Duration::from_secs(1)), 1000);
    }

    #[tokio::test]
    async fn cancelled_immediately() {
        let (conn, _rx) = make_connection();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run_heartbeat(conn, Duration::from_secs(100), Duration::from_secs(100), cancel).await;
        assert_eq!(result, HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_client_times_out() {
        let (conn, mut rx) = make_connection();
        let result = run_heartbeat(
            conn,
            Duration::from_secs(30),
            Duration::from_secs(30),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, HeartbeatResult::TimedOut);
        // One ping after the first interval, then the silent second tick trips.
        assert!(matches!(rx.try_recv(), Ok(Message::Ping(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn responsive_client_stays_connected() {
        let (conn, mut rx) = make_connection();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(
            Arc::clone(&conn),
            Duration::from_secs(10),
            Duration::from_secs(10),
            cancel.clone(),
        ));

        for _ in 0..5 {
            let ping = rx.recv().await;
            assert!(matches!(ping, Some(Message::Ping(_))));
            conn.mark_alive();
        }

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_stops_heartbeat() {
        let (conn, rx) = make_connection();
        drop(rx);
        let result = run_heartbeat(
            conn,
            Duration::from_secs(1),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, HeartbeatResult::Disconnected);
    }
}
