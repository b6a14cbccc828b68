//! Polling battle feed
//!
//! Fetches a [`BattleSnapshot`] on a fixed interval and publishes it on a
//! `watch` channel. Each cycle aborts the previous cycle's fetch, so a slow
//! response from an older cycle can never overwrite a newer one.

use std::sync::Arc;
use std::time::Duration;

use battle_contract::{BattleHistoryEntry, BattleInfo};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::client::{BattleReads, ChainClient};
use crate::errors::ClientResult;

/// Everything a battle view needs from one polling cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleSnapshot {
    pub info: BattleInfo,
    pub completed_battles: u64,
    pub latest: Option<BattleHistoryEntry>,
    /// Whether the client's sender voted in the current battle
    pub has_voted: bool,
}

/// Read one snapshot
pub async fn fetch_snapshot<C: ChainClient + ?Sized>(client: &C) -> ClientResult<BattleSnapshot> {
    let info = client.battle_info().await?;
    let completed_battles = client.completed_battle_count().await?;
    let latest = if completed_battles > 0 {
        Some(client.battle_history(completed_battles).await?)
    } else {
        None
    };
    let has_voted = client.has_user_voted(client.sender()).await?;
    Ok(BattleSnapshot {
        info,
        completed_battles,
        latest,
        has_voted,
    })
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Handle to a running feed; dropping it stops polling
pub struct BattleFeed {
    rx: watch::Receiver<Option<BattleSnapshot>>,
    _task: AbortOnDrop,
}

impl BattleFeed {
    /// Start polling `client` every `period`
    pub fn spawn<C: ChainClient + 'static>(client: Arc<C>, period: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut in_flight: Option<AbortOnDrop> = None;
            let mut cycle: u64 = 0;

            loop {
                ticker.tick().await;
                cycle += 1;
                // the superseded fetch must not publish
                drop(in_flight.take());

                let client = client.clone();
                let tx = tx.clone();
                in_flight = Some(AbortOnDrop(tokio::spawn(async move {
                    match fetch_snapshot(client.as_ref()).await {
                        Ok(snapshot) => {
                            debug!(cycle, battle = snapshot.info.battle_number, "Feed refreshed");
                            tx.send_replace(Some(snapshot));
                        }
                        Err(err) => warn!(cycle, error = %err, "Feed refresh failed"),
                    }
                })));
            }
        });

        Self {
            rx,
            _task: AbortOnDrop(task),
        }
    }

    /// Latest published snapshot
    pub fn latest(&self) -> Option<BattleSnapshot> {
        self.rx.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Option<BattleSnapshot>> {
        self.rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn test_feed_publishes_snapshots() {
        let client = Arc::new(ScriptedClient::new());
        let feed = BattleFeed::spawn(client.clone(), Duration::from_secs(1));
        let mut rx = feed.subscribe();

        rx.changed().await.unwrap();
        let snapshot = feed.latest().unwrap();
        assert!(snapshot.info.active);
        assert_eq!(snapshot.completed_battles, 0);
        assert!(!snapshot.has_voted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_fetch_never_publishes() {
        let client = Arc::new(ScriptedClient::new());
        // the first cycle's read hangs past several ticks
        client.info_delays.lock().push_back(Duration::from_secs(10));

        let feed = BattleFeed::spawn(client.clone(), Duration::from_secs(1));
        let mut rx = feed.subscribe();
        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
        while tokio::time::Instant::now() < deadline {
            if tokio::time::timeout(Duration::from_secs(1), rx.changed()).await.is_ok() {
                if let Some(s) = rx.borrow_and_update().clone() {
                    seen.push(s.info.battle_number);
                }
            }
        }

        assert!(!seen.is_empty());
        assert!(!seen.contains(&1), "aborted fetch published: {seen:?}");
        assert!(client.info_reads.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let client = Arc::new(ScriptedClient::new());
        let feed = BattleFeed::spawn(client.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        drop(feed);
        tokio::task::yield_now().await;

        let reads = client.info_reads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(client.info_reads.load(Ordering::SeqCst), reads);
    }
}
