//! Debounced source store.
//!
//! [`SourceStore`] is the state machine behind the quiet-period debounce:
//! `edit` records the newest raw text and pushes the deadline out, `fire`
//! publishes that text once the deadline has passed. Intermediate edits are
//! overwritten, never queued. [`debounce`] drives a store from a channel.

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct SourceStore {
    quiet: Duration,
    last_raw: Option<String>,
    deadline: Option<Instant>,
    published: String,
}

impl SourceStore {
    /// Store whose initial text is published immediately
    pub fn new(initial: impl Into<String>, quiet: Duration) -> Self {
        Self {
            quiet,
            last_raw: None,
            deadline: None,
            published: initial.into(),
        }
    }

    /// Record a raw edit and restart the quiet period
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) {
        self.last_raw = Some(text.into());
        self.deadline = Some(now + self.quiet);
        trace!(deadline = ?self.deadline, "source edited");
    }

    /// When the pending edit becomes stable, if there is one
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.last_raw.is_some()
    }

    /// Publish the pending edit if its quiet period has elapsed
    pub fn fire(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                let text = self.last_raw.take()?;
                self.published.clone_from(&text);
                Some(text)
            }
            _ => None,
        }
    }

    /// Most recently published (stable) text
    pub fn published(&self) -> &str {
        &self.published
    }
}

/// Forward stable values of `raw` to the returned receiver.
///
/// The initial text is sent first; the task ends when `raw` closes. A pending
/// edit is flushed at close so the last keystrokes are not lost.
pub fn debounce(
    initial: impl Into<String>,
    quiet: Duration,
    mut raw: mpsc::UnboundedReceiver<String>,
) -> mpsc::UnboundedReceiver<String> {
    let (stable_tx, stable_rx) = mpsc::unbounded_channel();
    let mut store = SourceStore::new(initial, quiet);
    let _ = stable_tx.send(store.published().to_string());

    tokio::spawn(async move {
        loop {
            let pending = store.deadline();
            let wake = pending.unwrap_or_else(Instant::now);
            tokio::select! {
                edit = raw.recv() => match edit {
                    Some(text) => store.edit(text, Instant::now()),
                    None => {
                        if let Some(deadline) = store.deadline() {
                            sleep_until(deadline).await;
                            if let Some(text) = store.fire(deadline) {
                                let _ = stable_tx.send(text);
                            }
                        }
                        break;
                    }
                },
                _ = sleep_until(wake), if pending.is_some() => {
                    if let Some(text) = store.fire(Instant::now()) {
                        if stable_tx.send(text).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    stable_rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const QUIET: Duration = Duration::from_millis(500);

    #[test]
    fn test_initial_text_is_published() {
        let store = SourceStore::new("initial", QUIET);
        assert_eq!(store.published(), "initial");
        assert!(store.deadline().is_none());
        assert!(!store.is_pending());
    }

    #[test]
    fn test_fire_before_deadline_does_nothing() {
        let start = Instant::now();
        let mut store = SourceStore::new("", QUIET);
        store.edit("a", start);
        assert_eq!(store.fire(start + Duration::from_millis(499)), None);
        assert_eq!(store.fire(start + QUIET), Some("a".to_string()));
        assert_eq!(store.published(), "a");
        assert_eq!(store.fire(start + QUIET * 2), None);
    }

    #[test]
    fn test_each_edit_restarts_the_timer() {
        let start = Instant::now();
        let mut store = SourceStore::new("", QUIET);
        store.edit("a", start);
        store.edit("ab", start + Duration::from_millis(400));
        assert_eq!(store.fire(start + QUIET), None);
        assert_eq!(
            store.fire(start + Duration::from_millis(900)),
            Some("ab".to_string())
        );
    }

    proptest! {
        #[test]
        fn prop_burst_publishes_only_the_last_edit(
            gaps in prop::collection::vec(0u64..500, 1..20),
        ) {
            let start = Instant::now();
            let mut store = SourceStore::new("initial", QUIET);
            let mut now = start;
            let mut published = Vec::new();

            for (i, gap) in gaps.iter().enumerate() {
                now += Duration::from_millis(*gap);
                // Nothing becomes stable inside the burst.
                if let Some(text) = store.fire(now) {
                    published.push(text);
                }
                store.edit(format!("edit {}", i), now);
            }
            if let Some(text) = store.fire(now + QUIET) {
                published.push(text);
            }

            prop_assert_eq!(published, vec![format!("edit {}", gaps.len() - 1)]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_driver() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut stable = debounce("initial", QUIET, raw_rx);
        assert_eq!(stable.recv().await.as_deref(), Some("initial"));

        for text in ["a", "ab", "abc"] {
            raw_tx.send(text.to_string()).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(stable.recv().await.as_deref(), Some("abc"));

        raw_tx.send("abcd".to_string()).unwrap();
        drop(raw_tx);
        assert_eq!(stable.recv().await.as_deref(), Some("abcd"));
        assert_eq!(stable.recv().await, None);
    }
}
