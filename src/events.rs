//! Match notifications.
//!
//! The engine reports every newly-matched grid cell both in the return value
//! of `navigate` and, for embedders that want to react out-of-band (celebration
//! effects, sounds), on an mpsc channel. The channel is optional: the engine
//! works with no subscriber attached, and a failed send never disturbs state.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::title::NormalizedTitle;

/// Which phase of the navigation pipeline produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// The clicked title (or its canonical form) equalled the cell title.
    Direct,
    /// The cell's own redirect target equalled the clicked title.
    RedirectAware,
}

/// A grid cell newly claimed by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub title: NormalizedTitle,
    pub cell_index: Option<usize>,
    pub phase: MatchPhase,
}

/// Sending half held by the engine. Each send is fault-isolated: a dropped
/// or full receiver is logged and skipped so remaining notifications and the
/// session state are unaffected.
#[derive(Debug, Clone)]
pub struct MatchNotifier {
    tx: Option<tokio::sync::mpsc::Sender<MatchEvent>>,
}

impl MatchNotifier {
    /// Notifier with no subscriber; all sends are no-ops.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Notifier plus the receiving half for the embedder.
    pub fn channel(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<MatchEvent>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Self { tx: Some(tx) }, rx)
    }

    pub fn notify(&self, event: MatchEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(event) {
            debug!("match notification dropped: {e}");
        }
    }
}
