//! Article replacement.
//!
//! When the rendering layer reports that an article failed to load, the
//! engine swaps in a fresh pick from the curated pool. Repairs are keyed by
//! normalized title: duplicate failure reports (retries, double events)
//! collapse to a single replacement, while repairs for different titles may
//! run concurrently. Nothing here errors out to the caller; a repair that
//! cannot complete logs and leaves the session unchanged.

use rand::thread_rng;
use tracing::{debug, info, warn};

use super::GameEngine;
use crate::pool::pick_replacement;
use crate::title::NormalizedTitle;

/// What the failed title was bound to when the repair was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepairTarget {
    GridCell(usize),
    CurrentArticle,
}

impl GameEngine {
    /// Replace the article behind `failed_title` with a fresh pool pick.
    pub async fn repair(&self, failed_title: &str) {
        let failed_key = NormalizedTitle::from_raw(failed_title);

        // Admission: identify the target and claim the per-title flag.
        let (target, exclude, epoch) = {
            let mut session = self.session_mutex().lock().await;
            if !session.started {
                return;
            }
            if session.repairs_in_flight.contains(&failed_key) {
                debug!("repair for {failed_title:?} already in flight, dropping");
                return;
            }
            let target = if let Some(index) = session.cell_index_of(&failed_key) {
                RepairTarget::GridCell(index)
            } else if session.current_key() == Some(failed_key.clone()) {
                RepairTarget::CurrentArticle
            } else {
                debug!("repair for {failed_title:?} matches neither grid nor current article");
                return;
            };
            session.repairs_in_flight.insert(failed_key.clone());
            (target, session.occupied_keys(), session.epoch)
        };

        let replacement = match self.source().load_pool().await {
            Ok(pool) => pick_replacement(
                &pool,
                &exclude,
                self.engine_config().replacement_max_draws,
                &mut thread_rng(),
            ),
            Err(e) => {
                warn!("repair for {failed_title:?} aborted, pool unavailable: {e}");
                None
            }
        };

        // Commit (with stale re-verification) and release the flag in one
        // lock scope, so the flag clears on every path.
        let mut session = self.session_mutex().lock().await;
        if session.epoch != epoch {
            // The session was replaced while the pool call was in flight.
            // The fresh session never carried our flag; just walk away.
            debug!("session replaced during repair of {failed_title:?}, dropping");
            return;
        }
        session.repairs_in_flight.remove(&failed_key);

        let Some(replacement) = replacement else {
            warn!("no replacement available for {failed_title:?}, leaving state unchanged");
            return;
        };

        match target {
            RepairTarget::GridCell(index) => {
                // The grid may have changed while the pool call was in
                // flight; only commit if the cell still holds the failure.
                let still_failed = session
                    .grid
                    .get(index)
                    .is_some_and(|cell| cell.article.key() == failed_key);
                if !still_failed {
                    debug!("cell {index} no longer holds {failed_title:?}, dropping stale repair");
                    return;
                }
                info!(
                    "replacing unloadable grid article {failed_title:?} with {:?}",
                    replacement.title
                );
                session.grid[index].article = replacement;
            }
            RepairTarget::CurrentArticle => {
                if session.current_key() != Some(failed_key) {
                    debug!("current article moved past {failed_title:?}, dropping stale repair");
                    return;
                }
                info!(
                    "replacing unloadable current article {failed_title:?} with {:?}",
                    replacement.title
                );
                // Counts as a visit, not as a click.
                session.current_article_title = Some(replacement.title.clone());
                session.history.push(replacement.title);
            }
        }
    }
}
