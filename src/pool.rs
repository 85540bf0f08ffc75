//! Curated article pool: board generation and replacement draws.
//!
//! The pool is an external collaborator (a JSON endpoint in production)
//! consumed through [`ArticleSource`]. It is read-only and may be cached and
//! shared across sessions. Draws take an explicit `Rng` so tests can seed
//! them.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;
use crate::models::ArticleRef;
use crate::title::NormalizedTitle;
use crate::winline::GRID_SIZE;

/// Articles for one board: the 25 grid cells plus the starting article.
pub const BOARD_SIZE: usize = GRID_SIZE + 1;

/// A themed bundle of candidate articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub articles: Vec<ArticleRef>,
    /// Categories sharing a group tag are interchangeable themes; group caps
    /// keep one theme from dominating a board.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Caps on how many selected categories may share a group tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupConstraints {
    /// Per-group caps, keyed by group tag.
    #[serde(default)]
    pub caps: std::collections::HashMap<String, u32>,
    /// Cap applied to groups without an explicit entry. `None` means
    /// unlimited.
    #[serde(default)]
    pub default_cap: Option<u32>,
}

impl GroupConstraints {
    fn cap_for(&self, group: &str) -> Option<u32> {
        self.caps.get(group).copied().or(self.default_cap)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedPool {
    pub categories: Vec<Category>,
    #[serde(default)]
    pub groups: GroupConstraints,
}

/// Collaborator that fetches the curated pool.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn load_pool(&self) -> Result<CuratedPool>;
}

/// A freshly drawn board.
#[derive(Debug, Clone)]
pub struct BoardDraw {
    /// 25 grid articles, row-major.
    pub grid: Vec<ArticleRef>,
    pub starting_article: ArticleRef,
}

/// Draw a full board from the pool.
///
/// Walks the categories in random order, honoring group caps, taking one
/// random article per category; falls back to ignoring category boundaries
/// if that cannot fill the board. Titles are unique under normalization.
pub fn generate_board<R: Rng + ?Sized>(
    pool: &CuratedPool,
    rng: &mut R,
) -> Result<BoardDraw, EngineError> {
    let mut picked: Vec<ArticleRef> = Vec::with_capacity(BOARD_SIZE);
    let mut used: HashSet<NormalizedTitle> = HashSet::with_capacity(BOARD_SIZE);
    let mut group_counts: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();

    let mut order: Vec<usize> = (0..pool.categories.len()).collect();
    order.shuffle(rng);

    for idx in order {
        if picked.len() == BOARD_SIZE {
            break;
        }
        let category = &pool.categories[idx];
        if let Some(group) = category.group.as_deref() {
            let count = group_counts.entry(group).or_insert(0);
            if pool.groups.cap_for(group).is_some_and(|cap| *count >= cap) {
                continue;
            }
            *count += 1;
        }
        if let Some(article) = draw_from(&category.articles, &used, rng) {
            used.insert(article.key());
            picked.push(article);
        }
    }

    // Not enough categories (or too many collisions): top up from the flat
    // article list.
    if picked.len() < BOARD_SIZE {
        let all: Vec<&ArticleRef> = pool
            .categories
            .iter()
            .flat_map(|c| c.articles.iter())
            .collect();
        let mut order: Vec<usize> = (0..all.len()).collect();
        order.shuffle(rng);
        for idx in order {
            if picked.len() == BOARD_SIZE {
                break;
            }
            let article = all[idx];
            if used.insert(article.key()) {
                picked.push(article.clone());
            }
        }
    }

    if picked.len() < BOARD_SIZE {
        return Err(EngineError::PoolExhausted { needed: BOARD_SIZE });
    }

    let starting_article = picked.pop().expect("board draw is non-empty");
    Ok(BoardDraw {
        grid: picked,
        starting_article,
    })
}

/// Pick a replacement article avoiding every excluded normalized title.
///
/// Tries up to `max_draws` random draws against the exclusion set, then one
/// unconstrained draw. Returns `None` only for an empty pool.
pub fn pick_replacement<R: Rng + ?Sized>(
    pool: &CuratedPool,
    exclude: &HashSet<NormalizedTitle>,
    max_draws: u32,
    rng: &mut R,
) -> Option<ArticleRef> {
    let all: Vec<&ArticleRef> = pool
        .categories
        .iter()
        .flat_map(|c| c.articles.iter())
        .collect();
    if all.is_empty() {
        return None;
    }

    for _ in 0..max_draws {
        let candidate = all[rng.gen_range(0..all.len())];
        if !exclude.contains(&candidate.key()) {
            return Some(candidate.clone());
        }
    }

    warn!(
        "no replacement outside the exclusion set after {max_draws} draws, \
         picking unconstrained"
    );
    Some(all[rng.gen_range(0..all.len())].clone())
}

fn draw_from<R: Rng + ?Sized>(
    articles: &[ArticleRef],
    used: &HashSet<NormalizedTitle>,
    rng: &mut R,
) -> Option<ArticleRef> {
    let fresh: Vec<&ArticleRef> = articles
        .iter()
        .filter(|a| !used.contains(&a.key()))
        .collect();
    fresh.choose(rng).map(|a| (*a).clone())
}
