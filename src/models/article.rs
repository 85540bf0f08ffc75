use serde::{Deserialize, Serialize};

use crate::title::NormalizedTitle;

/// Reference to a Wikipedia article. Immutable value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    /// Display title as it appears on the page (raw, not normalized).
    pub title: String,
    /// Curated-pool category the article came from, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ArticleRef {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category: None,
        }
    }

    pub fn with_category(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category: Some(category.into()),
        }
    }

    /// Normalized comparison key for this article's title.
    pub fn key(&self) -> NormalizedTitle {
        NormalizedTitle::from_raw(&self.title)
    }
}

/// One of the 25 fixed positions on the bingo card.
///
/// The cell itself is never reordered or removed; only its `article` may be
/// swapped by the repair path when the bound article fails to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    /// Stable identifier assigned at session creation.
    pub id: String,
    /// The target article bound to this cell.
    pub article: ArticleRef,
}

impl GridCell {
    pub fn new(index: usize, article: ArticleRef) -> Self {
        Self {
            id: format!("cell-{index}"),
            article,
        }
    }
}

/// How the session's board was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Fresh board drawn from the curated pool.
    Random,
    /// Board loaded from a stored game (shareable/replay link).
    Repeat,
}
