//! Win-line detection over the 5x5 board.
//!
//! A pure function of the grid and the set of matched titles. Safe to call on
//! every state update; the engine recomputes rather than patching the result.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;

use crate::models::GridCell;
use crate::title::NormalizedTitle;

/// Board side length. The grid is always `SIDE * SIDE` cells.
pub const SIDE: usize = 5;

/// Number of cells on the board.
pub const GRID_SIZE: usize = SIDE * SIDE;

/// The 12 fixed winning lines: 5 rows, 5 columns, 2 diagonals.
pub static WIN_LINES: Lazy<Vec<[usize; SIDE]>> = Lazy::new(|| {
    let mut lines = Vec::with_capacity(2 * SIDE + 2);
    for row in 0..SIDE {
        let mut line = [0; SIDE];
        for (col, slot) in line.iter_mut().enumerate() {
            *slot = row * SIDE + col;
        }
        lines.push(line);
    }
    for col in 0..SIDE {
        let mut line = [0; SIDE];
        for (row, slot) in line.iter_mut().enumerate() {
            *slot = row * SIDE + col;
        }
        lines.push(line);
    }
    let mut main = [0; SIDE];
    let mut anti = [0; SIDE];
    for i in 0..SIDE {
        main[i] = i * SIDE + i;
        anti[i] = i * SIDE + (SIDE - 1 - i);
    }
    lines.push(main);
    lines.push(anti);
    lines
});

/// Return the indices of every cell that belongs to a completed line.
///
/// A line is complete iff all 5 of its cells' normalized titles are in
/// `matched`. Cells shared between completed lines appear once. Returns an
/// empty set for a malformed grid or an empty match set.
pub fn detect_winning_cells(
    grid: &[GridCell],
    matched: &HashSet<NormalizedTitle>,
) -> BTreeSet<usize> {
    let mut winning = BTreeSet::new();
    if grid.len() != GRID_SIZE || matched.is_empty() {
        return winning;
    }

    let keys: Vec<NormalizedTitle> = grid
        .iter()
        .map(|cell| NormalizedTitle::from_raw(&cell.article.title))
        .collect();

    for line in WIN_LINES.iter() {
        if line.iter().all(|&i| matched.contains(&keys[i])) {
            winning.extend(line.iter().copied());
        }
    }
    winning
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleRef;

    fn test_grid() -> Vec<GridCell> {
        (0..GRID_SIZE)
            .map(|i| GridCell {
                id: format!("cell-{i}"),
                article: ArticleRef::new(format!("Article{i}")),
            })
            .collect()
    }

    fn matched(indices: &[usize]) -> HashSet<NormalizedTitle> {
        indices
            .iter()
            .map(|i| NormalizedTitle::from_raw(&format!("article{i}")))
            .collect()
    }

    #[test]
    fn test_win_lines_shape() {
        assert_eq!(WIN_LINES.len(), 12);
        for line in WIN_LINES.iter() {
            assert!(line.iter().all(|&i| i < GRID_SIZE));
        }
        assert_eq!(WIN_LINES[10], [0, 6, 12, 18, 24]);
        assert_eq!(WIN_LINES[11], [4, 8, 12, 16, 20]);
    }

    #[test]
    fn test_empty_matched_yields_empty() {
        let grid = test_grid();
        assert!(detect_winning_cells(&grid, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_malformed_grid_yields_empty() {
        let mut grid = test_grid();
        grid.pop();
        assert!(detect_winning_cells(&grid, &matched(&[0, 1, 2, 3, 4])).is_empty());
    }

    #[test]
    fn test_first_row_completes() {
        let grid = test_grid();
        let winning = detect_winning_cells(&grid, &matched(&[0, 1, 2, 3, 4]));
        assert_eq!(winning.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_four_of_a_line_is_not_a_win() {
        let grid = test_grid();
        assert!(detect_winning_cells(&grid, &matched(&[0, 1, 2, 3])).is_empty());
    }

    #[test]
    fn test_shared_cell_counted_once() {
        // First row and first column complete; cell 0 is shared.
        let grid = test_grid();
        let winning = detect_winning_cells(&grid, &matched(&[0, 1, 2, 3, 4, 5, 10, 15, 20]));
        assert_eq!(winning.len(), 9);
        assert_eq!(
            winning.into_iter().collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4, 5, 10, 15, 20]
        );
    }

    #[test]
    fn test_diagonal_completes() {
        let grid = test_grid();
        let winning = detect_winning_cells(&grid, &matched(&[0, 6, 12, 18, 24]));
        assert_eq!(
            winning.into_iter().collect::<Vec<_>>(),
            vec![0, 6, 12, 18, 24]
        );
    }

    #[test]
    fn test_insertion_order_invariance() {
        let grid = test_grid();
        let forward = matched(&[20, 15, 10, 5, 0, 4, 3, 2, 1]);
        let reverse = matched(&[1, 2, 3, 4, 0, 5, 10, 15, 20]);
        assert_eq!(
            detect_winning_cells(&grid, &forward),
            detect_winning_cells(&grid, &reverse)
        );
    }

    #[test]
    fn test_matching_is_normalized() {
        let mut grid = test_grid();
        grid[0].article = ArticleRef::new("Some_Article");
        let mut m = matched(&[1, 2, 3, 4]);
        m.insert(NormalizedTitle::from_raw("some article"));
        let winning = detect_winning_cells(&grid, &m);
        assert_eq!(winning.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }
}
