//! Potential-match search: swaps not yet made that would complete a run of
//! three. A board with no candidates is deadlocked and must be shuffled.

use crate::board::Board;
use crate::tile::{Pos, Tile};

/// One swap that would complete a line of three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    /// The two tiles already in line, then the supplier that completes them.
    pub tiles: [Pos; 3],
    /// (supplier, gap): swapping these completes the line.
    pub swap: (Pos, Pos),
}

/// Direction of the would-be line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// Step along the line.
    fn along(self) -> (isize, isize) {
        match self {
            Self::Horizontal => (0, 1),
            Self::Vertical => (1, 0),
        }
    }

    /// Step across the line.
    fn across(self) -> (isize, isize) {
        match self {
            Self::Horizontal => (1, 0),
            Self::Vertical => (0, 1),
        }
    }
}

/// Which slot of the three-cell window is the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    /// Pair then gap.
    Last,
    /// Gap then pair.
    First,
    /// Split pair.
    Middle,
}

const PATTERNS: [(Axis, Gap); 6] = [
    (Axis::Horizontal, Gap::Last),
    (Axis::Horizontal, Gap::First),
    (Axis::Horizontal, Gap::Middle),
    (Axis::Vertical, Gap::Last),
    (Axis::Vertical, Gap::First),
    (Axis::Vertical, Gap::Middle),
];

fn step(pos: Pos, (dr, dc): (isize, isize), n: isize) -> Option<Pos> {
    pos.offset(dr * n, dc * n)
}

/// Candidates for the window starting at `start`.
fn window_hints(board: &Board, start: Pos, axis: Axis, gap: Gap, out: &mut Vec<Hint>) {
    let along = axis.along();
    let cells: Option<Vec<&Tile>> = (0..3)
        .map(|i| step(start, along, i).and_then(|p| board.get(p)))
        .collect();
    let Some(cells) = cells else {
        return;
    };
    let (pair, gap_tile, outward) = match gap {
        Gap::Last => ([cells[0], cells[1]], cells[2], Some(1)),
        Gap::First => ([cells[1], cells[2]], cells[0], Some(-1)),
        Gap::Middle => ([cells[0], cells[2]], cells[1], None),
    };
    if !pair[0].same_type(pair[1]) || gap_tile.same_type(pair[0]) {
        return;
    }

    // Suppliers: the gap's neighbours that are not part of the window.
    let (ar, ac) = axis.across();
    let mut offsets = vec![(ar, ac), (-ar, -ac)];
    if let Some(sign) = outward {
        offsets.push((along.0 * sign, along.1 * sign));
    }
    for (dr, dc) in offsets {
        if let Some(supplier) = board.neighbor(gap_tile.pos, dr, dc) {
            if supplier.same_type(pair[0]) {
                out.push(Hint {
                    tiles: [pair[0].pos, pair[1].pos, supplier.pos],
                    swap: (supplier.pos, gap_tile.pos),
                });
            }
        }
    }
}

/// Scan row-major for swaps that would complete a line of three.
///
/// Stops early once three candidates are known, or once any are known past
/// the board's vertical midpoint. An empty result means no such swap exists.
pub fn find_potential_matches(board: &Board) -> Vec<Hint> {
    let mut found = Vec::new();
    for pos in board.positions() {
        for (axis, gap) in PATTERNS {
            window_hints(board, pos, axis, gap, &mut found);
        }
        if found.len() >= 3 || (pos.row >= board.rows() / 2 && !found.is_empty()) {
            break;
        }
    }
    found
}

/// True when no single swap completes a line of three.
pub fn is_deadlocked(board: &Board) -> bool {
    find_potential_matches(board).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{has_any_match, horizontal_run, vertical_run};
    use crate::tile::FoodType;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn board(lines: &[&str]) -> Board {
        Board::from_layout(lines).unwrap()
    }

    /// Try every adjacent swap on a copy and look for a new line run.
    fn brute_force_has_move(b: &Board) -> bool {
        for pos in b.positions() {
            for (dr, dc) in [(0, 1), (1, 0)] {
                let Some(other) = pos.offset(dr, dc) else { continue };
                let mut copy = b.clone();
                if copy.swap(pos, other).is_err() {
                    continue;
                }
                let hit = [pos, other].iter().any(|&p| {
                    !horizontal_run(&copy, p).is_empty() || !vertical_run(&copy, p).is_empty()
                });
                if hit {
                    return true;
                }
            }
        }
        false
    }

    fn has_line_run(b: &Board) -> bool {
        b.positions()
            .any(|p| !horizontal_run(b, p).is_empty() || !vertical_run(b, p).is_empty())
    }

    #[test]
    fn test_pair_then_gap_with_supplier_below() {
        let b = board(&["aabc", "bcab", "cabc"]);
        let hints = find_potential_matches(&b);
        let hint = hints.iter().find(|h| h.swap == (Pos::new(1, 2), Pos::new(0, 2)));
        assert!(hint.is_some(), "{hints:?}");
    }

    #[test]
    fn test_split_pair_vertical() {
        let b = board(&["abc", "bac", "acb"]);
        let hints = find_potential_matches(&b);
        assert!(hints.iter().any(|h| h.swap == (Pos::new(1, 1), Pos::new(1, 0))));
    }

    #[test]
    fn test_gap_then_pair_with_supplier_outside() {
        let b = board(&["abaa", "cdcd"]);
        let hints = find_potential_matches(&b);
        assert!(hints.iter().any(|h| h.swap == (Pos::new(0, 0), Pos::new(0, 1))));
    }

    #[test]
    fn test_deadlocked_board() {
        let b = board(&["abc", "bca", "cab"]);
        assert!(is_deadlocked(&b));
        assert!(!brute_force_has_move(&b));
    }

    #[test]
    fn test_scan_does_not_mutate() {
        let b = board(&["aabc", "bcab", "cabc"]);
        let before = b.snapshot();
        let _ = find_potential_matches(&b);
        assert_eq!(b.snapshot(), before);
        assert!(b.pending_swap().is_none());
    }

    #[test]
    fn test_agrees_with_brute_force_on_small_boards() {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut checked = 0;
        while checked < 300 {
            let mut b = Board::new(4, 4);
            let positions: Vec<Pos> = b.positions().collect();
            for p in positions {
                b.place(p, FoodType(rng.gen_range(0..4)), None).unwrap();
            }
            if has_line_run(&b) {
                continue;
            }
            checked += 1;
            assert_eq!(is_deadlocked(&b), !brute_force_has_move(&b), "\n{b}");
        }
    }

    #[test]
    fn test_square_only_board_still_counts_lines() {
        // Squares are present but no lines; the scan only looks for lines.
        let b = board(&["aab", "aac", "bcd"]);
        assert!(has_any_match(&b));
        assert!(!has_line_run(&b));
        assert_eq!(is_deadlocked(&b), !brute_force_has_move(&b));
    }
}
