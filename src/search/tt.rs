//! Transposition table.
//!
//! Direct-mapped, power-of-two capacity, replace-always. Entries carry the
//! full 64-bit key, the depth they were searched to, a score with a bound
//! flag, and the best move found. Mate scores are stored relative to the
//! storing node and re-rooted on probe.

use super::window::Window;
use crate::types::{
    clamp_score, score_from_tt, score_to_tt, Board, Hash, Move, Score,
};

/// Minimum distance from the root before TT scores may be returned.
/// Keeps early-root probes from short-circuiting repetition handling.
pub const TT_MIN_PLY: i32 = 2;

const DEFAULT_SIZE_MB: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    /// Score fell strictly inside the search window.
    Exact,
    /// Search failed high; the true value is at least the stored score.
    Lower,
    /// Search failed low; the true value is at most the stored score.
    Upper,
}

#[derive(Clone, Copy)]
struct Entry {
    key: Hash,
    depth: i8,
    score: Score,
    flag: Flag,
    best_move: u16,
}

pub struct TranspositionTable {
    entries: Vec<Option<Entry>>,
    mask: usize,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let entry_size = std::mem::size_of::<Option<Entry>>();
        let count = (size_mb.max(1) * 1024 * 1024 / entry_size)
            .next_power_of_two()
            / 2;
        let count = count.max(1024);
        Self {
            entries: vec![None; count],
            mask: count - 1,
        }
    }

    #[inline]
    fn index(&self, hash: Hash) -> usize {
        hash as usize & self.mask
    }

    /// Record the result of searching `board` to `depth` against `window`.
    ///
    /// The flag is derived from where the score landed relative to the
    /// window the node was searched with. Overwrites unconditionally.
    pub fn store(
        &mut self,
        board: &Board,
        depth: i32,
        ply: i32,
        window: &Window,
        score: Score,
        best_move: Option<Move>,
    ) {
        let flag = if score >= window.beta {
            Flag::Lower
        } else if score <= window.alpha {
            Flag::Upper
        } else {
            Flag::Exact
        };
        let hash = board.get_hash();
        let idx = self.index(hash);
        self.entries[idx] = Some(Entry {
            key: hash,
            depth: depth.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
            score: score_to_tt(clamp_score(score as i32), ply),
            flag,
            best_move: encode_move(best_move),
        });
    }

    /// Seed an exact entry, used when replaying the previous iteration's
    /// principal variation so its moves sort first.
    pub fn store_exact(&mut self, board: &Board, depth: i32, score: Score, best_move: Option<Move>) {
        let hash = board.get_hash();
        let idx = self.index(hash);
        self.entries[idx] = Some(Entry {
            key: hash,
            depth: depth.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
            score: clamp_score(score as i32),
            flag: Flag::Exact,
            best_move: encode_move(best_move),
        });
    }

    /// Fetch a stored score usable at this node, if any.
    ///
    /// An entry is usable only when its key matches, it was searched at
    /// least as deep as requested, and its bound applies against the
    /// current window: exact scores always, lower bounds only when they
    /// still clear beta, upper bounds only when they stay under alpha.
    pub fn get_score(
        &self,
        board: &Board,
        depth: i32,
        ply: i32,
        window: &Window,
    ) -> Option<Score> {
        let entry = self.lookup(board)?;
        if (entry.depth as i32) < depth {
            return None;
        }
        let score = score_from_tt(entry.score, ply);
        match entry.flag {
            Flag::Exact => Some(score),
            Flag::Lower if score >= window.beta => Some(score),
            Flag::Upper if score <= window.alpha => Some(score),
            _ => None,
        }
    }

    /// The best move recorded for this position, regardless of depth.
    pub fn get_best_move(&self, board: &Board) -> Option<Move> {
        decode_move(self.lookup(board)?.best_move)
    }

    fn lookup(&self, board: &Board) -> Option<Entry> {
        let hash = board.get_hash();
        let entry = self.entries[self.index(hash)]?;
        if entry.key == hash {
            Some(entry)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.entries.fill(None);
    }

    pub fn resize(&mut self, size_mb: usize) {
        *self = Self::new(size_mb);
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE_MB)
    }
}

/// Encode a move into 16 bits: from (6) + to (6) + promo (4)
fn encode_move(m: Option<Move>) -> u16 {
    match m {
        Some(mv) => {
            let from = mv.get_source().to_index() as u16;
            let to = mv.get_dest().to_index() as u16;
            let promo = match mv.get_promotion() {
                Some(chess::Piece::Knight) => 1,
                Some(chess::Piece::Bishop) => 2,
                Some(chess::Piece::Rook) => 3,
                Some(chess::Piece::Queen) => 4,
                _ => 0,
            };
            from | (to << 6) | (promo << 12) | 0x8000
        }
        None => 0,
    }
}

/// Decode a 16-bit encoded move
fn decode_move(encoded: u16) -> Option<Move> {
    if encoded & 0x8000 == 0 {
        return None;
    }

    let from_idx = (encoded & 0x3f) as u8;
    let to_idx = ((encoded >> 6) & 0x3f) as u8;
    let promo_bits = (encoded >> 12) & 0x07;

    // Square::new is unsafe because it doesn't validate the index; ours
    // come straight from the 6-bit fields and are always in 0..64
    let from = unsafe { chess::Square::new(from_idx) };
    let to = unsafe { chess::Square::new(to_idx) };

    let promo = match promo_bits {
        1 => Some(chess::Piece::Knight),
        2 => Some(chess::Piece::Bishop),
        3 => Some(chess::Piece::Rook),
        4 => Some(chess::Piece::Queen),
        _ => None,
    };

    Some(Move::new(from, to, promo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{mate_score, Color, Square};
    use std::str::FromStr;

    fn null_window_at(score: Score) -> Window {
        Window::new(score - 1, score)
    }

    #[test]
    fn probe_respects_stored_depth() {
        let mut tt = TranspositionTable::new(1);
        let board = Board::default();
        tt.store_exact(&board, 5, 42, None);

        let w = null_window_at(100);
        for depth in 0..=5 {
            assert_eq!(tt.get_score(&board, depth, 3, &w), Some(42));
        }
        assert_eq!(tt.get_score(&board, 6, 3, &w), None);
    }

    #[test]
    fn lower_bound_usable_only_at_or_above_beta() {
        let mut tt = TranspositionTable::new(1);
        let board = Board::default();
        // Fail-high store: score meets beta of the search window
        tt.store(&board, 4, 3, &Window::new(0, 50), 50, None);

        // Usable when the stored bound still clears the probing beta
        assert_eq!(tt.get_score(&board, 4, 3, &Window::new(0, 40)), Some(50));
        // Not usable when beta moved above the bound
        assert_eq!(tt.get_score(&board, 4, 3, &Window::new(0, 60)), None);
    }

    #[test]
    fn upper_bound_usable_only_at_or_below_alpha() {
        let mut tt = TranspositionTable::new(1);
        let board = Board::default();
        // Fail-low store
        tt.store(&board, 4, 3, &Window::new(0, 50), -10, None);

        assert_eq!(tt.get_score(&board, 4, 3, &Window::new(0, 50)), Some(-10));
        assert_eq!(tt.get_score(&board, 4, 3, &Window::new(-20, 50)), None);
    }

    #[test]
    fn exact_scores_feed_any_window() {
        let mut tt = TranspositionTable::new(1);
        let board = Board::default();
        tt.store(&board, 4, 3, &Window::new(-100, 100), 7, None);

        assert_eq!(tt.get_score(&board, 4, 3, &null_window_at(0)), Some(7));
        assert_eq!(tt.get_score(&board, 4, 3, &Window::new(-100, 100)), Some(7));
        assert_eq!(tt.get_score(&board, 4, 3, &Window::new(50, 300)), Some(7));
    }

    #[test]
    fn replace_always_overwrites_deeper_entries() {
        let mut tt = TranspositionTable::new(1);
        let board = Board::default();
        tt.store_exact(&board, 9, 10, None);
        tt.store_exact(&board, 2, 20, None);
        assert_eq!(tt.get_score(&board, 2, 3, &null_window_at(50)), Some(20));
        assert_eq!(tt.get_score(&board, 9, 3, &null_window_at(50)), None);
    }

    #[test]
    fn mate_scores_re_root_on_probe() {
        let mut tt = TranspositionTable::new(1);
        let board = Board::default();
        let at_node = mate_score(Color::Black, 6);
        tt.store(&board, 4, 6, &Window::new(-100, 9_998), at_node, None);
        // Probing from two plies closer to the root shifts the mate
        let probed = tt
            .get_score(&board, 4, 4, &Window::new(9_000, 9_001))
            .expect("entry present");
        assert_eq!(probed, mate_score(Color::Black, 4));
    }

    #[test]
    fn best_move_round_trips() {
        let mut tt = TranspositionTable::new(1);
        let board = Board::default();
        assert_eq!(tt.get_best_move(&board), None);

        let m = Move::new(Square::E2, Square::E4, None);
        tt.store_exact(&board, 1, 0, Some(m));
        assert_eq!(tt.get_best_move(&board), Some(m));

        let other = Board::from_str("4k3/8/8/8/8/8/8/4K3 w - - 0 1").expect("valid fen");
        assert_eq!(tt.get_best_move(&other), None);
    }

    #[test]
    fn clear_empties_the_table() {
        let mut tt = TranspositionTable::new(1);
        let board = Board::default();
        tt.store_exact(&board, 3, 5, None);
        tt.clear();
        assert_eq!(tt.get_score(&board, 0, 3, &null_window_at(10)), None);
    }
}
