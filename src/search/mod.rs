//! Search module.
//!
//! # Architecture
//! - `Searcher`: iterative-deepening controller owning the shared state
//!   (transposition table, history, killers, repetition table)
//! - `pvs`: principal-variation alpha-beta driver with the pruning suite
//! - `qsearch`: captures-only extension search
//! - `window`: color-polymorphic alpha/beta window
//! - `ordering`: TT move, MVV-LVA, killers, history
//! - `limits`: `go` parameters and time budgeting

mod draw;
mod history;
mod limits;
mod ordering;
mod pvs;
mod qsearch;
mod tt;
mod window;

pub use draw::DrawTable;
pub use limits::{SearchLimits, TimeManager};
pub use window::Window;

use crate::eval;
use crate::types::{clamp_score, legal_moves, Board, Move, NodeCount, Score};
use history::{History, Killers};
use std::time::Instant;
use tracing::debug;
use tt::TranspositionTable;

/// Extra plies the quiescence search may extend past the nominal depth.
pub const MAX_QSEARCH_DEPTH: i32 = 10;

/// Depth cap for iterative deepening.
pub const MAX_DEPTH: i32 = 64;

/// Search statistics collected during search
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub depth: i32,
    pub seldepth: i32,
    pub nodes: NodeCount,
    pub time_ms: u64,
}

impl SearchStats {
    pub fn nps(&self) -> u64 {
        if self.time_ms > 0 {
            self.nodes * 1000 / self.time_ms
        } else {
            0
        }
    }
}

/// Result of a completed search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: Score,
    pub pv: Vec<Move>,
    pub stats: SearchStats,
}

/// Iterative-deepening search controller.
///
/// Owns every table the search frames share. A [`reset`](Self::reset) is
/// performed at the start of each root search; between iterations the
/// tables shrink rather than clear.
pub struct Searcher {
    pub(crate) tt: TranspositionTable,
    pub(crate) history: History,
    pub(crate) killers: Killers,
    pub(crate) draw: DrawTable,
    pub(crate) cur_depth: i32,
    pub(crate) cur_max_qsearch_depth: i32,
    pub(crate) total_nodes: u64,
    session_nodes: u64,
    max_nodes: u64,
    pub(crate) achieved_depth: i32,
    pub(crate) pv_score: Score,
    pv: Vec<Move>,
    start: Instant,
    time_budget_ms: u64,
    stopped: bool,
}

impl Searcher {
    pub fn new() -> Self {
        Self {
            tt: TranspositionTable::default(),
            history: History::new(),
            killers: Killers::new(),
            draw: DrawTable::new(),
            cur_depth: 0,
            cur_max_qsearch_depth: MAX_QSEARCH_DEPTH,
            total_nodes: 0,
            session_nodes: 0,
            max_nodes: u64::MAX,
            achieved_depth: 0,
            pv_score: 0,
            pv: Vec::new(),
            start: Instant::now(),
            time_budget_ms: u64::MAX,
            stopped: false,
        }
    }

    /// Replace the repetition table fed from the game history.
    pub fn set_draw_table(&mut self, draw: DrawTable) {
        self.draw = draw;
    }

    /// Resize the transposition table (UCI `Hash` option).
    pub fn resize_tt(&mut self, size_mb: usize) {
        self.tt.resize(size_mb);
    }

    /// Zero all search state. Called at the start of every root search.
    fn reset(&mut self) {
        self.tt.clear();
        self.history.clear();
        self.killers.clear();
        self.cur_depth = 0;
        self.cur_max_qsearch_depth = MAX_QSEARCH_DEPTH;
        self.total_nodes = 0;
        self.session_nodes = 0;
        self.achieved_depth = 0;
        self.pv_score = 0;
        self.pv.clear();
        self.stopped = false;
    }

    #[inline]
    pub(crate) fn count_node(&mut self) {
        self.total_nodes += 1;
        self.session_nodes += 1;
    }

    /// Cooperative abort predicate, polled at node entry.
    ///
    /// Suppressed for the first iteration so a legal move is always
    /// produced. The clock is consulted only every 1024 nodes.
    pub(crate) fn abort(&mut self) -> bool {
        if self.cur_depth <= 1 {
            return false;
        }
        if self.stopped {
            return true;
        }
        if self.total_nodes >= self.max_nodes {
            self.stopped = true;
            return true;
        }
        if self.total_nodes & 1023 == 0
            && self.start.elapsed().as_millis() as u64 >= self.time_budget_ms
        {
            self.stopped = true;
            return true;
        }
        false
    }

    /// Static eval nudged by the pawn-correction history.
    pub(crate) fn static_eval(&self, board: &Board) -> Score {
        clamp_score(eval::evaluate(board) as i32 + self.history.pawn_correction(board))
    }

    /// Run one deeper iteration and return the root result.
    fn search_deeper(&mut self, root: &Board) -> (Score, Vec<Move>) {
        self.cur_depth += 1;
        self.cur_max_qsearch_depth = self.cur_depth + MAX_QSEARCH_DEPTH;
        self.total_nodes = 0;
        self.killers.expand(self.cur_depth);
        self.history.shrink();

        // Replay the previous PV as exact entries so its moves sort first
        // in this iteration. Each node is seeded at the depth it was
        // actually searched to last iteration, one short of what the new
        // iteration will request, so the seeds order moves without
        // answering the deeper searches themselves.
        let seeds = self.pv.clone();
        let mut position = *root;
        for (i, m) in seeds.iter().enumerate() {
            let searched_depth = self.cur_depth - 1 - i as i32;
            self.tt
                .store_exact(&position, searched_depth, self.pv_score, Some(*m));
            position = position.make_move_new(*m);
        }

        let depth = self.cur_depth;
        pvs::search(self, root, 0, depth, Window::INFINITE)
    }

    /// Full search: iterate deeper until the limits call a halt, keeping
    /// the PV of the last fully-completed iteration.
    pub fn run<F>(&mut self, root: &Board, limits: &SearchLimits, mut on_iter: F) -> SearchResult
    where
        F: FnMut(&SearchStats, Score, &[Move]),
    {
        self.reset();
        self.max_nodes = limits.nodes.unwrap_or(u64::MAX);
        self.time_budget_ms = TimeManager::from_limits(limits, root.side_to_move()).budget_ms();
        self.start = Instant::now();

        let max_depth = limits.depth.unwrap_or(MAX_DEPTH).clamp(1, MAX_DEPTH);
        let mut completed_depth = 0;

        while self.cur_depth < max_depth && !self.stopped {
            let (score, pv) = self.search_deeper(root);

            if self.cur_depth > 1 && self.abort() {
                // Iteration was cut short; keep the previous PV
                break;
            }

            self.pv_score = score;
            self.pv = pv;
            self.extend_pv_from_tt(root);
            completed_depth = self.cur_depth;

            let stats = self.stats(completed_depth);
            debug!(
                depth = stats.depth,
                score = self.pv_score as i32,
                nodes = stats.nodes,
                "iteration complete"
            );
            on_iter(&stats, self.pv_score, &self.pv);

            if self.pv.is_empty() {
                // Terminal root: mate or stalemate already on the board
                break;
            }
        }

        let best_move = self
            .pv
            .first()
            .copied()
            .or_else(|| legal_moves(root, false).first().copied());

        SearchResult {
            best_move,
            score: self.pv_score,
            pv: self.pv.clone(),
            stats: self.stats(completed_depth),
        }
    }

    /// Fill the tail of the PV from transposition-table best moves.
    ///
    /// An exact table hit ends a line early with an empty sub-PV; the
    /// moves it stood in for are still recorded in the table.
    fn extend_pv_from_tt(&mut self, root: &Board) {
        if self.pv.is_empty() {
            return;
        }
        let mut position = *root;
        for m in &self.pv {
            position = position.make_move_new(*m);
        }
        while (self.pv.len() as i32) < self.cur_depth {
            let Some(m) = self.tt.get_best_move(&position) else {
                break;
            };
            if !position.legal(m) {
                break;
            }
            self.pv.push(m);
            position = position.make_move_new(m);
        }
    }

    fn stats(&self, depth: i32) -> SearchStats {
        SearchStats {
            depth,
            seldepth: self.achieved_depth,
            nodes: self.session_nodes,
            time_ms: self.start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{is_mate_score, Square, MATE_BASE};
    use std::str::FromStr;

    fn fixed_depth(board: &Board, depth: i32) -> SearchResult {
        let mut searcher = Searcher::new();
        // A fixed-depth search with an effectively unlimited clock keeps
        // the result independent of machine speed
        let limits = SearchLimits {
            depth: Some(depth),
            movetime: Some(3_600_000),
            ..Default::default()
        };
        searcher.run(board, &limits, |_, _, _| {})
    }

    fn uci(m: Move) -> String {
        m.to_string()
    }

    #[test]
    fn mate_in_one_is_found() {
        let board = Board::from_str("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").expect("valid fen");
        let result = fixed_depth(&board, 3);
        assert_eq!(uci(result.best_move.expect("has a move")), "a1a8");
        assert!(is_mate_score(result.score));
        assert_eq!(result.score, crate::types::MATE_SCORE - 1);
    }

    #[test]
    fn quiescence_refuses_to_hang_the_queen() {
        // Qxf7+ only trades the queen for a pawn; quiescence must see the
        // recapture behind the depth-1 horizon
        let board = Board::from_str("4k3/5p2/8/7Q/8/8/8/4K3 w - - 0 1").expect("valid fen");
        let result = fixed_depth(&board, 1);
        assert_ne!(uci(result.best_move.expect("has a move")), "h5f7");
        assert!(result.score > 0);
    }

    #[test]
    fn search_avoids_the_fools_mate_blunder() {
        // After 1.f3 e5, pushing g4 walks into Qh4 mate
        let board =
            Board::from_str("rnbqkbnr/pppp1ppp/8/4p3/8/5P2/PPPPP1PP/RNBQKBNR w KQkq e6 0 2")
                .expect("valid fen");
        let result = fixed_depth(&board, 3);
        assert_ne!(uci(result.best_move.expect("has a move")), "g2g4");
        assert!(result.score > -900);
    }

    #[test]
    fn startpos_depth_four_plays_a_main_line_opening() {
        let board = Board::default();
        let result = fixed_depth(&board, 4);
        let played = uci(result.best_move.expect("has a move"));
        let reasonable = ["e2e4", "d2d4", "g1f3", "c2c4", "b1c3", "e2e3"];
        assert!(reasonable.contains(&played.as_str()), "played {played}");
        assert_eq!(result.pv.len(), 4);
        assert!(result.score.abs() <= 100, "score {}", result.score);
    }

    #[test]
    fn pv_is_a_legal_line_from_the_root() {
        let board = Board::default();
        let result = fixed_depth(&board, 4);
        let mut position = board;
        for m in &result.pv {
            assert!(position.legal(*m), "illegal pv move {m}");
            position = position.make_move_new(*m);
        }
    }

    #[test]
    fn search_is_deterministic() {
        let board =
            Board::from_str("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 3 3")
                .expect("valid fen");
        let a = fixed_depth(&board, 4);
        let b = fixed_depth(&board, 4);
        assert_eq!(a.score, b.score);
        assert_eq!(a.pv, b.pv);
    }

    #[test]
    fn null_move_does_not_inflate_a_dead_endgame() {
        // White to move has no moves at all: stalemate, not an advantage
        let board = Board::from_str("8/8/8/8/8/6k1/6p1/6K1 w - - 0 1").expect("valid fen");
        let result = fixed_depth(&board, 4);
        assert_eq!(result.score, 0);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn stalemated_side_scores_zero() {
        let board = Board::from_str("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").expect("valid fen");
        let result = fixed_depth(&board, 1);
        assert_eq!(result.score, 0);
        assert!(result.pv.is_empty());
    }

    #[test]
    fn checkmated_root_reports_the_mate() {
        // Fool's mate: white is already checkmated
        let board =
            Board::from_str("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .expect("valid fen");
        let result = fixed_depth(&board, 2);
        assert!(result.score < -MATE_BASE);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn repeated_positions_near_the_root_are_draws() {
        let board = Board::default();
        let mut searcher = Searcher::new();
        searcher.cur_depth = 2;
        searcher.cur_max_qsearch_depth = 2 + MAX_QSEARCH_DEPTH;
        searcher.draw.insert(board.get_hash());
        searcher.draw.insert(board.get_hash());

        for ply in [1, 2] {
            let (score, pv) = pvs::search(&mut searcher, &board, ply, 2, Window::INFINITE);
            assert_eq!(score, 0);
            assert!(pv.is_empty());
        }

        // Away from the root the table is not consulted
        let (score, _) = pvs::search(&mut searcher, &board, 3, 1, Window::INFINITE);
        assert_ne!(score, 0);
    }

    #[test]
    fn node_cap_still_returns_a_legal_move() {
        let board = Board::default();
        let mut searcher = Searcher::new();
        let limits = SearchLimits {
            nodes: Some(50),
            depth: Some(8),
            ..Default::default()
        };
        let result = searcher.run(&board, &limits, |_, _, _| {});
        let m = result.best_move.expect("depth 1 always completes");
        assert!(board.legal(m));
    }

    #[test]
    fn deeper_search_reports_each_iteration() {
        let board = Board::default();
        let mut searcher = Searcher::new();
        let mut depths = Vec::new();
        searcher.run(&board, &SearchLimits::depth(3), |stats, _, pv| {
            depths.push(stats.depth);
            assert!(!pv.is_empty());
        });
        assert_eq!(depths, vec![1, 2, 3]);
    }

    #[test]
    fn pv_replay_seeds_the_root_tt_entry() {
        let board = Board::default();
        let mut searcher = Searcher::new();
        searcher.run(&board, &SearchLimits::depth(3), |_, _, _| {});
        let seeded = searcher.tt.get_best_move(&board).expect("root entry seeded");
        assert!(board.legal(seeded));
    }

    #[test]
    fn killer_registration_keeps_moves_quiet_and_deduped() {
        let board = Board::default();
        let mut searcher = Searcher::new();
        searcher.run(&board, &SearchLimits::depth(4), |_, _, _| {});
        for ply in 0..8 {
            let [first, second] = searcher.killers.get(ply);
            if let (Some(a), Some(b)) = (first, second) {
                assert_ne!(a, b, "duplicate killers at ply {ply}");
            }
        }
    }

    #[test]
    fn promotion_is_preferred_when_winning() {
        let board = Board::from_str("8/P6k/8/8/8/8/8/K7 w - - 0 1").expect("valid fen");
        let result = fixed_depth(&board, 3);
        assert_eq!(uci(result.best_move.expect("has a move")), "a7a8q");
    }

    #[test]
    fn killer_slots_never_hold_captures() {
        let board =
            Board::from_str("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 3 3")
                .expect("valid fen");
        let mut searcher = Searcher::new();
        searcher.run(&board, &SearchLimits::depth(4), |_, _, _| {});
        // Killers are only registered for quiet cutoff moves, so any slot
        // content must be promotion-free
        for ply in 0..8 {
            for m in searcher.killers.get(ply).into_iter().flatten() {
                assert!(m.get_promotion().is_none());
            }
        }
    }

    #[test]
    fn bare_kings_stay_near_balance() {
        let board = Board::from_str("7k/8/8/8/8/8/8/K7 w - - 0 1").expect("valid fen");
        let result = fixed_depth(&board, 2);
        let m = result.best_move.expect("king has moves");
        assert_eq!(m.get_source(), Square::A1);
        assert!(result.score.abs() <= 50);
    }
}
