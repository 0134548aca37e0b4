//! Quiescence search.
//!
//! Extends the main search with captures only (plus evasions while in
//! check) so leaf evaluations are taken from quiet positions. Bounded by
//! the controller's `cur_max_qsearch_depth`; hopeless captures are delta
//! pruned near that bound.

use super::{ordering, Searcher};
use super::window::Window;
use crate::types::{
    captured_piece, clamp_score, in_check, legal_moves, mate_score, sign, Board, Score,
};

/// Piece values for delta pruning (centipawns)
const DELTA_PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 0];

/// Optimism granted per remaining quiescence ply before a capture may be
/// delta pruned.
const DELTA_MARGIN_PER_PLY: i32 = 81;

/// Stand-in score when in check with no capture to try: the static eval
/// docked a conservative penalty for the unresolved check.
const CHECKED_STAND_PAT_PENALTY: i32 = 100;

pub fn qsearch(searcher: &mut Searcher, board: &Board, ply: i32, mut window: Window) -> Score {
    if searcher.abort() {
        return 0;
    }
    searcher.count_node();
    searcher.achieved_depth = searcher.achieved_depth.max(ply);

    let color = board.side_to_move();
    if ply >= searcher.cur_max_qsearch_depth {
        return searcher.static_eval(board);
    }

    let checked = in_check(board);
    let mut stand_pat = None;
    if !checked {
        let sp = searcher.static_eval(board);
        if window.try_cutoff(sp, color) {
            return window.bound_score(color);
        }
        stand_pat = Some(sp);
    }

    // Evasions get a full move list until the very end of the extension
    let captures_only = !checked || ply >= searcher.cur_max_qsearch_depth - 3;
    let mut moves = legal_moves(board, captures_only);

    if moves.is_empty() {
        if !checked {
            // Nothing noisy left: the position already counts as quiet
            return stand_pat.unwrap_or_else(|| searcher.static_eval(board));
        }
        if !captures_only {
            return mate_score(color, ply);
        }
        // Only captures were generated; the check may still be evadable
        if legal_moves(board, false).is_empty() {
            return mate_score(color, ply);
        }
        let sp = searcher.static_eval(board);
        return clamp_score(sp as i32 - CHECKED_STAND_PAT_PENALTY * sign(color));
    }

    ordering::sort_mvv_lva(board, &mut moves);

    for m in moves {
        if captures_only && ply >= searcher.cur_depth + 4 {
            if let Some(sp) = stand_pat {
                let gain = captured_piece(board, m)
                    .map(|p| DELTA_PIECE_VALUES[p.to_index()])
                    .unwrap_or(0);
                let margin = (searcher.cur_max_qsearch_depth - ply) * DELTA_MARGIN_PER_PLY;
                let optimistic = clamp_score(sp as i32 + (gain + margin) * sign(color));
                if window.fails_low(optimistic, color) {
                    continue;
                }
            }
        }

        let child = board.make_move_new(m);
        let score = qsearch(searcher, &child, ply + 1, window);
        if window.try_cutoff(score, color) {
            break;
        }
    }

    window.bound_score(color)
}
