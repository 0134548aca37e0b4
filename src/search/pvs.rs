//! Principal-variation alpha-beta search.
//!
//! The driver behind the iterative-deepening controller: probes the
//! transposition table through [`probe_tt`], orders moves, applies the
//! pruning and reduction heuristics, and delegates to quiescence at the
//! horizon. All score handling is color-agnostic through the [`Window`].

use super::qsearch::qsearch;
use super::tt::TT_MIN_PLY;
use super::window::Window;
use super::{ordering, Searcher};
use crate::eval;
use crate::types::{
    clamp_score, in_check, is_mate_score, is_quiet, mate_score, sign, Board, Move, Score,
};

const RAZOR_MIN_PLY: i32 = 3;
const RAZOR_DEPTH: i32 = 4;
const RAZOR_MARGIN: i32 = 165;

const NMP_MIN_DEPTH: i32 = 0;
const NMP_MIN_PLY: i32 = 2;

const FP_MIN_PLY: i32 = 2;
const FP_MAX_DEPTH: i32 = 4;

const RFP_MIN_PLY: i32 = 2;
const RFP_MAX_DEPTH: i32 = 4;

const LMR_MIN_PLY: i32 = 2;
const LMR_MIN_DEPTH: i32 = 3;
const LMR_MIN_EXP_NODES: i32 = 4;
const LMR_HISTORY_CUTOFF: i32 = -1320;

/// Futility margin: a minor piece at depth 1, growing linearly.
#[inline]
fn fp_margin(depth: i32) -> i32 {
    200 + 100 * depth
}

#[inline]
fn rfp_margin(depth: i32) -> i32 {
    120 * depth
}

/// Search `board` to `depth`, `ply` half-moves from the root.
///
/// Returns the proven bound for the mover together with the principal
/// variation starting at this node. The PV is empty when no move was
/// expanded or the node resolved through a bound.
pub fn search(
    searcher: &mut Searcher,
    board: &Board,
    ply: i32,
    depth: i32,
    mut window: Window,
) -> (Score, Vec<Move>) {
    if searcher.abort() {
        return (0, Vec::new());
    }
    if depth <= 0 {
        return (qsearch(searcher, board, ply, window), Vec::new());
    }
    if (ply == 1 || ply == 2) && searcher.draw.contains(board.get_hash()) {
        return (0, Vec::new());
    }
    searcher.count_node();

    let color = board.side_to_move();
    let checked = in_check(board);
    let mut depth = depth;
    let mut ply = ply;

    // Razoring: when even an optimistic quiescence probe stays under the
    // window, continue two plies shallower instead of cutting off.
    if !checked && ply >= RAZOR_MIN_PLY && depth == RAZOR_DEPTH {
        let probe = qsearch(searcher, board, ply, window.get_lower_bound(color));
        let optimistic = clamp_score(probe as i32 + RAZOR_MARGIN * depth * sign(color));
        if window.fails_low(optimistic, color) {
            depth -= 2;
            ply += 2;
        }
    }

    // Null move: hand the opponent a free move; if the reduced search
    // still fails high, this node will not be reached.
    if depth >= NMP_MIN_DEPTH
        && ply >= NMP_MIN_PLY
        && !checked
        && !is_mate_score(searcher.pv_score)
        && window.can_fail_high(color)
    {
        if let Some(skipped) = board.null_move() {
            let r = if ply <= 4 { 2 } else { 3 };
            let (score, _) = search(
                searcher,
                &skipped,
                ply + 1,
                depth - r - 1,
                window.get_upper_bound(color),
            );
            if window.fails_high(score, color) {
                return (score, Vec::new());
            }
        }
    }

    let moves = ordering::order_moves(
        board,
        &searcher.tt,
        &searcher.killers,
        &searcher.history,
        ply,
    );

    let mut pv: Vec<Move> = Vec::new();
    let mut expanded = 0i32;

    for m in moves {
        expanded += 1;
        let child = board.make_move_new(m);
        let quiet = is_quiet(board, m);
        if quiet {
            searcher.history.add_visited(board, m);
        }

        // First moves, evasions and checking moves are never pruned
        let interesting = expanded == 1 || checked || in_check(&child);

        if !interesting {
            let s_eval = searcher.static_eval(&child);

            if ply >= FP_MIN_PLY && depth <= FP_MAX_DEPTH {
                let optimistic = clamp_score(s_eval as i32 + fp_margin(depth) * sign(color));
                if window.fails_low(optimistic, color) {
                    continue;
                }
            }

            if ply >= RFP_MIN_PLY && depth <= RFP_MAX_DEPTH {
                let pessimistic = clamp_score(s_eval as i32 - rfp_margin(depth) * sign(color));
                if window.fails_high(pessimistic, color) {
                    continue;
                }
            }

            if ply >= LMR_MIN_PLY && depth >= LMR_MIN_DEPTH && expanded >= LMR_MIN_EXP_NODES {
                let r = if searcher.history.get_rep(board, m) < LMR_HISTORY_CUTOFF {
                    4
                } else {
                    3
                };
                let (probe, _) = search(
                    searcher,
                    &child,
                    ply + 1,
                    depth - r,
                    window.get_lower_bound(color),
                );
                if window.fails_low(probe, color) {
                    continue;
                }
            }
        }

        let (score, child_pv) = probe_tt(searcher, &child, ply + 1, depth - 1, window);

        if window.fails_low(score, color) {
            if quiet {
                searcher.history.decrease_q_rep(board, m, depth);
            }
            continue;
        }

        pv.clear();
        pv.push(m);
        pv.extend(child_pv);

        if window.try_cutoff(score, color) {
            if quiet {
                searcher.history.increase_q_rep(board, m, depth);
                searcher.killers.add(ply, m);
            }
            return (window.bound_score(color), pv);
        }
    }

    if expanded == 0 {
        if checked {
            return (mate_score(color, ply), Vec::new());
        }
        return (0, Vec::new());
    }

    let final_score = window.bound_score(color);
    if depth > 2 && !checked && !is_mate_score(final_score) && !searcher.abort() {
        let static_eval = eval::evaluate(board);
        searcher
            .history
            .update_pawn_corr(board, final_score, static_eval, depth);
    }

    (final_score, pv)
}

/// Transposition-table gateway for child searches: answer from the table
/// when allowed, otherwise recurse and record the result.
fn probe_tt(
    searcher: &mut Searcher,
    board: &Board,
    ply: i32,
    depth: i32,
    window: Window,
) -> (Score, Vec<Move>) {
    if ply >= TT_MIN_PLY {
        if let Some(score) = searcher.tt.get_score(board, depth, ply, &window) {
            return (score, Vec::new());
        }
    }
    let (score, pv) = search(searcher, board, ply, depth, window);
    if !searcher.abort() {
        searcher
            .tt
            .store(board, depth, ply, &window, score, pv.first().copied());
    }
    (score, pv)
}
