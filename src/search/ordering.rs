//! Move ordering.
//!
//! Buckets, best first: the transposition-table move, captures and
//! promotions by MVV-LVA, killer moves for the ply, then the remaining
//! quiets by history score. Duplicates and stale killers are filtered.

use super::history::{History, Killers};
use super::tt::TranspositionTable;
use crate::types::{captured_piece, is_quiet, legal_moves, Board, Move, Piece};

/// MVV-LVA piece weights. The king never appears as a victim; as an
/// aggressor it sorts behind every other capturer of the same victim.
const MVV_LVA: [i32; 6] = [1, 3, 3, 5, 9, 1000];

#[inline]
fn piece_weight(piece: Piece) -> i32 {
    MVV_LVA[piece.to_index()]
}

/// Capture ordering key: prefer valuable victims, break ties by the
/// cheapest aggressor. Promotions count their promoted piece as victim
/// value so they stay in the noisy bucket.
fn mvv_lva_key(board: &Board, m: Move) -> i32 {
    let victim = captured_piece(board, m).map(piece_weight).unwrap_or(0);
    let promo = m.get_promotion().map(piece_weight).unwrap_or(0);
    let aggressor = board
        .piece_on(m.get_source())
        .map(piece_weight)
        .unwrap_or(0);
    (victim + promo) * 1000 - aggressor
}

/// Sort a noisy move list in place, best capture first.
pub fn sort_mvv_lva(board: &Board, moves: &mut [Move]) {
    moves.sort_by(|a, b| mvv_lva_key(board, *b).cmp(&mvv_lva_key(board, *a)));
}

/// Produce the full ordered move list for a main-search node.
pub fn order_moves(
    board: &Board,
    tt: &TranspositionTable,
    killers: &Killers,
    history: &History,
    ply: i32,
) -> Vec<Move> {
    let all = legal_moves(board, false);
    let mut out = Vec::with_capacity(all.len());

    let tt_move = tt.get_best_move(board).filter(|m| all.contains(m));
    if let Some(m) = tt_move {
        out.push(m);
    }

    let mut noisy: Vec<Move> = all
        .iter()
        .copied()
        .filter(|&m| Some(m) != tt_move && !is_quiet(board, m))
        .collect();
    sort_mvv_lva(board, &mut noisy);
    out.extend_from_slice(&noisy);

    for killer in killers.get(ply).into_iter().flatten() {
        if !out.contains(&killer) && is_quiet(board, killer) && all.contains(&killer) {
            out.push(killer);
        }
    }

    let mut quiets: Vec<Move> = all
        .iter()
        .copied()
        .filter(|m| is_quiet(board, *m) && !out.contains(m))
        .collect();
    quiets.sort_by(|a, b| {
        history
            .get_rep(board, *b)
            .cmp(&history.get_rep(board, *a))
    });
    out.extend_from_slice(&quiets);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Square;
    use std::str::FromStr;

    #[test]
    fn ordering_is_complete_and_duplicate_free() {
        let board =
            Board::from_str("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 3 3")
                .expect("valid fen");
        let tt = TranspositionTable::new(1);
        let killers = Killers::new();
        let history = History::new();
        let ordered = order_moves(&board, &tt, &killers, &history, 0);
        let all = legal_moves(&board, false);
        assert_eq!(ordered.len(), all.len());
        for m in &all {
            assert!(ordered.contains(m));
        }
    }

    #[test]
    fn tt_move_sorts_first() {
        let board = Board::default();
        let mut tt = TranspositionTable::new(1);
        let killers = Killers::new();
        let history = History::new();
        let m = Move::new(Square::B1, Square::C3, None);
        tt.store_exact(&board, 1, 0, Some(m));
        let ordered = order_moves(&board, &tt, &killers, &history, 0);
        assert_eq!(ordered[0], m);
        assert_eq!(ordered.iter().filter(|&&x| x == m).count(), 1);
    }

    #[test]
    fn stale_tt_move_is_dropped() {
        // Entry collision: best move stored for a different position with
        // the same slot would be illegal here; simulate with a move that
        // is not legal in this position
        let board = Board::from_str("4k3/8/8/8/8/8/8/4K3 w - - 0 1").expect("valid fen");
        let mut tt = TranspositionTable::new(1);
        tt.store_exact(&board, 1, 0, Some(Move::new(Square::E2, Square::E4, None)));
        let ordered = order_moves(&board, &tt, &Killers::new(), &History::new(), 0);
        assert_eq!(ordered.len(), legal_moves(&board, false).len());
        assert!(!ordered.contains(&Move::new(Square::E2, Square::E4, None)));
    }

    #[test]
    fn captures_rank_by_victim_then_aggressor() {
        // Both the b-pawn and the knight can take the rook on c5; the
        // knight can also take the pawn on e4
        let board =
            Board::from_str("4k3/8/8/2r5/1P2p3/3N4/8/4K3 w - - 0 1").expect("valid fen");
        let tt = TranspositionTable::new(1);
        let ordered = order_moves(&board, &tt, &Killers::new(), &History::new(), 0);
        let pawn_takes_rook = Move::new(Square::B4, Square::C5, None);
        let knight_takes_rook = Move::new(Square::D3, Square::C5, None);
        let knight_takes_pawn = Move::new(Square::D3, Square::E4, None);
        let pos = |m: Move| ordered.iter().position(|&x| x == m).expect("move present");
        assert!(pos(pawn_takes_rook) < pos(knight_takes_rook));
        assert!(pos(knight_takes_rook) < pos(knight_takes_pawn));
    }

    #[test]
    fn killers_come_after_captures_but_before_quiets() {
        let board =
            Board::from_str("4k3/8/8/2r5/1P6/8/8/4K3 w - - 0 1").expect("valid fen");
        let tt = TranspositionTable::new(1);
        let mut killers = Killers::new();
        let history = History::new();
        let killer = Move::new(Square::E1, Square::D1, None);
        killers.add(0, killer);
        let ordered = order_moves(&board, &tt, &killers, &history, 0);
        // The only capture is bxc5
        assert_eq!(ordered[0], Move::new(Square::B4, Square::C5, None));
        assert_eq!(ordered[1], killer);
    }

    #[test]
    fn quiets_follow_history_scores() {
        let board = Board::default();
        let tt = TranspositionTable::new(1);
        let killers = Killers::new();
        let mut history = History::new();
        let hero = Move::new(Square::G1, Square::F3, None);
        let zero = Move::new(Square::B1, Square::C3, None);
        history.increase_q_rep(&board, hero, 6);
        let ordered = order_moves(&board, &tt, &killers, &history, 0);
        let pos = |m: Move| ordered.iter().position(|&x| x == m).expect("move present");
        assert!(pos(hero) < pos(zero));
    }
}
