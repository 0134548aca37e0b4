//! Static evaluation.
//!
//! Returns a white-relative score built from tapered piece-square tables
//! plus structural terms: pawn structure, minor-piece adjustments, rook
//! activity, king shelter and a side-to-move bonus. The function is pure;
//! the search layers its pawn-structure correction on top of this.

mod psqt;

use crate::types::{clamp_score, sign, Score};
use chess::{
    get_adjacent_files, get_file, get_king_moves, get_pawn_attacks, BitBoard, Board, Color, File,
    Piece, ALL_FILES, ALL_PIECES, EMPTY,
};

const DOUBLED_PAWN_PENALTY: i32 = -6;
const ISOLATED_PAWN_PENALTY: i32 = -21;
const ISOLATED_D_FILE_PENALTY: i32 = -4;
const CONNECTED_ADVANCED_BONUS: i32 = 9;
const BLOCKED_PAWN_PENALTY: i32 = -4;
const BISHOP_PAIR_BONUS: i32 = 35;
const ROOK_OPEN_FILE_BONUS: i32 = 18;
const ROOK_SEMI_OPEN_BONUS: i32 = 7;
const KING_SHELTER_BONUS: i32 = 2;
const SIDE_TO_MOVE_BONUS: i32 = 5;

/// Evaluate a position. Positive favors White regardless of the mover.
pub fn evaluate(board: &Board) -> Score {
    let n = board.combined().popcnt() as i32;

    let mut total = side_terms(board, Color::White, n) - side_terms(board, Color::Black, n);
    total += SIDE_TO_MOVE_BONUS * sign(board.side_to_move());

    clamp_score(total)
}

/// Interpolate between mid-game and end-game values by piece count.
/// Collapses to `mg` with all 32 pieces on the board and to `eg` with none.
#[inline]
pub(crate) fn taper(mg: i32, eg: i32, n: i32) -> i32 {
    (mg * n + eg * (32 - n)) / 32
}

fn side_terms(board: &Board, color: Color, n: i32) -> i32 {
    let own = *board.color_combined(color);
    let mut v = 0;

    for piece in ALL_PIECES {
        let mg = psqt::mg_table(piece);
        let eg = psqt::eg_table(piece);
        for sq in board.pieces(piece) & own {
            let idx = sq.to_index();
            let idx = match color {
                Color::White => 63 - idx,
                Color::Black => (idx >> 3) * 8 + (7 - (idx & 7)),
            };
            v += taper(
                psqt::MG_MATERIAL[piece.to_index()] + mg[idx],
                psqt::EG_MATERIAL[piece.to_index()] + eg[idx],
                n,
            );
        }
    }

    v += pawn_terms(board, color);

    // Knights lose value as the board empties
    let knights = board.pieces(Piece::Knight) & own;
    v -= knights.popcnt() as i32 * (n / 2);

    let bishops = board.pieces(Piece::Bishop) & own;
    if bishops.popcnt() >= 2 {
        v += BISHOP_PAIR_BONUS;
    }

    let all_pawns = *board.pieces(Piece::Pawn);
    let own_pawns = all_pawns & own;
    for sq in board.pieces(Piece::Rook) & own {
        v += (32 - n) / 2;
        let file = get_file(sq.get_file());
        if all_pawns & file == EMPTY {
            v += ROOK_OPEN_FILE_BONUS;
        } else if own_pawns & file == EMPTY {
            v += ROOK_SEMI_OPEN_BONUS;
        }
    }

    let king_zone = get_king_moves(board.king_square(color));
    v += KING_SHELTER_BONUS * (king_zone & own).popcnt() as i32;

    v
}

fn pawn_terms(board: &Board, color: Color) -> i32 {
    let own = *board.color_combined(color);
    let own_pawns = *board.pieces(Piece::Pawn) & own;
    let mut v = 0;

    for file in ALL_FILES {
        let file_bb = get_file(file);
        let on_file = (own_pawns & file_bb).popcnt() as i32;
        if on_file == 0 {
            continue;
        }
        v += (on_file - 1) * DOUBLED_PAWN_PENALTY;
        let with_neighbors = (own_pawns & (file_bb | get_adjacent_files(file))).popcnt() as i32;
        if on_file == with_neighbors {
            v += ISOLATED_PAWN_PENALTY;
            if file == File::D {
                v += ISOLATED_D_FILE_PENALTY;
            }
        }
    }

    for sq in own_pawns {
        let idx = sq.to_index();
        let in_enemy_half = match color {
            Color::White => idx >= 40,
            Color::Black => idx <= 23,
        };
        if in_enemy_half {
            let supported = get_pawn_attacks(sq, color, own_pawns);
            v += CONNECTED_ADVANCED_BONUS * supported.popcnt() as i32;
        }
        if let Some(front) = sq.forward(color) {
            if own & BitBoard::from_square(front) != EMPTY {
                v += BLOCKED_PAWN_PENALTY;
            }
        }
    }

    v
}
