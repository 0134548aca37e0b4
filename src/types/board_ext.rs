//! Helpers over `chess::Board` covering the board contract the search
//! consumes: legal move lists (optionally captures-only), capture and
//! quietness classification, check detection, history indexing, and the
//! per-color pawn-only hash the `chess` crate does not provide.

use chess::{BitBoard, Board, ChessMove, Color, MoveGen, Piece, EMPTY};

/// Whether the side to move is in check.
#[inline]
pub fn in_check(board: &Board) -> bool {
    *board.checkers() != EMPTY
}

/// Generate the legal moves of the position.
///
/// With `only_captures` the generator is masked to enemy-occupied squares
/// plus the en-passant destination, so quiet moves (including quiet
/// promotions) are not produced.
pub fn legal_moves(board: &Board, only_captures: bool) -> Vec<ChessMove> {
    let mut gen = MoveGen::new_legal(board);
    if only_captures {
        let mut mask = *board.color_combined(!board.side_to_move());
        if let Some(ep) = board.en_passant() {
            // en_passant() is the square of the capturable pawn; the
            // capture lands one rank beyond it
            if let Some(dest) = ep.forward(board.side_to_move()) {
                mask = mask | BitBoard::from_square(dest);
            }
        }
        gen.set_iterator_mask(mask);
    }
    gen.collect()
}

/// The piece captured by `m`, if any. En-passant captures have an empty
/// destination square and are resolved to a pawn.
pub fn captured_piece(board: &Board, m: ChessMove) -> Option<Piece> {
    if let Some(victim) = board.piece_on(m.get_dest()) {
        return Some(victim);
    }
    if board.piece_on(m.get_source()) == Some(Piece::Pawn)
        && m.get_source().get_file() != m.get_dest().get_file()
    {
        return Some(Piece::Pawn);
    }
    None
}

/// A quiet move captures nothing and is not a promotion.
#[inline]
pub fn is_quiet(board: &Board, m: ChessMove) -> bool {
    m.get_promotion().is_none() && captured_piece(board, m).is_none()
}

/// Piece-color combo in `0..12` for history indexing: the moving piece's
/// type paired with the color owning the source square.
pub fn piece_color_index(board: &Board, m: ChessMove) -> usize {
    let piece = board.piece_on(m.get_source()).unwrap_or(Piece::Pawn);
    let color = board
        .color_on(m.get_source())
        .unwrap_or_else(|| board.side_to_move());
    piece.to_index() * 2 + color.to_index()
}

const PAWN_KEY_SEED: u64 = 0x7f4a_7c15_9e37_79b9;

const fn xorshift64(state: u64) -> (u64, u64) {
    let mut x = state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    (x, x)
}

/// Zobrist keys for the pawn-only hash, indexed `[color][square]`.
static PAWN_KEYS: [[u64; 64]; 2] = {
    let mut table = [[0u64; 64]; 2];
    let mut state = PAWN_KEY_SEED;
    let mut color = 0;
    while color < 2 {
        let mut sq = 0;
        while sq < 64 {
            let (val, next) = xorshift64(state);
            table[color][sq] = val;
            state = next;
            sq += 1;
        }
        color += 1;
    }
    table
};

/// Zobrist hash over the pawns of one color only. Identical pawn
/// structures hash identically regardless of the rest of the position.
pub fn pawn_hash(board: &Board, color: Color) -> u64 {
    let pawns = board.pieces(Piece::Pawn) & board.color_combined(color);
    let mut hash = 0u64;
    for sq in pawns {
        hash ^= PAWN_KEYS[color.to_index()][sq.to_index()];
    }
    hash
}
