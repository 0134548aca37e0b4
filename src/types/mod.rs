//! Core types for the engine.
//!
//! Board representation, move generation and legality filtering come from
//! the `chess` crate; this module re-exports those types as the canonical
//! ones and adds the engine-specific score type plus the small set of
//! board helpers the search consumes.

mod board_ext;
mod score;

pub use board_ext::{
    captured_piece, in_check, is_quiet, legal_moves, pawn_hash, piece_color_index,
};
pub use score::{
    clamp_score, is_mate_score, mate_score, score_from_tt, score_to_tt, sign, Score, MATE_BASE,
    MATE_SCORE, MAX_SCORE, MIN_SCORE,
};

// Re-export chess crate types as canonical types
pub use chess::{
    BitBoard, Board, BoardStatus, ChessMove as Move, Color, File, MoveGen, Piece, Rank, Square,
    ALL_SQUARES, EMPTY,
};

/// Zobrist hash type (used for the transposition table and draw tracking)
pub type Hash = u64;

/// Node count type
pub type NodeCount = u64;
