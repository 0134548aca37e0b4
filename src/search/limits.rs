//! Search limits and time management.
//!
//! Translates `go` parameters into a per-move time budget and the node /
//! depth caps the controller enforces.

use crate::types::Color;

/// Budget used when the GUI gives no time information at all:
/// effectively unbounded, the depth cap is the only brake.
const DEFAULT_BUDGET_MS: u64 = u64::MAX;

/// Search limits configuration
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    /// Maximum depth to search
    pub depth: Option<i32>,
    /// Fixed time for this move (ms)
    pub movetime: Option<u64>,
    /// Maximum nodes per iteration
    pub nodes: Option<u64>,
    /// White time remaining (ms)
    pub wtime: Option<u64>,
    /// Black time remaining (ms)
    pub btime: Option<u64>,
    /// White increment (ms)
    pub winc: Option<u64>,
    /// Black increment (ms)
    pub binc: Option<u64>,
    /// Moves until the next time control
    pub movestogo: Option<u32>,
    /// Search until the depth cap regardless of time
    pub infinite: bool,
    /// Safety buffer subtracted from the budget (ms)
    pub move_overhead: u64,
}

impl SearchLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(depth: i32) -> Self {
        Self {
            depth: Some(depth),
            ..Default::default()
        }
    }
}

/// Per-move time budget derived from the limits.
#[derive(Debug, Clone, Copy)]
pub struct TimeManager {
    budget_ms: u64,
}

impl TimeManager {
    pub fn from_limits(limits: &SearchLimits, side: Color) -> Self {
        if limits.infinite {
            return Self { budget_ms: u64::MAX };
        }

        if let Some(movetime) = limits.movetime {
            return Self {
                budget_ms: movetime.saturating_sub(limits.move_overhead).max(1),
            };
        }

        let (time, inc) = match side {
            Color::White => (limits.wtime, limits.winc),
            Color::Black => (limits.btime, limits.binc),
        };

        if let Some(time) = time {
            // The increment is banked into the clock before dividing it
            // over the remaining moves
            let bank = time.saturating_add(inc.unwrap_or(0));
            let movestogo = limits.movestogo.unwrap_or(40).max(1) as u64;
            let share = (bank / (3 * movestogo)).max(1);
            return Self {
                budget_ms: share.saturating_sub(limits.move_overhead).max(1),
            };
        }

        Self {
            budget_ms: DEFAULT_BUDGET_MS,
        }
    }

    #[inline]
    pub fn budget_ms(&self) -> u64 {
        self.budget_ms
    }
}
