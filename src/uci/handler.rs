//! UCI command handler and main loop.

use super::parser::{parse_command, UciCommand};
use super::{format_move, format_score, parse_move, SearchParams, UciError, ENGINE_AUTHOR, ENGINE_NAME};
use crate::search::{DrawTable, SearchLimits, Searcher};
use crate::types::{in_check, legal_moves, Board, Hash, MoveGen};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::time::Instant;
use tracing::{info, warn};

/// UCI protocol handler
pub struct UciHandler {
    /// Current root position
    board: Board,
    /// Hash of every position the game has visited, root included
    game_hashes: Vec<Hash>,
    /// Search engine
    searcher: Searcher,
    /// Safety buffer subtracted from each time budget (ms)
    move_overhead: u64,
    /// Should the engine quit
    quit: bool,
}

impl UciHandler {
    pub fn new() -> Self {
        let board = Board::default();
        Self {
            game_hashes: vec![board.get_hash()],
            board,
            searcher: Searcher::new(),
            move_overhead: 10,
            quit: false,
        }
    }

    /// Run the command loop until `quit` or end of input.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(input) => {
                    self.handle_input(&input);
                    if self.quit {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    }

    /// Handle a single input line.
    pub fn handle_input(&mut self, input: &str) {
        match parse_command(input) {
            UciCommand::Uci => self.cmd_uci(),
            UciCommand::IsReady => self.send("readyok"),
            UciCommand::UciNewGame => self.cmd_ucinewgame(),
            UciCommand::SetOption { name, value } => self.cmd_setoption(&name, value.as_deref()),
            UciCommand::Position { fen, moves } => {
                if let Err(err) = self.cmd_position(fen.as_deref(), &moves) {
                    warn!("{err}");
                }
            }
            UciCommand::Go(params) => self.cmd_go(params.into()),
            UciCommand::Stop => {
                // Single-threaded: a search always finishes before the
                // next command is read, so there is nothing to stop
            }
            UciCommand::Quit => self.quit = true,
            UciCommand::Perft(depth) => self.cmd_perft(depth),
            UciCommand::Print => self.cmd_print(),
            UciCommand::IsCheck => {
                let answer = if in_check(&self.board) { "yes" } else { "no" };
                self.send(answer);
            }
            UciCommand::ShowAllMoves => self.cmd_showallmoves(),
            UciCommand::Unknown(line) => {
                if !line.is_empty() {
                    warn!(%line, "unrecognized command");
                }
            }
        }
    }

    /// Send one protocol line to the GUI.
    fn send(&self, msg: &str) {
        println!("{msg}");
        io::stdout().flush().ok();
    }

    fn cmd_uci(&self) {
        self.send(&format!("id name {ENGINE_NAME}"));
        self.send(&format!("id author {ENGINE_AUTHOR}"));
        self.send("option name Hash type spin default 16 min 1 max 4096");
        self.send("option name MoveOverhead type spin default 10 min 0 max 5000");
        self.send("uciok");
    }

    fn cmd_ucinewgame(&mut self) {
        self.board = Board::default();
        self.game_hashes = vec![self.board.get_hash()];
        self.searcher = Searcher::new();
    }

    fn cmd_setoption(&mut self, name: &str, value: Option<&str>) {
        match name.to_lowercase().as_str() {
            "hash" => {
                if let Some(mb) = value.and_then(|v| v.parse::<usize>().ok()) {
                    self.searcher.resize_tt(mb.clamp(1, 4096));
                    info!(mb, "transposition table resized");
                }
            }
            "moveoverhead" => {
                if let Some(ms) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.move_overhead = ms.min(5000);
                }
            }
            _ => warn!(%name, "unknown option"),
        }
    }

    fn cmd_position(&mut self, fen: Option<&str>, moves: &[String]) -> Result<(), UciError> {
        let base = match fen {
            Some(f) => Board::from_str(f).map_err(|_| UciError::BadFen(f.to_string()))?,
            None => Board::default(),
        };

        // Apply the whole move list before committing anything, so a bad
        // move leaves the previous position in place
        let mut board = base;
        let mut hashes = vec![board.get_hash()];
        for move_str in moves {
            let m = parse_move(&board, move_str)
                .ok_or_else(|| UciError::IllegalMove(move_str.clone()))?;
            board = board.make_move_new(m);
            hashes.push(board.get_hash());
        }

        self.board = board;
        self.game_hashes = hashes;
        Ok(())
    }

    /// Repetition table over the game history: positions that occurred
    /// twice already are draws if visited again.
    fn draw_table(&self) -> DrawTable {
        let mut table = DrawTable::new();
        for &hash in &self.game_hashes {
            table.insert(hash);
        }
        table
    }

    fn cmd_go(&mut self, params: SearchParams) {
        let limits = SearchLimits {
            depth: params.depth,
            movetime: params.movetime,
            nodes: params.nodes,
            wtime: params.wtime,
            btime: params.btime,
            winc: params.winc,
            binc: params.binc,
            movestogo: params.movestogo,
            infinite: params.infinite,
            move_overhead: self.move_overhead,
        };

        let repetitions = self.draw_table();
        self.searcher.set_draw_table(repetitions);

        let result = self.searcher.run(&self.board, &limits, |stats, score, pv| {
            let pv_str: String = pv.iter().map(|m| format_move(*m)).collect::<Vec<_>>().join(" ");
            println!(
                "info depth {} seldepth {} score {} nodes {} nps {} time {} pv {}",
                stats.depth,
                stats.seldepth,
                format_score(score),
                stats.nodes,
                stats.nps(),
                stats.time_ms,
                pv_str
            );
            io::stdout().flush().ok();
        });

        match result.best_move {
            Some(m) => self.send(&format!("bestmove {}", format_move(m))),
            None => self.send("bestmove 0000"),
        }
    }

    fn cmd_perft(&self, depth: u32) {
        let start = Instant::now();
        let mut total = 0u64;
        for m in MoveGen::new_legal(&self.board) {
            let nodes = if depth <= 1 {
                1
            } else {
                perft(&self.board.make_move_new(m), depth - 1)
            };
            total += nodes;
            self.send(&format!("{}: {}", format_move(m), nodes));
        }
        let elapsed = start.elapsed().as_millis().max(1) as u64;
        self.send(&format!(
            "perft {depth}: {total} nodes in {elapsed} ms ({} knps)",
            total / elapsed
        ));
    }

    fn cmd_print(&self) {
        self.send(&format!("fen: {}", self.board));
        self.send(&format!("side to move: {:?}", self.board.side_to_move()));
    }

    fn cmd_showallmoves(&self) {
        let moves: Vec<String> = legal_moves(&self.board, false)
            .into_iter()
            .map(format_move)
            .collect();
        self.send(&moves.join(" "));
    }
}

impl Default for UciHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Move-generation node count to the given depth.
fn perft(board: &Board, depth: u32) -> u64 {
    let gen = MoveGen::new_legal(board);
    if depth <= 1 {
        return gen.len() as u64;
    }
    gen.map(|m| perft(&board.make_move_new(m), depth - 1)).sum()
}
