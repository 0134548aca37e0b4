//! UCI command parser.

use super::SearchParams;

/// Parsed UCI command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    /// "uci" - identify and hand over to UCI mode
    Uci,
    /// "isready" - synchronization
    IsReady,
    /// "ucinewgame" - forget the current game
    UciNewGame,
    /// "setoption name X value Y"
    SetOption { name: String, value: Option<String> },
    /// "position startpos/fen ... [moves ...]"
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// "go ..." - start searching
    Go(GoParams),
    /// "stop" - stop searching
    Stop,
    /// "quit" - exit the engine
    Quit,
    /// "perft N" - move generation node count to depth N
    Perft(u32),
    /// "print" - show the current position
    Print,
    /// "ischeck" - whether the side to move is in check
    IsCheck,
    /// "showallmoves" - list the legal moves
    ShowAllMoves,
    /// Anything unrecognized
    Unknown(String),
}

/// `go` parameters, kept as raw strings' worth of numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<i32>,
    pub movetime: Option<u64>,
    pub nodes: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u32>,
    pub infinite: bool,
}

impl From<GoParams> for SearchParams {
    fn from(p: GoParams) -> Self {
        SearchParams {
            depth: p.depth,
            movetime: p.movetime,
            nodes: p.nodes,
            wtime: p.wtime,
            btime: p.btime,
            winc: p.winc,
            binc: p.binc,
            movestogo: p.movestogo,
            infinite: p.infinite,
        }
    }
}

/// Parse one input line into a command.
pub fn parse_command(input: &str) -> UciCommand {
    let input = input.trim();
    let mut parts = input.split_whitespace();

    match parts.next() {
        Some("uci") => UciCommand::Uci,
        Some("isready") => UciCommand::IsReady,
        Some("ucinewgame") => UciCommand::UciNewGame,
        Some("setoption") => parse_setoption(&mut parts),
        Some("position") => parse_position(&mut parts),
        Some("go") => parse_go(&mut parts),
        Some("stop") => UciCommand::Stop,
        Some("quit") => UciCommand::Quit,
        Some("perft") => match parts.next().and_then(|d| d.parse().ok()) {
            Some(depth) => UciCommand::Perft(depth),
            None => UciCommand::Unknown(input.to_string()),
        },
        Some("print") | Some("d") => UciCommand::Print,
        Some("ischeck") => UciCommand::IsCheck,
        Some("showallmoves") => UciCommand::ShowAllMoves,
        _ => UciCommand::Unknown(input.to_string()),
    }
}

fn parse_setoption<'a>(parts: &mut impl Iterator<Item = &'a str>) -> UciCommand {
    let mut name = String::new();
    let mut value: Option<String> = None;
    let mut parsing_value = false;

    for token in parts {
        match token {
            "name" => parsing_value = false,
            "value" => parsing_value = true,
            _ => {
                let target = if parsing_value {
                    value.get_or_insert_with(String::new)
                } else {
                    &mut name
                };
                if !target.is_empty() {
                    target.push(' ');
                }
                target.push_str(token);
            }
        }
    }

    UciCommand::SetOption { name, value }
}

fn parse_position<'a>(parts: &mut impl Iterator<Item = &'a str>) -> UciCommand {
    let mut fen_parts: Vec<&str> = Vec::new();
    let mut moves = Vec::new();
    let mut parsing_fen = false;
    let mut parsing_moves = false;

    for token in parts {
        match token {
            "startpos" => parsing_fen = false,
            "fen" => parsing_fen = true,
            "moves" => {
                parsing_fen = false;
                parsing_moves = true;
            }
            _ if parsing_moves => moves.push(token.to_string()),
            _ if parsing_fen => fen_parts.push(token),
            _ => {}
        }
    }

    let fen = if fen_parts.is_empty() {
        None
    } else {
        Some(fen_parts.join(" "))
    };

    UciCommand::Position { fen, moves }
}

fn parse_go<'a>(parts: &mut impl Iterator<Item = &'a str>) -> UciCommand {
    let mut params = GoParams::default();

    let tokens: Vec<&str> = parts.collect();
    let mut i = 0;
    while i < tokens.len() {
        let value = tokens.get(i + 1).copied();
        match tokens[i] {
            "infinite" => params.infinite = true,
            "depth" => {
                params.depth = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "movetime" => {
                params.movetime = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "nodes" => {
                params.nodes = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "wtime" => {
                params.wtime = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "btime" => {
                params.btime = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "winc" => {
                params.winc = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "binc" => {
                params.binc = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "movestogo" => {
                params.movestogo = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    UciCommand::Go(params)
}
