use std::{
    fmt::Display,
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::Duration,
};

use crate::{
    chess::{board::Board, chessmove::Move},
    errors::{FenParseError, MoveParseError},
    evaluation::{evaluate, is_mate_score, MATE_SCORE},
    perft, search,
    searchinfo::SearchInfo,
    timemgmt::SearchLimit,
    transpositiontable::{TranspositionTable, DEFAULT_HASH_MB},
    NAME, VERSION,
};

#[derive(Debug)]
enum UciError {
    ParseGo(String),
    ParseOption(String),
    ParseFen(FenParseError),
    ParseMove(MoveParseError),
    InvalidFormat(String),
    UnknownCommand(String),
}

impl From<MoveParseError> for UciError {
    fn from(err: MoveParseError) -> Self {
        Self::ParseMove(err)
    }
}

impl From<FenParseError> for UciError {
    fn from(err: FenParseError) -> Self {
        Self::ParseFen(err)
    }
}

impl Display for UciError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseGo(s) => write!(f, "ParseGo: {s}"),
            Self::ParseOption(s) => write!(f, "ParseOption: {s}"),
            Self::ParseFen(e) => write!(f, "ParseFen: {e}"),
            Self::ParseMove(e) => write!(f, "ParseMove: {e}"),
            Self::InvalidFormat(s) => write!(f, "InvalidFormat: {s}"),
            Self::UnknownCommand(s) => write!(f, "UnknownCommand: {s}"),
        }
    }
}

/// Formats a score for `info` output: centipawns, or moves-to-mate for
/// mate scores.
pub fn format_score(score: i32) -> String {
    if is_mate_score(score) {
        let plies_to_mate = MATE_SCORE - score.abs();
        let moves_to_mate = (plies_to_mate + 1) / 2;
        if score > 0 {
            format!("mate {moves_to_mate}")
        } else {
            format!("mate -{moves_to_mate}")
        }
    } else {
        format!("cp {score}")
    }
}

// position startpos
// position fen <fen> moves e2e4 e7e5 ...
fn parse_position(text: &str, pos: &mut Board) -> Result<(), UciError> {
    let mut parts = text.split_ascii_whitespace();
    parts.next(); // "position" itself
    let determiner = parts.next().ok_or_else(|| {
        UciError::InvalidFormat("expected \"startpos\" or \"fen\" after \"position\"".into())
    })?;

    let mut board = Board::default();
    if determiner == "startpos" {
        let moves = parts.next();
        if !matches!(moves, Some("moves") | None) {
            return Err(UciError::InvalidFormat(format!(
                "expected \"moves\" or nothing after \"startpos\", got \"{}\"",
                moves.unwrap()
            )));
        }
    } else {
        if determiner != "fen" {
            return Err(UciError::InvalidFormat(format!(
                "unknown term after \"position\": {determiner}"
            )));
        }
        let mut fen = String::new();
        for part in &mut parts {
            if part == "moves" {
                break;
            }
            fen.push_str(part);
            fen.push(' ');
        }
        board.set_from_fen(&fen)?;
    }

    for move_str in parts {
        let m = board.parse_uci(move_str)?;
        board.make_move(m);
        // the undo stack only needs to cover the search, not the game.
        board.zero_height();
    }

    // committed only after the whole command parsed cleanly.
    *pos = board;
    Ok(())
}

fn part_parse<T>(target: &str, next_part: Option<&str>) -> Result<T, UciError>
where
    T: std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    next_part
        .ok_or_else(|| UciError::InvalidFormat(format!("nothing after \"{target}\"")))?
        .parse()
        .map_err(|e| UciError::InvalidFormat(format!("value for {target} is not a number: {e}")))
}

fn parse_go(text: &str, pos: &Board) -> Result<SearchLimit, UciError> {
    use crate::chess::piece::Colour;

    let mut depth: Option<i32> = None;
    let mut nodes: Option<u64> = None;
    let mut movetime: Option<u64> = None;
    let mut time: Option<u64> = None;
    let mut inc: Option<u64> = None;
    let mut moves_to_go: Option<u64> = None;
    let mut infinite = false;

    let mut parts = text.split_ascii_whitespace();
    parts.next(); // "go" itself

    while let Some(part) = parts.next() {
        match part {
            "depth" => depth = Some(part_parse("depth", parts.next())?),
            "nodes" => nodes = Some(part_parse("nodes", parts.next())?),
            "movetime" => movetime = Some(part_parse("movetime", parts.next())?),
            "movestogo" => moves_to_go = Some(part_parse("movestogo", parts.next())?),
            "wtime" if pos.turn() == Colour::White => {
                time = Some(part_parse("wtime", parts.next())?);
            }
            "btime" if pos.turn() == Colour::Black => {
                time = Some(part_parse("btime", parts.next())?);
            }
            "winc" if pos.turn() == Colour::White => {
                inc = Some(part_parse("winc", parts.next())?);
            }
            "binc" if pos.turn() == Colour::Black => {
                inc = Some(part_parse("binc", parts.next())?);
            }
            "wtime" | "btime" | "winc" | "binc" => {
                // the other side's clock: consume and ignore the value.
                parts.next();
            }
            "infinite" => infinite = true,
            _ => return Err(UciError::ParseGo(format!("unknown go term \"{part}\""))),
        }
    }

    let limit = if infinite {
        SearchLimit::Infinite
    } else if let Some(movetime) = movetime {
        SearchLimit::Time(movetime)
    } else if let Some(time) = time {
        SearchLimit::from_clock(time, inc.unwrap_or(0), moves_to_go)
    } else if let Some(nodes) = nodes {
        SearchLimit::Nodes(nodes)
    } else if let Some(depth) = depth {
        SearchLimit::Depth(depth)
    } else {
        SearchLimit::Infinite
    };
    Ok(limit)
}

fn parse_setoption(text: &str, tt: &mut TranspositionTable) -> Result<(), UciError> {
    let mut parts = text.split_ascii_whitespace();
    parts.next(); // "setoption" itself
    match parts.next() {
        Some("name") => {}
        other => {
            return Err(UciError::ParseOption(format!(
                "expected \"name\" after \"setoption\", got {other:?}"
            )))
        }
    }
    let opt_name = parts
        .next()
        .ok_or_else(|| UciError::ParseOption("no option name given".into()))?;
    match parts.next() {
        Some("value") => {}
        other => {
            return Err(UciError::ParseOption(format!(
                "expected \"value\" after the option name, got {other:?}"
            )))
        }
    }
    let opt_value = parts
        .next()
        .ok_or_else(|| UciError::ParseOption(format!("no value given for \"{opt_name}\"")))?;

    if opt_name.eq_ignore_ascii_case("hash") {
        let megabytes: usize = opt_value
            .parse()
            .map_err(|e| UciError::ParseOption(format!("bad Hash value: {e}")))?;
        tt.resize(megabytes);
    } else {
        eprintln!("info string ignoring option {opt_name}");
    }
    Ok(())
}

static KEEP_RUNNING: AtomicBool = AtomicBool::new(true);

fn stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || stdin_reader_worker(&sender))
        .expect("couldn't start the stdin reader thread");
    receiver
}

fn stdin_reader_worker(sender: &mpsc::Sender<String>) {
    let mut linebuf = String::with_capacity(128);
    while std::io::stdin().read_line(&mut linebuf).is_ok_and(|n| n > 0) {
        let cmd = linebuf.trim();
        if !cmd.is_empty() && sender.send(cmd.to_owned()).is_err() {
            break;
        }
        if !KEEP_RUNNING.load(Ordering::SeqCst) {
            break;
        }
        linebuf.clear();
    }
}

fn print_uci_response() {
    println!("id name {NAME} {VERSION}");
    println!("id author the {NAME} developers");
    println!("option name Hash type spin default {DEFAULT_HASH_MB} min 1 max 1024");
    println!("uciok");
}

/// Runs the search on a worker thread while this (protocol) thread keeps
/// draining stdin so `stop` and `quit` stay responsive. Returns the search
/// result and whether `quit` arrived mid-search.
fn go(
    pos: &mut Board,
    tt: &mut TranspositionTable,
    stopped: &AtomicBool,
    stdin: &mpsc::Receiver<String>,
    limit: SearchLimit,
) -> (Option<Move>, bool) {
    stopped.store(false, Ordering::Relaxed);
    let mut quit = false;

    let (best_move, _score) = std::thread::scope(|s| {
        let handle = s.spawn(|| {
            let mut info = SearchInfo::new(stopped, limit);
            search::iterative_deepening(pos, tt, &mut info, true)
        });

        while !handle.is_finished() {
            match stdin.recv_timeout(Duration::from_millis(10)) {
                Ok(cmd) => match cmd.as_str() {
                    "stop" => stopped.store(true, Ordering::Relaxed),
                    "quit" => {
                        stopped.store(true, Ordering::Relaxed);
                        quit = true;
                    }
                    "isready" => println!("readyok"),
                    _ => eprintln!("info string busy searching, ignoring \"{cmd}\""),
                },
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    stopped.store(true, Ordering::Relaxed);
                    quit = true;
                }
            }
        }

        handle.join().expect("the search thread panicked")
    });

    (best_move, quit)
}

pub fn main_loop() -> anyhow::Result<()> {
    crate::chess::magic::init();

    let mut pos = Board::default();
    let mut tt = TranspositionTable::with_size_mb(DEFAULT_HASH_MB);
    let stopped = AtomicBool::new(false);

    let stdin = stdin_reader();

    loop {
        std::io::stdout().flush()?;
        let Ok(line) = stdin.recv() else {
            break;
        };
        let input = line.trim();

        let res = match input {
            "uci" => {
                print_uci_response();
                Ok(())
            }
            "isready" => {
                println!("readyok");
                Ok(())
            }
            "quit" => break,
            "ucinewgame" => {
                pos.set_startpos();
                tt.clear();
                Ok(())
            }
            "stop" => Ok(()), // no search in flight
            "eval" => {
                println!("{}", evaluate(&pos));
                Ok(())
            }
            "d" => {
                print!("{pos}");
                Ok(())
            }
            input if input.starts_with("setoption") => parse_setoption(input, &mut tt),
            input if input.starts_with("position") => parse_position(input, &mut pos),
            input if input.starts_with("go perft") => {
                match part_parse::<usize>("perft", input.split_ascii_whitespace().nth(2)) {
                    Ok(depth) => {
                        perft::split_perft(&mut pos, depth);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            input if input.starts_with("go") => match parse_go(input, &pos) {
                Ok(limit) => {
                    let (best_move, quit) = go(&mut pos, &mut tt, &stopped, &stdin, limit);
                    match best_move {
                        Some(m) => println!("bestmove {m}"),
                        None => println!("bestmove 0000"),
                    }
                    if quit {
                        break;
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
            _ => Err(UciError::UnknownCommand(input.to_string())),
        };

        if let Err(e) = res {
            eprintln!("error: {e}");
        }
    }

    KEEP_RUNNING.store(false, Ordering::SeqCst);
    Ok(())
}
