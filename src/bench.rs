use std::{
    fs::File,
    io::{BufRead, BufReader},
    sync::atomic::AtomicBool,
    time::Instant,
};

use anyhow::{bail, Context};

use crate::{
    chess::board::Board,
    search,
    searchinfo::SearchInfo,
    timemgmt::SearchLimit,
    transpositiontable::{TranspositionTable, DEFAULT_HASH_MB},
};

/// A spread of openings, middlegames, and endgames for the node-count
/// benchmark. Fixed-depth search over these gives a stable signature: the
/// total node count only changes when search behaviour changes.
pub static BENCH_POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "rnbqkb1r/pp1p1ppp/2p2n2/4p3/4P3/2N2N2/PPPP1PPP/R1BQKB1R w KQkq - 0 4",
    "r1bq1rk1/pppp1ppp/2n2n2/2b1p3/2B1P3/2PP1N2/PP3PPP/RNBQ1RK1 b - - 0 6",
    "r2q1rk1/ppp2ppp/2npbn2/2b1p3/4P3/2PP1NP1/PP1N1PBP/R1BQ1RK1 b - - 2 8",
    "2rq1rk1/pb1nbppp/1p2pn2/2pp4/3P4/1P2PNP1/PBPN1PBP/R2Q1RK1 w - - 0 11",
    "8/8/1p3kp1/p1p2p1p/P1P2P1P/1P2K1P1/8/8 w - - 0 40",
    "8/3k4/3p4/p2P1p2/P2P1P2/8/3K4/8 w - - 0 50",
    "6k1/5ppp/8/8/8/8/5PPP/6K1 w - - 0 1",
    "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
];

/// Fixed-depth search over the bench positions, reporting total nodes and
/// speed in the OpenBench format.
pub fn run(depth: i32) -> anyhow::Result<()> {
    crate::chess::magic::init();

    let mut tt = TranspositionTable::with_size_mb(DEFAULT_HASH_MB);
    let stopped = AtomicBool::new(false);
    let mut total_nodes = 0u64;
    let start = Instant::now();

    for (i, fen) in BENCH_POSITIONS.iter().enumerate() {
        let mut pos =
            Board::from_fen(fen).with_context(|| format!("bad bench position {fen:?}"))?;
        tt.clear();
        let mut info = SearchInfo::new(&stopped, SearchLimit::Depth(depth));
        let (best_move, _score) = search::iterative_deepening(&mut pos, &mut tt, &mut info, false);
        let best_move = best_move.map_or_else(|| "0000".to_string(), |m| m.to_string());
        println!(
            "position {:2}/{} bestmove {best_move} nodes {}",
            i + 1,
            BENCH_POSITIONS.len(),
            info.nodes,
        );
        total_nodes += info.nodes;
    }

    let seconds = start.elapsed().as_secs_f64();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let nps = (total_nodes as f64 / seconds) as u64;
    println!("{total_nodes} nodes {nps} nps");
    Ok(())
}

/// Runs the best-move suite: every `epds/engine.epd` entry names the move
/// a fixed-depth search must find.
pub fn engine_suite(depth: i32) -> anyhow::Result<()> {
    crate::chess::magic::init();

    let f = File::open("epds/engine.epd").with_context(|| "failed to open epds/engine.epd")?;
    let mut tt = TranspositionTable::with_size_mb(DEFAULT_HASH_MB);
    let stopped = AtomicBool::new(false);
    let mut tested = 0;
    let mut correct = 0;

    for line in BufReader::new(f).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (fen, best) = line
            .split_once(" bm ")
            .with_context(|| format!("no \"bm\" operation in {line:?}"))?;
        let best = best
            .split(';')
            .next()
            .unwrap()
            .trim();

        let mut pos = Board::from_fen(fen).with_context(|| format!("bad EPD fen {fen:?}"))?;
        let expected = pos
            .parse_san(best)
            .with_context(|| format!("bad bm {best:?} for {fen:?}"))?;

        tt.clear();
        let mut info = SearchInfo::new(&stopped, SearchLimit::Depth(depth));
        let (got, _score) = search::iterative_deepening(&mut pos, &mut tt, &mut info, false);

        tested += 1;
        if got == Some(expected) {
            correct += 1;
            println!("PASS: {fen} bm {best}");
        } else {
            let got = got.map_or_else(|| "0000".to_string(), |m| m.to_string());
            println!("FAIL: {fen} bm {best}, engine chose {got}");
        }
    }

    println!("{correct}/{tested} correct");
    if correct != tested {
        bail!("engine suite failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_positions_all_parse() {
        for fen in BENCH_POSITIONS {
            assert!(Board::from_fen(fen).is_ok(), "bad bench position {fen:?}");
        }
    }
}
