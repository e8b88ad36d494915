use std::{
    fs::File,
    io::{BufRead, BufReader},
};

use anyhow::{bail, Context};

use crate::chess::board::{
    movegen::{AllMoves, MoveList},
    Board,
};

/// Counts the leaves of the legal-move tree: the correctness oracle for
/// move generation.
pub fn perft(pos: &mut Board, depth: usize) -> u64 {
    #[cfg(debug_assertions)]
    pos.check_validity().unwrap();

    if depth == 0 {
        return 1;
    }

    let mut ml = MoveList::new();
    pos.generate_moves::<AllMoves>(&mut ml);

    // the generator is fully legal, so the frontier needs no make/unmake.
    if depth == 1 {
        return ml.len() as u64;
    }

    let mut count = 0;
    for &m in ml.iter_moves() {
        pos.make_move(m);
        count += perft(pos, depth - 1);
        pos.unmake_move();
    }

    count
}

/// Root-split perft: prints the subtree count under each root move, then
/// the total. The shape `go perft` debugging wants.
pub fn split_perft(pos: &mut Board, depth: usize) -> u64 {
    let mut ml = MoveList::new();
    pos.generate_moves::<AllMoves>(&mut ml);

    let mut total = 0;
    for &m in ml.iter_moves() {
        pos.make_move(m);
        let nodes = if depth > 1 { perft(pos, depth - 1) } else { 1 };
        pos.unmake_move();
        total += nodes;
        println!("{m}: {nodes}");
    }
    println!();
    println!("Nodes searched: {total}");
    total
}

/// Runs the bundled perft suite, failing on the first divergence.
pub fn gamut() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    const NODES_LIMIT: u64 = 60_000;
    #[cfg(not(debug_assertions))]
    const NODES_LIMIT: u64 = 200_000_000;

    println!("running perft on epds/perftsuite.epd");
    let f = File::open("epds/perftsuite.epd")
        .with_context(|| "failed to open epds/perftsuite.epd")?;
    let mut pos = Board::default();
    for line in BufReader::new(f).lines() {
        let line = line?;
        let mut parts = line.split(';');
        let fen = parts
            .next()
            .with_context(|| "failed to find fen in line")?
            .trim();
        pos.set_from_fen(fen)?;
        for depth_part in parts {
            let depth_part = depth_part.trim();
            let (d, nodes) = depth_part
                .split_once(' ')
                .with_context(|| format!("malformed depth entry {depth_part:?}"))?;
            let d: usize = d
                .strip_prefix('D')
                .with_context(|| format!("malformed depth tag {d:?}"))?
                .parse()?;
            let nodes: u64 = nodes.parse()?;
            if nodes > NODES_LIMIT {
                println!("skipping depth {d} of {fen} ({nodes} nodes)");
                continue;
            }
            let perft_nodes = perft(&mut pos, d);
            if perft_nodes == nodes {
                println!("PASS: fen {fen}, depth {d}");
            } else {
                bail!("FAIL: fen {fen}, depth {d}: expected {nodes}, got {perft_nodes}");
            }
        }
    }
    Ok(())
}
