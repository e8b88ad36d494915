use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use carnelian::chess::board::Board;
use carnelian::perft::perft;

#[derive(Clone, Copy)]
struct BenchCase {
    name: &'static str,
    fen: &'static str,
    depth: usize,
    expected_nodes: u64,
}

const CASES: &[BenchCase] = &[
    BenchCase {
        name: "startpos",
        fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        depth: 4,
        expected_nodes: 197_281,
    },
    BenchCase {
        name: "kiwipete",
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        depth: 3,
        expected_nodes: 97_862,
    },
    BenchCase {
        name: "rook_endgame",
        fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        depth: 4,
        expected_nodes: 43_238,
    },
];

fn perft_benchmark(c: &mut Criterion) {
    carnelian::chess::magic::init();

    let mut group = c.benchmark_group("perft");
    for case in CASES {
        let mut board = Board::from_fen(case.fen).unwrap();
        // fail loudly if the generator regresses rather than timing garbage.
        assert_eq!(perft(&mut board, case.depth), case.expected_nodes);

        group.throughput(Throughput::Elements(case.expected_nodes));
        group.bench_with_input(
            BenchmarkId::from_parameter(case.name),
            case,
            |b, case| {
                let mut board = Board::from_fen(case.fen).unwrap();
                b.iter(|| black_box(perft(&mut board, case.depth)));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, perft_benchmark);
criterion_main!(benches);
