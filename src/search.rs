use crate::{
    chess::{
        board::{
            movegen::{AllMoves, CapturesAndPromotions, MoveList, MoveListEntry},
            Board, MAX_PLY,
        },
        chessmove::Move,
        piece::PieceType,
    },
    evaluation::{evaluate, mated_in, DRAW_SCORE, INFINITY},
    lookups::mvv_lva_score,
    searchinfo::SearchInfo,
    timemgmt::SearchLimit,
    transpositiontable::{Bound, TranspositionTable},
    uci,
};

const TT_MOVE_SCORE: i32 = 2_000_000;
const PROMO_SCORE: i32 = 1_000_000;
const CAPTURE_SCORE: i32 = 900_000;
const PREVIOUS_BEST_SCORE: i32 = 3_000_000;

/// Iterative deepening driver. Returns the best move of the last completed
/// iteration and its score; when no iteration completes before the search
/// is stopped, falls back to the first legal move.
pub fn iterative_deepening(
    pos: &mut Board,
    tt: &mut TranspositionTable,
    info: &mut SearchInfo,
    report: bool,
) -> (Option<Move>, i32) {
    let mut root_moves = MoveList::new();
    pos.generate_moves::<AllMoves>(&mut root_moves);
    if root_moves.is_empty() {
        let score = if pos.in_check() {
            mated_in(pos.height())
        } else {
            DRAW_SCORE
        };
        return (None, score);
    }
    let fallback = root_moves.iter_moves().next().copied();

    #[allow(clippy::cast_possible_wrap)]
    let max_depth = match info.limit {
        SearchLimit::Depth(d) => d.min(MAX_PLY as i32 - 1),
        _ => MAX_PLY as i32 - 1,
    };

    let mut best_move = None;
    let mut best_score = -INFINITY;

    for depth in 1..=max_depth {
        let Some((iteration_move, iteration_score)) =
            search_root(pos, tt, info, &mut root_moves, depth, best_move)
        else {
            // aborted mid-iteration: the previous depth's answer stands.
            break;
        };
        best_move = Some(iteration_move);
        best_score = iteration_score;

        if report {
            let millis = info.elapsed_millis();
            let nps = info.nodes * 1000 / millis.max(1);
            println!(
                "info depth {depth} score {} nodes {} time {millis} nps {nps} pv {iteration_move}",
                uci::format_score(iteration_score),
                info.nodes,
            );
        }

        if info.interrupted {
            break;
        }
    }

    (best_move.or(fallback), best_score)
}

/// One aspiration-free root iteration. Returns `None` when interrupted
/// before every root move was searched.
fn search_root(
    pos: &mut Board,
    tt: &mut TranspositionTable,
    info: &mut SearchInfo,
    root_moves: &mut MoveList,
    depth: i32,
    previous_best: Option<Move>,
) -> Option<(Move, i32)> {
    let mut alpha = -INFINITY;
    let beta = INFINITY;

    let tt_move = tt.probe(pos.zobrist_key(), 0).and_then(|hit| hit.m);
    score_moves(pos, root_moves, tt_move);
    if let Some(previous) = previous_best {
        if let Some(entry) = root_moves.iter_mut().find(|e| e.mov == previous) {
            entry.score = PREVIOUS_BEST_SCORE;
        }
    }
    root_moves.sort();

    let mut best = None;

    for i in 0..root_moves.len() {
        info.check_up();
        if info.interrupted {
            return None;
        }
        let mov = root_moves[i].mov;
        pos.make_move(mov);
        let score = -alpha_beta(pos, tt, info, depth - 1, -beta, -alpha);
        pos.unmake_move();
        if info.interrupted {
            return None;
        }
        if score > alpha {
            alpha = score;
            best = Some((mov, score));
        }
    }

    let (best_move, best_score) = best.expect("a root move always raises -INFINITY");
    tt.store(
        pos.zobrist_key(),
        0,
        Some(best_move),
        best_score,
        Bound::Exact,
        depth,
    );
    Some((best_move, best_score))
}

/// Negamax with alpha-beta pruning, transposition cutoffs, and quiescence
/// at the horizon.
fn alpha_beta(
    pos: &mut Board,
    tt: &mut TranspositionTable,
    info: &mut SearchInfo,
    depth: i32,
    mut alpha: i32,
    beta: i32,
) -> i32 {
    if depth <= 0 {
        return quiescence(pos, info, alpha, beta);
    }

    info.nodes += 1;
    info.check_up();
    if info.interrupted {
        return 0;
    }

    let height = pos.height();
    if height >= MAX_PLY - 1 {
        return evaluate(pos);
    }

    let mut move_list = MoveList::new();
    pos.generate_moves::<AllMoves>(&mut move_list);
    if move_list.is_empty() {
        return if pos.in_check() {
            mated_in(height)
        } else {
            DRAW_SCORE
        };
    }

    let mut tt_move = None;
    if let Some(hit) = tt.probe(pos.zobrist_key(), height) {
        tt_move = hit.m;
        if hit.depth >= depth {
            match hit.bound {
                Bound::Exact => return hit.score,
                Bound::Lower if hit.score >= beta => return hit.score,
                Bound::Upper if hit.score <= alpha => return hit.score,
                _ => {}
            }
        }
    }

    score_moves(pos, &mut move_list, tt_move);
    move_list.sort();

    let original_alpha = alpha;
    let mut best_score = -INFINITY;
    let mut best_move = None;

    for &MoveListEntry { mov, .. } in move_list.iter() {
        pos.make_move(mov);
        let score = -alpha_beta(pos, tt, info, depth - 1, -beta, -alpha);
        pos.unmake_move();
        if info.interrupted {
            return 0;
        }

        if score > best_score {
            best_score = score;
            best_move = Some(mov);
        }
        if score > alpha {
            alpha = score;
            if alpha >= beta {
                break;
            }
        }
    }

    let bound = if alpha >= beta {
        Bound::Lower
    } else if alpha > original_alpha {
        Bound::Exact
    } else {
        Bound::Upper
    };
    tt.store(pos.zobrist_key(), height, best_move, best_score, bound, depth);

    best_score
}

/// Resolves tactical volatility at the horizon: evasions when in check,
/// otherwise stand-pat plus captures and promotions.
fn quiescence(pos: &mut Board, info: &mut SearchInfo, mut alpha: i32, beta: i32) -> i32 {
    info.nodes += 1;
    info.check_up();
    if info.interrupted {
        return 0;
    }

    let height = pos.height();
    if height >= MAX_PLY - 1 {
        return evaluate(pos);
    }

    let in_check = pos.in_check();
    let mut move_list = MoveList::new();

    if in_check {
        pos.generate_moves::<AllMoves>(&mut move_list);
        if move_list.is_empty() {
            return mated_in(height);
        }
    } else {
        let stand_pat = evaluate(pos);
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        pos.generate_moves::<CapturesAndPromotions>(&mut move_list);
    }

    score_moves(pos, &mut move_list, None);
    move_list.sort();

    for i in 0..move_list.len() {
        let mov = move_list[i].mov;
        pos.make_move(mov);
        let score = -quiescence(pos, info, -beta, -alpha);
        pos.unmake_move();
        if info.interrupted {
            return 0;
        }

        if score > alpha {
            alpha = score;
            if alpha >= beta {
                return beta;
            }
        }
    }

    alpha
}

/// Orders: hash move, then promotions, then captures by MVV-LVA, then
/// quiets in generation order.
fn score_moves(pos: &Board, move_list: &mut MoveList, tt_move: Option<Move>) {
    for entry in move_list.iter_mut() {
        let m = entry.mov;
        entry.score = if tt_move == Some(m) {
            TT_MOVE_SCORE
        } else if let Some(promo) = m.promotion_type() {
            PROMO_SCORE + promo.value()
        } else if m.is_capture() {
            let victim = if m.is_ep() {
                PieceType::Pawn
            } else {
                pos.piece_at(m.to()).expect("capture of an empty square")
            };
            let attacker = pos.piece_at(m.from()).expect("move from an empty square");
            CAPTURE_SCORE + mvv_lva_score(victim, attacker)
        } else {
            0
        };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::evaluation::MATE_SCORE;

    fn search_depth(fen: &str, depth: i32) -> (Option<Move>, i32) {
        let mut pos = Board::from_fen(fen).unwrap();
        let mut tt = TranspositionTable::with_size_mb(4);
        let stopped = AtomicBool::new(false);
        let mut info = SearchInfo::new(&stopped, SearchLimit::Depth(depth));
        iterative_deepening(&mut pos, &mut tt, &mut info, false)
    }

    #[test]
    fn finds_mate_in_one() {
        // Re8 is the back-rank mate.
        let (best, score) = search_depth("6k1/5ppp/8/8/8/8/8/4R2K w - - 0 1", 3);
        assert_eq!(best.unwrap().to_string(), "e1e8");
        assert_eq!(score, MATE_SCORE - 1);
    }

    #[test]
    fn finds_mate_in_two() {
        // Ladder mate: one rook seals the seventh rank, the other delivers.
        let (best, score) = search_depth("3k4/8/8/8/8/8/6R1/6KR w - - 0 1", 4);
        assert_eq!(score, MATE_SCORE - 3);
        let best = best.unwrap().to_string();
        assert!(best == "g2g7" || best == "h1h7", "got {best}");
    }

    #[test]
    fn mated_side_sees_the_mate_coming() {
        // Black to move, about to be ladder-mated.
        let (best, score) = search_depth("3k4/6R1/8/8/8/8/8/6KR b - - 0 1", 4);
        assert!(best.is_some());
        assert_eq!(score, -(MATE_SCORE - 2));
    }

    #[test]
    fn stalemate_scores_zero() {
        let (best, score) = search_depth("7k/5Q2/8/8/8/8/8/K7 b - - 0 1", 4);
        assert_eq!(best, None);
        assert_eq!(score, DRAW_SCORE);
    }

    #[test]
    fn checkmated_root_reports_mate() {
        // Fool's mate: white is already checkmated.
        let (best, score) =
            search_depth("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 2 3", 2);
        assert_eq!(best, None);
        assert_eq!(score, -MATE_SCORE);
    }

    #[test]
    fn prefers_winning_material() {
        // The queen hangs on d5 with nothing defending it.
        let (best, score) = search_depth("3k4/8/8/3q4/8/8/3R4/3K4 w - - 0 1", 3);
        assert_eq!(best.unwrap().to_string(), "d2d5");
        assert!(score > 0);
    }

    #[test]
    fn lone_pawn_endgame_prefers_a_push(){
        let (best, score) = search_depth("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1", 2);
        let best = best.unwrap().to_string();
        assert!(best == "e2e3" || best == "e2e4", "got {best}");
        assert!(score >= 0);
    }

    #[test]
    fn same_search_twice_is_deterministic() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let a = search_depth(fen, 4);
        let b = search_depth(fen, 4);
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn preset_stop_flag_still_yields_a_legal_move() {
        let mut pos = Board::default();
        let mut tt = TranspositionTable::with_size_mb(1);
        let stopped = AtomicBool::new(true);
        let mut info = SearchInfo::new(&stopped, SearchLimit::Infinite);
        let (best, _) = iterative_deepening(&mut pos, &mut tt, &mut info, false);
        let best = best.unwrap();
        assert!(pos.parse_uci(&best.to_string()).is_ok());
        assert!(stopped.load(Ordering::Relaxed));
    }

    #[test]
    fn node_budget_is_respected() {
        let mut pos = Board::default();
        let mut tt = TranspositionTable::with_size_mb(4);
        let stopped = AtomicBool::new(false);
        let mut info = SearchInfo::new(&stopped, SearchLimit::Nodes(20_000));
        let (best, _) = iterative_deepening(&mut pos, &mut tt, &mut info, false);
        assert!(best.is_some());
        // one check period of slack on top of the budget.
        assert!(info.nodes <= 20_000 + 2048, "searched {} nodes", info.nodes);
    }
}
