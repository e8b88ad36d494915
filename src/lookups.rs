use crate::{
    cfor,
    chess::{piece::PieceType, types::CastlingRights},
    rng::XorShiftState,
};

const fn init_hash_keys() -> ([[[u64; 64]; 6]; 2], [u64; 16], [u64; 8], u64) {
    let mut state = XorShiftState::new();
    let mut piece_keys = [[[0; 64]; 6]; 2];
    cfor!(let mut colour = 0; colour < 2; colour += 1; {
        cfor!(let mut piece = 0; piece < 6; piece += 1; {
            cfor!(let mut sq = 0; sq < 64; sq += 1; {
                let key;
                (key, state) = state.next_self();
                piece_keys[colour][piece][sq] = key;
            });
        });
    });
    let mut castle_keys = [0; 16];
    cfor!(let mut index = 0; index < 16; index += 1; {
        let key;
        (key, state) = state.next_self();
        castle_keys[index] = key;
    });
    let mut ep_keys = [0; 8];
    cfor!(let mut file = 0; file < 8; file += 1; {
        let key;
        (key, state) = state.next_self();
        ep_keys[file] = key;
    });
    let key;
    (key, _) = state.next_self();
    let side_key = key;
    (piece_keys, castle_keys, ep_keys, side_key)
}

/// One key per (colour, piece kind, square).
pub static PIECE_KEYS: [[[u64; 64]; 6]; 2] = init_hash_keys().0;
/// One key per castling-rights combination.
pub static CASTLE_KEYS: [u64; 16] = init_hash_keys().1;
/// One key per en-passant file, hashed only while an en-passant target exists.
pub static EP_FILE_KEYS: [u64; 8] = init_hash_keys().2;
/// Hashed in whenever the side to move is black.
pub const SIDE_KEY: u64 = init_hash_keys().3;

/// For each square, the castling rights that are lost when any piece moves
/// from or to it. Only the king and rook home squares carry bits.
pub static CASTLING_RIGHTS_UPDATE: [CastlingRights; 64] = {
    let mut table = [CastlingRights::NONE; 64];
    table[0] = CastlingRights::WHITE_QUEENSIDE; // a1
    table[4] = CastlingRights::WHITE_KINGSIDE.union(CastlingRights::WHITE_QUEENSIDE); // e1
    table[7] = CastlingRights::WHITE_KINGSIDE; // h1
    table[56] = CastlingRights::BLACK_QUEENSIDE; // a8
    table[60] = CastlingRights::BLACK_KINGSIDE.union(CastlingRights::BLACK_QUEENSIDE); // e8
    table[63] = CastlingRights::BLACK_KINGSIDE; // h8
    table
};

const fn victim_score(piece: PieceType) -> i32 {
    piece as i32 * 1000 // pawn = 0, knight = 1000, bishop = 2000, etc.
}

/// The score of this pair of pieces, for MVV/LVA move ordering.
pub const fn mvv_lva_score(victim: PieceType, attacker: PieceType) -> i32 {
    victim_score(victim) + 60 - victim_score(attacker) / 100
}

mod tests {
    #[test]
    fn all_piece_keys_different() {
        use super::PIECE_KEYS;
        let mut hashkeys = PIECE_KEYS
            .iter()
            .flatten()
            .flatten()
            .copied()
            .collect::<Vec<u64>>();
        hashkeys.sort_unstable();
        let len_before = hashkeys.len();
        hashkeys.dedup();
        assert_eq!(len_before, hashkeys.len());
    }

    #[test]
    fn all_castle_keys_different() {
        use super::CASTLE_KEYS;
        let mut hashkeys = CASTLE_KEYS.to_vec();
        hashkeys.sort_unstable();
        let len_before = hashkeys.len();
        hashkeys.dedup();
        assert_eq!(len_before, hashkeys.len());
    }

    #[test]
    fn rights_update_only_on_corner_and_king_squares() {
        use super::CASTLING_RIGHTS_UPDATE;
        use crate::chess::types::{CastlingRights, Square};
        let affected: Vec<Square> = Square::all()
            .filter(|&sq| CASTLING_RIGHTS_UPDATE[sq] != CastlingRights::NONE)
            .collect();
        assert_eq!(
            affected,
            vec![Square::A1, Square::E1, Square::H1, Square::A8, Square::E8, Square::H8]
        );
    }

    #[test]
    fn mvv_lva_prefers_valuable_victims_and_cheap_attackers() {
        use super::mvv_lva_score;
        use crate::chess::piece::PieceType;
        assert!(
            mvv_lva_score(PieceType::Queen, PieceType::Pawn)
                > mvv_lva_score(PieceType::Rook, PieceType::Pawn)
        );
        assert!(
            mvv_lva_score(PieceType::Queen, PieceType::Pawn)
                > mvv_lva_score(PieceType::Queen, PieceType::Rook)
        );
    }
}
