pub mod movegen;
pub mod san;
pub mod validation;

use std::fmt::{self, Display, Formatter};

use crate::{
    chess::{
        chessmove::Move,
        piece::{Colour, PieceType},
        squareset::SquareSet,
        types::{CastlingRights, File, Rank, Square},
    },
    errors::{FenParseError, MoveParseError},
    lookups::{CASTLE_KEYS, CASTLING_RIGHTS_UPDATE, EP_FILE_KEYS, PIECE_KEYS, SIDE_KEY},
};

/// The most plies the undo stack can hold; deep enough that reaching it
/// during search is a bug.
pub const MAX_PLY: usize = 256;

/// Everything about a position that cannot be reconstructed by reversing
/// the move that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Undo {
    m: Option<Move>,
    ep_square: Option<Square>,
    castle_perm: CastlingRights,
    halfmove_clock: u16,
    captured: Option<PieceType>,
}

impl Undo {
    const EMPTY: Self = Self {
        m: None,
        ep_square: None,
        castle_perm: CastlingRights::NONE,
        halfmove_clock: 0,
        captured: None,
    };
}

pub struct Board {
    pub(crate) pieces: [[SquareSet; 6]; 2],
    pub(crate) colours: [SquareSet; 2],
    pub(crate) occupied: SquareSet,
    pub(crate) piece_map: [Option<PieceType>; 64],
    pub(crate) king_squares: [Square; 2],
    pub(crate) material: [i32; 2],
    pub(crate) side: Colour,
    pub(crate) castle_perm: CastlingRights,
    pub(crate) ep_square: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,
    key: u64,
    height: usize,
    history: [Undo; MAX_PLY],
}

/// Compares the live position; dead undo slots above `height` are ignored.
impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.pieces == other.pieces
            && self.colours == other.colours
            && self.occupied == other.occupied
            && self.piece_map == other.piece_map
            && self.king_squares == other.king_squares
            && self.material == other.material
            && self.side == other.side
            && self.castle_perm == other.castle_perm
            && self.ep_square == other.ep_square
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
            && self.key == other.key
            && self.height == other.height
    }
}

impl Eq for Board {}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("fen", &self.fen())
            .field("key", &self.key)
            .field("material", &self.material)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Clone for Board {
    fn clone(&self) -> Self {
        // every field is Copy; the undo stack rides along.
        Self { ..*self }
    }
}

impl Default for Board {
    fn default() -> Self {
        let mut out = Self::empty();
        out.set_startpos();
        out
    }
}

impl Board {
    pub const STARTING_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    pub fn empty() -> Self {
        Self {
            pieces: [[SquareSet::EMPTY; 6]; 2],
            colours: [SquareSet::EMPTY; 2],
            occupied: SquareSet::EMPTY,
            piece_map: [None; 64],
            king_squares: [Square::A1; 2],
            material: [0; 2],
            side: Colour::White,
            castle_perm: CastlingRights::NONE,
            ep_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            key: 0,
            height: 0,
            history: [Undo::EMPTY; MAX_PLY],
        }
    }

    pub const fn turn(&self) -> Colour {
        self.side
    }

    /// Plies made since the stack was last zeroed; the search's distance
    /// from its root.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Forgets the undo stack. Called after installing a position so a long
    /// game fed over the protocol cannot grow the stack past its bound.
    pub fn zero_height(&mut self) {
        self.height = 0;
    }

    pub const fn zobrist_key(&self) -> u64 {
        self.key
    }

    pub const fn ep_sq(&self) -> Option<Square> {
        self.ep_square
    }

    pub const fn castling_rights(&self) -> CastlingRights {
        self.castle_perm
    }

    pub const fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    pub fn material(&self, side: Colour) -> i32 {
        self.material[side]
    }

    pub fn piece_at(&self, sq: Square) -> Option<PieceType> {
        self.piece_map[sq]
    }

    pub fn colour_at(&self, sq: Square) -> Option<Colour> {
        if self.colours[Colour::White].contains_square(sq) {
            Some(Colour::White)
        } else if self.colours[Colour::Black].contains_square(sq) {
            Some(Colour::Black)
        } else {
            None
        }
    }

    pub fn king_sq(&self, side: Colour) -> Square {
        self.king_squares[side]
    }

    fn add_piece(&mut self, colour: Colour, piece: PieceType, sq: Square) {
        let bb = sq.as_set();
        debug_assert!((self.occupied & bb).is_empty());
        self.pieces[colour][piece] |= bb;
        self.colours[colour] |= bb;
        self.occupied |= bb;
        self.piece_map[sq] = Some(piece);
        self.material[colour] += piece.value();
        self.key ^= PIECE_KEYS[colour.index()][piece][sq.index()];
        if piece == PieceType::King {
            self.king_squares[colour] = sq;
        }
    }

    fn clear_piece(&mut self, colour: Colour, piece: PieceType, sq: Square) {
        let bb = sq.as_set();
        debug_assert!(self.pieces[colour][piece].contains_square(sq));
        self.pieces[colour][piece] ^= bb;
        self.colours[colour] ^= bb;
        self.occupied ^= bb;
        self.piece_map[sq] = None;
        self.material[colour] -= piece.value();
        self.key ^= PIECE_KEYS[colour.index()][piece][sq.index()];
    }

    /// Is `sq` attacked by any piece of `by` under the current occupancy?
    pub fn sq_attacked(&self, sq: Square, by: Colour) -> bool {
        use crate::chess::board::movegen::{king_attacks, knight_attacks, pawn_attacks};
        use crate::chess::magic::{bishop_attacks, rook_attacks};
        use PieceType::{Bishop, King, Knight, Pawn, Queen, Rook};

        let their = &self.pieces[by];
        (pawn_attacks(by.flip(), sq) & their[Pawn]).non_empty()
            || (knight_attacks(sq) & their[Knight]).non_empty()
            || (king_attacks(sq) & their[King]).non_empty()
            || (bishop_attacks(sq, self.occupied) & (their[Bishop] | their[Queen])).non_empty()
            || (rook_attacks(sq, self.occupied) & (their[Rook] | their[Queen])).non_empty()
    }

    pub fn in_check(&self) -> bool {
        self.sq_attacked(self.king_squares[self.side], self.side.flip())
    }

    pub fn set_startpos(&mut self) {
        self.set_from_fen(Self::STARTING_FEN)
            .expect("the starting FEN is well-formed");
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenParseError> {
        let mut out = Self::empty();
        out.set_from_fen(fen)?;
        Ok(out)
    }

    /// Loads a FEN. Missing trailing fields default to sane values (white
    /// to move, no rights, no en passant, clocks 0 and 1). On error the
    /// position is left untouched.
    pub fn set_from_fen(&mut self, fen: &str) -> Result<(), FenParseError> {
        let mut board = Self::empty();
        let mut parts = fen.split_ascii_whitespace();

        let placement = parts.next().ok_or(FenParseError::MissingBoard)?;
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenParseError::BoardSegments(ranks.len()));
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(run) = c.to_digit(10) {
                    file += run as u8;
                    if file > 8 {
                        return Err(FenParseError::BadSquaresInRank(8 - rank as usize));
                    }
                    continue;
                }
                if !c.is_ascii_alphabetic() {
                    return Err(FenParseError::UnexpectedCharacter(c));
                }
                let Some(piece) = PieceType::from_symbol(c.to_ascii_uppercase() as u8) else {
                    return Err(FenParseError::UnexpectedCharacter(c));
                };
                if file >= 8 {
                    return Err(FenParseError::BadSquaresInRank(8 - rank as usize));
                }
                let colour = if c.is_ascii_uppercase() {
                    Colour::White
                } else {
                    Colour::Black
                };
                let sq = Square::from_rank_file(
                    Rank::from_index(rank).unwrap(),
                    File::from_index(file).unwrap(),
                );
                board.add_piece(colour, piece, sq);
                file += 1;
            }
            if file != 8 {
                return Err(FenParseError::BadSquaresInRank(8 - rank as usize));
            }
        }

        for colour in [Colour::White, Colour::Black] {
            if board.pieces[colour][PieceType::King].count() != 1 {
                return Err(FenParseError::WrongKingCount(match colour {
                    Colour::White => "white",
                    Colour::Black => "black",
                }));
            }
        }

        board.side = match parts.next() {
            None | Some("w") => Colour::White,
            Some("b") => Colour::Black,
            Some(other) => return Err(FenParseError::InvalidSide(other.to_string())),
        };

        board.castle_perm = match parts.next() {
            None | Some("-") => CastlingRights::NONE,
            Some(rights) => {
                let mut perm = CastlingRights::NONE;
                for c in rights.chars() {
                    perm = perm.union(match c {
                        'K' => CastlingRights::WHITE_KINGSIDE,
                        'Q' => CastlingRights::WHITE_QUEENSIDE,
                        'k' => CastlingRights::BLACK_KINGSIDE,
                        'q' => CastlingRights::BLACK_QUEENSIDE,
                        _ => return Err(FenParseError::InvalidCastling(rights.to_string())),
                    });
                }
                perm
            }
        };

        board.ep_square = match parts.next() {
            None | Some("-") => None,
            Some(sq) => Some(
                sq.parse::<Square>()
                    .map_err(|_| FenParseError::InvalidEnPassant(sq.to_string()))?,
            ),
        };

        board.halfmove_clock = match parts.next() {
            None => 0,
            Some(hm) => hm
                .parse()
                .map_err(|_| FenParseError::InvalidHalfmoveClock(hm.to_string()))?,
        };

        board.fullmove_number = match parts.next() {
            None => 1,
            Some(fm) => fm
                .parse()
                .map_err(|_| FenParseError::InvalidFullmoveNumber(fm.to_string()))?,
        };

        // piece keys accumulated while placing; fold in the rest.
        board.key ^= CASTLE_KEYS[board.castle_perm.hashkey_index()];
        if let Some(ep) = board.ep_square {
            board.key ^= EP_FILE_KEYS[ep.file() as usize];
        }
        if board.side == Colour::Black {
            board.key ^= SIDE_KEY;
        }

        *self = board;
        Ok(())
    }

    /// Serializes the position to its canonical FEN.
    pub fn fen(&self) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(90);
        for rank in (0..8u8).rev() {
            let mut empty_run = 0;
            for file in 0..8u8 {
                let sq = Square::from_rank_file(
                    Rank::from_index(rank).unwrap(),
                    File::from_index(file).unwrap(),
                );
                match self.piece_map[sq] {
                    None => empty_run += 1,
                    Some(piece) => {
                        if empty_run > 0 {
                            write!(out, "{empty_run}").unwrap();
                            empty_run = 0;
                        }
                        let colour = self.colour_at(sq).unwrap();
                        out.push(piece.fen_char(colour));
                    }
                }
            }
            if empty_run > 0 {
                write!(out, "{empty_run}").unwrap();
            }
            if rank > 0 {
                out.push('/');
            }
        }
        let side = if self.side == Colour::White { 'w' } else { 'b' };
        write!(out, " {side} {}", self.castle_perm).unwrap();
        match self.ep_square {
            Some(ep) => write!(out, " {ep}").unwrap(),
            None => out.push_str(" -"),
        }
        write!(out, " {} {}", self.halfmove_clock, self.fullmove_number).unwrap();
        out
    }

    /// Recomputes the Zobrist key from scratch; the incremental key must
    /// always agree with this.
    pub(crate) fn generate_key(&self) -> u64 {
        let mut key = 0;
        for sq in Square::all() {
            if let Some(piece) = self.piece_map[sq] {
                let colour = self.colour_at(sq).unwrap();
                key ^= PIECE_KEYS[colour.index()][piece][sq.index()];
            }
        }
        key ^= CASTLE_KEYS[self.castle_perm.hashkey_index()];
        if let Some(ep) = self.ep_square {
            key ^= EP_FILE_KEYS[ep.file() as usize];
        }
        if self.side == Colour::Black {
            key ^= SIDE_KEY;
        }
        key
    }

    pub fn make_move(&mut self, m: Move) {
        #[cfg(debug_assertions)]
        self.check_validity().unwrap();

        let from = m.from();
        let to = m.to();
        let side = self.side;
        let piece = self.piece_map[from].expect("make_move from an empty square");

        let mut undo = Undo {
            m: Some(m),
            ep_square: self.ep_square,
            castle_perm: self.castle_perm,
            halfmove_clock: self.halfmove_clock,
            captured: None,
        };

        self.halfmove_clock += 1;
        if piece == PieceType::Pawn {
            self.halfmove_clock = 0;
        }
        if side == Colour::Black {
            self.fullmove_number += 1;
        }

        // the en-passant target lives for exactly one ply, and only a
        // double pawn push creates one.
        if let Some(ep) = self.ep_square {
            self.key ^= EP_FILE_KEYS[ep.file() as usize];
        }
        self.ep_square = None;
        if piece == PieceType::Pawn && (to as i8 - from as i8).abs() == 16 {
            let behind = if side == Colour::White {
                from.offset(8)
            } else {
                from.offset(-8)
            }
            .expect("double push stays on the board");
            self.ep_square = Some(behind);
            self.key ^= EP_FILE_KEYS[behind.file() as usize];
        }

        self.clear_piece(side, piece, from);

        if m.is_capture() {
            let capture_sq = if m.is_ep() {
                let back = if side == Colour::White { -8 } else { 8 };
                to.offset(back).expect("en-passant capture square exists")
            } else {
                to
            };
            let captured = self.piece_map[capture_sq].expect("capture of an empty square");
            debug_assert!(captured != PieceType::King);
            undo.captured = Some(captured);
            self.clear_piece(side.flip(), captured, capture_sq);
            self.halfmove_clock = 0;
        }

        let placed = m.promotion_type().unwrap_or(piece);
        self.add_piece(side, placed, to);

        if m.is_castle() {
            self.move_castle_rook(side, to, false);
        }

        let new_rights = self
            .castle_perm
            .remove(CASTLING_RIGHTS_UPDATE[from].union(CASTLING_RIGHTS_UPDATE[to]));
        self.key ^= CASTLE_KEYS[self.castle_perm.hashkey_index()];
        self.key ^= CASTLE_KEYS[new_rights.hashkey_index()];
        self.castle_perm = new_rights;

        self.key ^= SIDE_KEY;
        self.side = side.flip();

        self.history[self.height] = undo;
        self.height += 1;

        #[cfg(debug_assertions)]
        self.check_validity().unwrap();
    }

    pub fn unmake_move(&mut self) {
        self.height -= 1;
        let undo = self.history[self.height];
        let m = undo.m.expect("no move to unmake");
        let from = m.from();
        let to = m.to();

        self.side = self.side.flip();
        let side = self.side;
        self.key ^= SIDE_KEY;

        self.key ^= CASTLE_KEYS[self.castle_perm.hashkey_index()];
        self.key ^= CASTLE_KEYS[undo.castle_perm.hashkey_index()];
        self.castle_perm = undo.castle_perm;

        if let Some(ep) = self.ep_square {
            self.key ^= EP_FILE_KEYS[ep.file() as usize];
        }
        if let Some(ep) = undo.ep_square {
            self.key ^= EP_FILE_KEYS[ep.file() as usize];
        }
        self.ep_square = undo.ep_square;

        self.halfmove_clock = undo.halfmove_clock;
        if side == Colour::Black {
            self.fullmove_number -= 1;
        }

        // promotions put the pawn back before restoring the from-square.
        let piece_on_to = self.piece_map[to].expect("unmake with an empty to-square");
        self.clear_piece(side, piece_on_to, to);
        let original = if m.is_promo() {
            PieceType::Pawn
        } else {
            piece_on_to
        };
        self.add_piece(side, original, from);

        if let Some(captured) = undo.captured {
            let capture_sq = if m.is_ep() {
                let back = if side == Colour::White { -8 } else { 8 };
                to.offset(back).expect("en-passant capture square exists")
            } else {
                to
            };
            self.add_piece(side.flip(), captured, capture_sq);
        }

        if m.is_castle() {
            self.move_castle_rook(side, to, true);
        }

        #[cfg(debug_assertions)]
        self.check_validity().unwrap();
    }

    /// The king's destination determines which rook slides where.
    fn move_castle_rook(&mut self, side: Colour, king_to: Square, reverse: bool) {
        let (corner, beside_king) = match king_to {
            Square::C1 => (Square::A1, Square::D1),
            Square::G1 => (Square::H1, Square::F1),
            Square::C8 => (Square::A8, Square::D8),
            Square::G8 => (Square::H8, Square::F8),
            _ => unreachable!("castle with king destination {king_to}"),
        };
        let (rook_from, rook_to) = if reverse {
            (beside_king, corner)
        } else {
            (corner, beside_king)
        };
        self.clear_piece(side, PieceType::Rook, rook_from);
        self.add_piece(side, PieceType::Rook, rook_to);
    }

    /// Finds the legal move matching a long-algebraic (UCI) move string.
    pub fn parse_uci(&self, text: &str) -> Result<Move, MoveParseError> {
        use crate::chess::board::movegen::{AllMoves, MoveList};

        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(MoveParseError::InvalidLength(text.len()));
        }
        let from: Square = text[0..2]
            .parse()
            .map_err(|_| MoveParseError::InvalidFromSquare(text[0..2].to_string()))?;
        let to: Square = text[2..4]
            .parse()
            .map_err(|_| MoveParseError::InvalidToSquare(text[2..4].to_string()))?;
        let promotion = match text.as_bytes().get(4) {
            None => None,
            Some(&c) => Some(match c {
                b'q' => PieceType::Queen,
                b'r' => PieceType::Rook,
                b'b' => PieceType::Bishop,
                b'n' => PieceType::Knight,
                _ => return Err(MoveParseError::InvalidPromotionPiece(c as char)),
            }),
        };

        let mut ml = MoveList::new();
        self.generate_moves::<AllMoves>(&mut ml);
        let result = ml
            .iter_moves()
            .copied()
            .find(|m| m.from() == from && m.to() == to && m.promotion_type() == promotion)
            .ok_or_else(|| MoveParseError::IllegalMove(text.to_string()));
        result
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let sq = Square::from_rank_file(
                    Rank::from_index(rank).unwrap(),
                    File::from_index(file).unwrap(),
                );
                match self.piece_map[sq] {
                    None => write!(f, " .")?,
                    Some(piece) => {
                        let colour = self.colour_at(sq).unwrap();
                        write!(f, " {}", piece.fen_char(colour))?;
                    }
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")?;
        writeln!(f)?;
        writeln!(f, "FEN: {}", self.fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::board::movegen::{AllMoves, MoveList};

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn fen_round_trip() {
        let fens = [
            Board::STARTING_FEN,
            KIWIPETE,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1",
            "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(board.fen(), fen);
        }
    }

    #[test]
    fn fen_missing_fields_default() {
        let board = Board::from_fen("K6k/8/8/8/8/8/8/8").unwrap();
        assert_eq!(board.turn(), Colour::White);
        assert_eq!(board.castling_rights(), CastlingRights::NONE);
        assert_eq!(board.ep_sq(), None);
        assert_eq!(board.fen(), "K6k/8/8/8/8/8/8/8 w - - 0 1");
    }

    #[test]
    fn fen_rejects_garbage() {
        assert!(Board::from_fen("").is_err());
        assert!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP").is_err());
        assert!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w - - 0 1").is_err());
        assert!(Board::from_fen("9/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(Board::from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err()); // kingless
        assert!(Board::from_fen("K6k/8/8/8/8/8/8/8 x - - 0 1").is_err());
        assert!(Board::from_fen("K6k/8/8/8/8/8/8/8 w KX - 0 1").is_err());
        assert!(Board::from_fen("K6k/8/8/8/8/8/8/8 w - z9 0 1").is_err());
    }

    #[test]
    fn failed_fen_load_leaves_position_untouched() {
        let mut board = Board::from_fen(KIWIPETE).unwrap();
        let before = board.clone();
        assert!(board.set_from_fen("garbage").is_err());
        assert_eq!(board, before);
    }

    #[test]
    fn parse_make_unmake_is_identity() {
        let mut board = Board::default();
        let before = board.clone();
        let m = board.parse_uci("e2e4").unwrap();
        board.make_move(m);
        assert_ne!(board, before);
        board.unmake_move();
        assert_eq!(board, before);
    }

    #[test]
    fn make_unmake_round_trips_every_legal_move() {
        let fens = [
            Board::STARTING_FEN,
            KIWIPETE,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1",
        ];
        for fen in fens {
            let mut board = Board::from_fen(fen).unwrap();
            let before = board.clone();
            let mut ml = MoveList::new();
            board.generate_moves::<AllMoves>(&mut ml);
            for &m in ml.iter_moves() {
                board.make_move(m);
                assert_eq!(
                    board.turn(),
                    before.turn().flip(),
                    "make must flip the side to move"
                );
                assert_eq!(board.zobrist_key(), board.generate_key(), "after {m} in {fen}");
                board.unmake_move();
                assert_eq!(board, before, "make/unmake of {m} diverged in {fen}");
            }
        }
    }

    #[test]
    fn no_generated_move_leaves_own_king_in_check() {
        let fens = [
            KIWIPETE,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        ];
        for fen in fens {
            let mut board = Board::from_fen(fen).unwrap();
            let mover = board.turn();
            let mut ml = MoveList::new();
            board.generate_moves::<AllMoves>(&mut ml);
            for &m in ml.iter_moves() {
                board.make_move(m);
                assert!(
                    !board.sq_attacked(board.king_sq(mover), board.turn()),
                    "{m} leaves the king en prise in {fen}"
                );
                board.unmake_move();
            }
        }
    }

    #[test]
    fn hash_stays_consistent_over_a_game() {
        let mut board = Board::default();
        for uci in [
            "e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "a7a6",
            "c1g5", "e7e6", "f2f4", "f8e7", "d1f3", "d8c7", "e1c1", "b8d7",
        ] {
            let m = board.parse_uci(uci).unwrap();
            board.make_move(m);
            assert_eq!(board.zobrist_key(), board.generate_key(), "after {uci}");
        }
        for _ in 0..18 {
            board.unmake_move();
            assert_eq!(board.zobrist_key(), board.generate_key());
        }
        assert_eq!(board, Board::default());
    }

    #[test]
    fn uci_round_trip_for_every_legal_move() {
        for fen in [KIWIPETE, "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8"] {
            let board = Board::from_fen(fen).unwrap();
            let mut ml = MoveList::new();
            board.generate_moves::<AllMoves>(&mut ml);
            for &m in ml.iter_moves() {
                assert_eq!(board.parse_uci(&m.to_string()), Ok(m));
            }
        }
    }

    #[test]
    fn parse_uci_rejects_bad_input() {
        let board = Board::default();
        assert!(matches!(
            board.parse_uci("e2"),
            Err(MoveParseError::InvalidLength(2))
        ));
        assert!(matches!(
            board.parse_uci("z2e4"),
            Err(MoveParseError::InvalidFromSquare(_))
        ));
        assert!(matches!(
            board.parse_uci("e2e5"),
            Err(MoveParseError::IllegalMove(_))
        ));
        assert!(matches!(
            board.parse_uci("e7e8x"),
            Err(MoveParseError::InvalidPromotionPiece('x'))
        ));
    }

    #[test]
    fn castling_updates_rights_and_rook() {
        let mut board = Board::from_fen(KIWIPETE).unwrap();
        let m = board.parse_uci("e1g1").unwrap();
        assert!(m.is_castle());
        board.make_move(m);
        assert_eq!(board.piece_at(Square::G1), Some(PieceType::King));
        assert_eq!(board.piece_at(Square::F1), Some(PieceType::Rook));
        assert_eq!(board.piece_at(Square::H1), None);
        assert!(!board
            .castling_rights()
            .contains(CastlingRights::WHITE_KINGSIDE));
        assert!(!board
            .castling_rights()
            .contains(CastlingRights::WHITE_QUEENSIDE));
        board.unmake_move();
        assert_eq!(board, Board::from_fen(KIWIPETE).unwrap());
    }

    #[test]
    fn promotion_updates_material() {
        let mut board = Board::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let white_material = board.material(Colour::White);
        let m = board.parse_uci("a7a8q").unwrap();
        board.make_move(m);
        assert_eq!(
            board.material(Colour::White),
            white_material - PieceType::Pawn.value() + PieceType::Queen.value()
        );
        assert_eq!(board.piece_at(Square::A8), Some(PieceType::Queen));
        board.unmake_move();
        assert_eq!(board.material(Colour::White), white_material);
    }

    #[test]
    fn en_passant_capture_removes_the_right_pawn() {
        let mut board =
            Board::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
                .unwrap();
        let before = board.clone();
        let m = board.parse_uci("e5f6").unwrap();
        assert!(m.is_ep());
        board.make_move(m);
        assert_eq!(board.piece_at(Square::F5), None, "captured pawn removed");
        assert_eq!(board.piece_at(Square::F6), Some(PieceType::Pawn));
        board.unmake_move();
        assert_eq!(board, before);
    }

    #[test]
    fn halfmove_clock_resets_on_pawn_moves_and_captures() {
        let mut board = Board::default();
        board.make_move(board.parse_uci("g1f3").unwrap());
        assert_eq!(board.halfmove_clock(), 1);
        board.make_move(board.parse_uci("e7e5").unwrap());
        assert_eq!(board.halfmove_clock(), 0);
        board.make_move(board.parse_uci("f3e5").unwrap());
        assert_eq!(board.halfmove_clock(), 0);
    }
}
