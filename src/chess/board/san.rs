use crate::{
    chess::{
        board::{
            movegen::{AllMoves, MoveList},
            Board,
        },
        chessmove::Move,
        piece::PieceType,
        types::{File, Rank, Square},
    },
    errors::SanError,
};

impl Board {
    /// Parses a short-algebraic move against the current position. Accepted
    /// for test and EPD input only; the protocol speaks long algebraic.
    /// Succeeds iff exactly one legal move matches the description.
    pub fn parse_san(&self, san: &str) -> Result<Move, SanError> {
        let stripped = san.trim_end_matches(['+', '#', '!', '?']);
        if stripped.is_empty() || !stripped.is_ascii() {
            return Err(SanError::InvalidSan(san.to_string()));
        }

        let mut ml = MoveList::new();
        self.generate_moves::<AllMoves>(&mut ml);

        if let Some(kingside) = match stripped {
            "O-O" | "0-0" => Some(true),
            "O-O-O" | "0-0-0" => Some(false),
            _ => None,
        } {
            let wanted_file = if kingside { File::G } else { File::C };
            return ml
                .iter_moves()
                .copied()
                .find(|m| m.is_castle() && m.to().file() == wanted_file)
                .ok_or_else(|| SanError::IllegalMove(san.to_string()));
        }

        let mut rest = stripped.as_bytes();

        let piece = match rest.first() {
            Some(c @ (b'N' | b'B' | b'R' | b'Q' | b'K')) => {
                let piece = PieceType::from_symbol(*c).unwrap();
                rest = &rest[1..];
                piece
            }
            _ => PieceType::Pawn,
        };

        let promotion = if let [head @ .., b'=', promo] = rest {
            if piece != PieceType::Pawn {
                return Err(SanError::InvalidSan(san.to_string()));
            }
            let promo = PieceType::from_symbol(promo.to_ascii_uppercase())
                .filter(|p| p.legal_promo())
                .ok_or_else(|| SanError::InvalidSan(san.to_string()))?;
            rest = head;
            Some(promo)
        } else {
            None
        };

        let [middle @ .., to_file, to_rank] = rest else {
            return Err(SanError::InvalidSan(san.to_string()));
        };
        let (Some(to_file), Some(to_rank)) = (
            to_file.checked_sub(b'a').and_then(File::from_index),
            to_rank.checked_sub(b'1').and_then(Rank::from_index),
        ) else {
            return Err(SanError::InvalidSan(san.to_string()));
        };
        let to = Square::from_rank_file(to_rank, to_file);

        let mut is_capture = false;
        let mut from_file = None;
        let mut from_rank = None;
        for &c in middle {
            match c {
                b'x' if !is_capture => is_capture = true,
                b'a'..=b'h' if from_file.is_none() => from_file = File::from_index(c - b'a'),
                b'1'..=b'8' if from_rank.is_none() => from_rank = Rank::from_index(c - b'1'),
                _ => return Err(SanError::InvalidSan(san.to_string())),
            }
        }

        let mut matches = ml.iter_moves().copied().filter(|m| {
            m.to() == to
                && self.piece_map[m.from()] == Some(piece)
                && m.promotion_type() == promotion
                && m.is_capture() == is_capture
                && !m.is_castle()
                && from_file.map_or(true, |f| m.from().file() == f)
                && from_rank.map_or(true, |r| m.from().rank() == r)
        });

        match (matches.next(), matches.next()) {
            (Some(m), None) => Ok(m),
            (None, _) => Err(SanError::IllegalMove(san.to_string())),
            (Some(_), Some(_)) => Err(SanError::AmbiguousMove(san.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pawn_pushes_and_captures() {
        let board = Board::default();
        assert_eq!(board.parse_san("e4").unwrap(), board.parse_uci("e2e4").unwrap());
        let board =
            Board::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        assert_eq!(board.parse_san("exd5").unwrap(), board.parse_uci("e4d5").unwrap());
        assert!(board.parse_san("exf5").is_err());
    }

    #[test]
    fn piece_moves_and_decorations() {
        let board = Board::default();
        assert_eq!(board.parse_san("Nf3").unwrap(), board.parse_uci("g1f3").unwrap());
        assert_eq!(board.parse_san("Nf3!?").unwrap(), board.parse_uci("g1f3").unwrap());
        assert!(board.parse_san("Ne4").is_err());
    }

    #[test]
    fn disambiguation_by_file_or_rank() {
        // Knights on c3 and g3 both reach e4: file disambiguation.
        let board = Board::from_fen("k7/8/8/8/8/2N3N1/8/K7 w - - 0 1").unwrap();
        assert!(matches!(board.parse_san("Ne4"), Err(SanError::AmbiguousMove(_))));
        assert_eq!(board.parse_san("Nce4").unwrap(), board.parse_uci("c3e4").unwrap());
        assert_eq!(board.parse_san("Nge4").unwrap(), board.parse_uci("g3e4").unwrap());

        // Rooks on a1 and a5: rank disambiguation.
        let board = Board::from_fen("7k/8/8/R7/8/8/8/R3K3 w - - 0 1").unwrap();
        assert_eq!(board.parse_san("R1a3").unwrap(), board.parse_uci("a1a3").unwrap());
        assert_eq!(board.parse_san("R5a3").unwrap(), board.parse_uci("a5a3").unwrap());
    }

    #[test]
    fn castling_notation() {
        let board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(board.parse_san("O-O").unwrap(), board.parse_uci("e1g1").unwrap());
        assert_eq!(board.parse_san("0-0-0").unwrap(), board.parse_uci("e1c1").unwrap());
    }

    #[test]
    fn promotions() {
        let board = Board::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert_eq!(board.parse_san("a8=Q").unwrap(), board.parse_uci("a7a8q").unwrap());
        assert_eq!(board.parse_san("a8=N+").unwrap(), board.parse_uci("a7a8n").unwrap());
        assert!(board.parse_san("a8=K").is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let board = Board::default();
        for bad in ["", "x", "Qq9", "e9", "Pe4=", "O-O-O-O"] {
            assert!(board.parse_san(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
