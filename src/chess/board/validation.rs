#![cfg(debug_assertions)]

use crate::chess::{
    board::{Board, MAX_PLY},
    piece::{Colour, PieceType},
    squareset::SquareSet,
    types::Rank,
};

pub type PositionValidityError = String;

impl Board {
    /// Debug-build audit of the position invariants: bitboard/mailbox
    /// coherence, king bookkeeping, material tallies, and the incremental
    /// hash against a from-scratch recomputation.
    pub fn check_validity(&self) -> Result<(), PositionValidityError> {
        if (self.colours[Colour::White] & self.colours[Colour::Black]).non_empty() {
            return Err("colour sets overlap".to_string());
        }
        if self.colours[Colour::White] | self.colours[Colour::Black] != self.occupied {
            return Err("colour sets do not union to the occupancy".to_string());
        }

        for colour in [Colour::White, Colour::Black] {
            let mut union = SquareSet::EMPTY;
            for piece in PieceType::all() {
                let bb = self.pieces[colour][piece];
                if (union & bb).non_empty() {
                    return Err(format!("{colour} piece sets overlap at {piece}"));
                }
                union |= bb;
            }
            if union != self.colours[colour] {
                return Err(format!("{colour} piece sets do not union to its colour set"));
            }

            if self.pieces[colour][PieceType::King].count() != 1 {
                return Err(format!(
                    "{colour} has {} kings",
                    self.pieces[colour][PieceType::King].count()
                ));
            }
            let king_sq = self.king_squares[colour];
            if !self.pieces[colour][PieceType::King].contains_square(king_sq) {
                return Err(format!(
                    "{colour} king square cache points at {king_sq}, which holds no king"
                ));
            }

            let material: i32 = self.colours[colour]
                .into_iter()
                .map(|sq| self.piece_map[sq].map_or(0, PieceType::value))
                .sum();
            if material != self.material[colour] {
                return Err(format!(
                    "{colour} material is {}, expected {material}",
                    self.material[colour]
                ));
            }
        }

        for sq in crate::chess::types::Square::all() {
            let mapped = self.piece_map[sq];
            let from_bitboards = self.colour_at(sq).map(|colour| {
                PieceType::all()
                    .find(|&piece| self.pieces[colour][piece].contains_square(sq))
                    .expect("colour set bit without a piece set bit")
            });
            if mapped != from_bitboards {
                return Err(format!(
                    "square {sq} maps to {mapped:?} but the bitboards say {from_bitboards:?}"
                ));
            }
        }

        if let Some(ep) = self.ep_square {
            let expected = match self.turn() {
                Colour::White => Rank::Six,
                Colour::Black => Rank::Three,
            };
            if ep.rank() != expected {
                return Err(format!("en passant target {ep} on the wrong rank"));
            }
        }

        if self.zobrist_key() != self.generate_key() {
            return Err(format!(
                "incremental key {:016x} disagrees with recomputation {:016x}",
                self.zobrist_key(),
                self.generate_key()
            ));
        }

        if self.height() >= MAX_PLY {
            return Err(format!("undo stack height {} out of bounds", self.height()));
        }

        Ok(())
    }
}
