pub mod board;
pub mod chessmove;
pub mod magic;
pub mod piece;
pub mod squareset;
pub mod types;
