//! Board-rules collaborator.
//!
//! Move legality belongs to an external rules engine; the session only
//! replays the peer's moves through it.

use std::collections::HashMap;

use crate::domain::{Color, Square};

/// A move the rules engine accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub from: Square,
    pub to: Square,
    pub color: Color,
    /// Whether an opposing piece was removed
    pub captured: bool,
}

pub trait RulesEngine: Send {
    /// Destinations available to the piece on `from`
    fn legal_moves(&self, from: Square) -> Vec<Square>;

    /// Apply the move, or `None` if it is not legal
    fn apply_move(&mut self, from: Square, to: Square) -> Option<MoveResult>;

    fn is_game_over(&self) -> bool;

    fn is_check(&self) -> bool;

    fn turn(&self) -> Color;
}

/// Turn-order and occupancy bookkeeping without piece movement rules.
///
/// Used by the demo binary and tests where a full chess engine is not
/// available. A move is legal if it starts on a piece of the side to move
/// and does not land on that side's own piece.
#[derive(Debug, Clone)]
pub struct OccupancyRules {
    board: HashMap<Square, Color>,
    turn: Color,
}

impl Default for OccupancyRules {
    fn default() -> Self {
        let mut board = HashMap::new();
        for square in Square::all() {
            match square.rank() {
                0 | 1 => {
                    board.insert(square, Color::White);
                }
                6 | 7 => {
                    board.insert(square, Color::Black);
                }
                _ => {}
            }
        }
        Self {
            board,
            turn: Color::White,
        }
    }
}

impl OccupancyRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn piece_at(&self, square: Square) -> Option<Color> {
        self.board.get(&square).copied()
    }
}

impl RulesEngine for OccupancyRules {
    fn legal_moves(&self, from: Square) -> Vec<Square> {
        if self.piece_at(from) != Some(self.turn) {
            return Vec::new();
        }
        Square::all()
            .filter(|to| *to != from && self.piece_at(*to) != Some(self.turn))
            .collect()
    }

    fn apply_move(&mut self, from: Square, to: Square) -> Option<MoveResult> {
        if !self.legal_moves(from).contains(&to) {
            return None;
        }
        let color = self.board.remove(&from)?;
        let captured = self.board.insert(to, color).is_some();
        self.turn = color.opposite();
        Some(MoveResult {
            from,
            to,
            color,
            captured,
        })
    }

    fn is_game_over(&self) -> bool {
        // One side has no pieces left
        !self.board.values().any(|c| *c == Color::White)
            || !self.board.values().any(|c| *c == Color::Black)
    }

    fn is_check(&self) -> bool {
        false
    }

    fn turn(&self) -> Color {
        self.turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_moves_alternate_between_sides() {
        // テスト項目: 白から始まり、手番と異なる色の駒は動かせない
        // given (前提条件):
        let mut rules = OccupancyRules::new();

        // when (操作):
        let black_first = rules.apply_move(square("e7"), square("e5"));
        let white = rules.apply_move(square("e2"), square("e4"));
        let white_again = rules.apply_move(square("d2"), square("d4"));
        let black = rules.apply_move(square("e7"), square("e5"));

        // then (期待する結果):
        assert_eq!(black_first, None);
        assert_eq!(white.map(|m| m.color), Some(Color::White));
        assert_eq!(white_again, None);
        assert_eq!(black.map(|m| m.color), Some(Color::Black));
        assert_eq!(rules.turn(), Color::White);
    }

    #[test]
    fn test_cannot_capture_own_piece() {
        // テスト項目: 自分の駒があるマスへは移動できず、相手の駒は取れる
        // given (前提条件):
        let mut rules = OccupancyRules::new();

        // when (操作):
        let onto_own = rules.legal_moves(square("e2")).contains(&square("e1"));
        let capture = rules.apply_move(square("e2"), square("e7"));

        // then (期待する結果):
        assert!(!onto_own);
        assert!(capture.unwrap().captured);
        assert_eq!(rules.piece_at(square("e7")), Some(Color::White));
        assert!(!rules.is_game_over());
    }
}
