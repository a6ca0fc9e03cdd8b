//! Hand Evaluator Adapter.
//!
//! Wraps `hand_evaluator::evaluate_hand` (a Cactus-Kev-style 5-from-7 evaluator
//! whose native `HandResult` ordering is higher-is-stronger) behind the
//! convention the rest of this crate's core is written against: an integer
//! rank where **lower is stronger**. Pure function, no I/O, no global state.

use crate::cards::Card;
use crate::error::GtoResult;
use crate::hand_evaluator::evaluate_hand;

/// `rank(board, hole)`: lower return value means a stronger hand.
///
/// `board` must be exactly five cards and share no card with `hole`; callers
/// (the equity oracle) are responsible for that invariant, matching the
/// adapter contract — this function does no blocker checking itself.
pub fn rank(board: &[Card], hole: &(Card, Card)) -> GtoResult<u64> {
    let hole_cards = [hole.0, hole.1];
    let result = evaluate_hand(&hole_cards, board)?;

    // Fold category + up to 5 kickers into one big-endian base-16 integer so
    // that comparing the composite score reproduces HandResult's Ord exactly,
    // then invert it: the strongest possible hand (royal flush, no kickers
    // needed) maps to the smallest integer.
    let mut score: u64 = result.category as u64;
    for &k in result.kickers.iter().take(5) {
        score = (score << 4) | (k as u64 & 0xF);
    }
    // Left-pad so category always occupies the highest nibbles regardless of
    // how many kickers this category produced.
    let kicker_nibbles = result.kickers.len().min(5) as u32;
    score <<= 4 * (5 - kicker_nibbles);

    Ok(u64::MAX - score)
}

/// Convenience used by tests: true iff `hole_a` beats `hole_b` on `board`.
pub fn beats(board: &[Card], hole_a: &(Card, Card), hole_b: &(Card, Card)) -> GtoResult<bool> {
    Ok(rank(board, hole_a)? < rank(board, hole_b)?)
}
