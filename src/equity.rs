//! Equity Oracle: exact (never Monte Carlo) showdown equity of one hand
//! against a weighted, blocker-filtered opponent range on a fixed board.
//!
//! The teacher's `equity_vs_hand`/`equity_vs_range` simulate via `rayon` +
//! `rand`; that's the right call when the board isn't fully known yet (flop,
//! turn). Here the board is five known cards, so every opponent combo's rank
//! is a deterministic lookup — enumeration is both exact and cheaper than
//! simulating it.

use crate::cards::Card;
use crate::error::GtoResult;
use crate::evaluator::rank;
use crate::hand::Hole;
use crate::range::Range;

/// `equity(hand, opp_range)` — `SPEC_FULL.md` §4.2.
///
/// Returns the hero's expected share of the pot against `opp_range`: 1 for a
/// certain win, 0 for a certain loss, 0.5 splits chops and 0.5 as the
/// fully-blocked fallback (never surfaced as an error — see `error.rs`).
pub fn equity(board: &[Card], hero: &Hole, opp_range: &Range) -> GtoResult<f64> {
    let r_hero = rank(board, &(hero.0, hero.1))?;

    let mut weight_total = 0.0;
    let mut equity_total = 0.0;

    for opp in opp_range.hands() {
        if hero.blocks(&opp.hole) {
            continue;
        }
        let w = opp.weighting * opp.reach_probability;
        weight_total += w;

        let r_opp = rank(board, &(opp.hole.0, opp.hole.1))?;
        if r_opp > r_hero {
            equity_total += w;
        } else if r_opp == r_hero {
            equity_total += w / 2.0;
        }
    }

    if weight_total > 0.0 {
        Ok(equity_total / weight_total)
    } else {
        Ok(0.5)
    }
}
