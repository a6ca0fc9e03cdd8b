//! Per-hand state carried in a node's range: the unit the CFR engine mutates.

use crate::cards::Card;
use crate::error::{GtoError, GtoResult};

/// An unordered pair of two distinct cards, canonically rendered as a
/// 4-character tag such as `AsKc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hole(pub Card, pub Card);

impl Hole {
    pub fn new(a: Card, b: Card) -> GtoResult<Hole> {
        if a == b {
            return Err(GtoError::InvalidHandSize);
        }
        Ok(Hole(a, b))
    }

    pub fn tag(&self) -> String {
        format!("{}{}", self.0, self.1)
    }

    /// True iff this hole shares a card with `other`.
    pub fn blocks(&self, other: &Hole) -> bool {
        self.0 == other.0 || self.0 == other.1 || self.1 == other.0 || self.1 == other.1
    }
}

/// An entry in a node's acting-player range. See `SPEC_FULL.md` §3.
#[derive(Debug, Clone)]
pub struct Hand {
    pub tag: String,
    pub hole: Hole,
    pub weighting: f64,
    pub reach_probability: f64,
    pub actions_taken: Vec<f64>,
    pub cumm_regrets: Vec<f64>,
    pub avg_strat: Vec<f64>,
    pub evs: Vec<f64>,
    pub next_strat: Vec<f64>,
}

impl Hand {
    pub fn new(hole: Hole, weighting: f64) -> Hand {
        Hand {
            tag: hole.tag(),
            hole,
            weighting,
            reach_probability: 1.0,
            actions_taken: Vec::new(),
            cumm_regrets: Vec::new(),
            avg_strat: Vec::new(),
            evs: Vec::new(),
            next_strat: Vec::new(),
        }
    }

    /// Resets strategy state to uniform over `num_actions`, zero regret, and
    /// an independent (never-aliased) `avg_strat` copy — see `SPEC_FULL.md`
    /// §9 "Average strategy mutation".
    pub fn initialize_strategy(&mut self, num_actions: usize) {
        let uniform = 1.0 / num_actions as f64;
        self.actions_taken = vec![uniform; num_actions];
        self.cumm_regrets = vec![0.0; num_actions];
        self.avg_strat = vec![uniform; num_actions];
        self.evs = vec![0.0; num_actions];
        self.next_strat = vec![0.0; num_actions];
    }

    pub fn fresh_copy(&self) -> Hand {
        Hand::new(self.hole, self.weighting)
    }
}
