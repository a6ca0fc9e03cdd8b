//! A Range: an insertion-ordered set of Hands, keyed by tag.

use crate::cards::parse_card;
use crate::error::{GtoError, GtoResult};
use crate::hand::{Hand, Hole};

#[derive(Debug, Clone, Default)]
pub struct Range {
    hands: Vec<Hand>,
}

impl Range {
    pub fn new() -> Range {
        Range { hands: Vec::new() }
    }

    pub fn from_hands(hands: Vec<Hand>) -> Range {
        Range { hands }
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    pub fn hands_mut(&mut self) -> &mut [Hand] {
        &mut self.hands
    }

    pub fn len(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    pub fn push(&mut self, hand: Hand) {
        self.hands.push(hand);
    }

    pub fn get(&self, tag: &str) -> Option<&Hand> {
        self.hands.iter().find(|h| h.tag == tag)
    }

    pub fn get_mut(&mut self, tag: &str) -> Option<&mut Hand> {
        self.hands.iter_mut().find(|h| h.tag == tag)
    }

    /// A fresh range holding the same holes and weightings as `self`, with
    /// every hand reset to its just-constructed (unplayed) state. Used when
    /// the tree builder stamps a copy of a starting range onto a new node.
    pub fn fresh_copy(&self) -> Range {
        Range::from_hands(self.hands.iter().map(Hand::fresh_copy).collect())
    }

    /// Initializes every hand's strategy arrays to uniform-over-`num_actions`.
    pub fn initialize_strategies(&mut self, num_actions: usize) {
        if num_actions == 0 {
            return;
        }
        for hand in &mut self.hands {
            hand.initialize_strategy(num_actions);
        }
    }

    /// `range_action_freqs` (`SPEC_FULL.md` §4.7): the reach- and
    /// weight-weighted marginal action distribution of the whole range,
    /// normalized to sum to 1. Returns the zero vector if every hand has
    /// zero reach (the range has been pruned out entirely at this node).
    pub fn action_freqs(&self) -> Vec<f64> {
        let num_actions = match self.hands.first() {
            Some(h) => h.actions_taken.len(),
            None => return Vec::new(),
        };
        let mut freqs = vec![0.0; num_actions];
        for hand in &self.hands {
            let w = hand.weighting * hand.reach_probability;
            for i in 0..num_actions {
                freqs[i] += w * hand.actions_taken[i];
            }
        }
        let total: f64 = freqs.iter().sum();
        if total == 0.0 {
            return vec![0.0; num_actions];
        }
        for f in &mut freqs {
            *f /= total;
        }
        freqs
    }
}

/// Parses the `§6` input-file range grammar: a comma-separated list of
/// entries, each either a bare 4-char tag (`AsKc`) or `tag:weight`
/// (`AsKc:0.5`), weight in `(0, 1]`. Whitespace inside an entry is stripped.
/// Distinct from the teacher's `ranges::parse_range`, which parses shorthand
/// notation (`AKs+`, `22-99`) for a 169-hand grid — this grammar is the
/// exact-combo list the solver's input format actually uses.
pub fn parse_range_line(line: &str) -> GtoResult<Range> {
    let mut range = Range::new();
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(range);
    }
    for entry in trimmed.split(',') {
        let stripped: String = entry.chars().filter(|c| !c.is_whitespace()).collect();
        if stripped.is_empty() {
            continue;
        }
        let (tag, weight) = match stripped.split_once(':') {
            Some((t, w)) => {
                let weight: f64 = w
                    .parse()
                    .map_err(|_| GtoError::InvalidValue(w.to_string()))?;
                (t, weight)
            }
            None => (stripped.as_str(), 1.0),
        };
        if !(0.0 < weight && weight <= 1.0) {
            return Err(GtoError::InvalidValue(weight.to_string()));
        }
        if tag.len() != 4 {
            return Err(GtoError::InvalidHandNotation(tag.to_string()));
        }
        let a = parse_card(&tag[0..2])?;
        let b = parse_card(&tag[2..4])?;
        let hole = Hole::new(a, b)?;
        range.push(Hand::new(hole, weight));
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_bare_tags_with_default_weight() {
        let r = parse_range_line("AsAc, KsKc").unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.get("AsAc").unwrap().weighting, 1.0);
        assert_eq!(r.get("KsKc").unwrap().weighting, 1.0);
    }

    #[test]
    fn parses_weighted_entries() {
        let r = parse_range_line("AsAc:0.5, 2s2c").unwrap();
        assert_eq!(r.get("AsAc").unwrap().weighting, 0.5);
        assert_eq!(r.get("2s2c").unwrap().weighting, 1.0);
    }

    #[test]
    fn empty_line_is_empty_range() {
        let r = parse_range_line("").unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn rejects_weight_out_of_range() {
        assert!(parse_range_line("AsAc:0").is_err());
        assert!(parse_range_line("AsAc:1.5").is_err());
    }

    #[test]
    fn action_freqs_normalizes_and_zero_reach_is_zero_vector() {
        let mut r = parse_range_line("AsAc, KsKc").unwrap();
        r.initialize_strategies(2);
        let freqs = r.action_freqs();
        assert_relative_eq!(freqs[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(freqs[1], 0.5, epsilon = 1e-9);

        for hand in r.hands_mut() {
            hand.reach_probability = 0.0;
        }
        let freqs = r.action_freqs();
        assert_eq!(freqs, vec![0.0, 0.0]);
    }
}
