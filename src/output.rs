//! Result Sink (`SPEC_FULL.md` §6, ambient stack component 7): serializes a
//! solved `Tree` into the JSON array of node records the spec's wire format
//! names, via `serde`/`serde_json` in the manner of the teacher's
//! `FlopSolution`/`FlopNodeStrategy` serde structs (`flop_solver.rs`).

use std::ops::Index;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::tree::{Action, NodeKind, Tree};

/// An insertion-order-preserving hand-tag map. `std::collections::HashMap`
/// would serialize its entries in randomized iteration order, breaking the
/// "insertion order is preserved for stable output" guarantee (`SPEC_FULL.md`
/// §3); this is built and walked in `node.player_range.hands()` order
/// instead, the way the teacher's own `FlopNodeStrategy` keeps its per-combo
/// strategy vectors positionally ordered (`flop_solver.rs`).
#[derive(Debug, Clone, Default)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    fn new() -> Self {
        OrderedMap(Vec::new())
    }

    fn insert(&mut self, key: String, value: V) {
        self.0.push((key, value));
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl<V> Index<&str> for OrderedMap<V> {
    type Output = V;

    fn index(&self, key: &str) -> &V {
        self.get(key)
            .unwrap_or_else(|| panic!("no hand tag `{key}` in record"))
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One entry of the `§6` output array. Field names are the wire tags
/// literally, via `#[serde(rename = "...")]` rather than renaming the Rust
/// identifiers themselves.
#[derive(Debug, Serialize)]
pub struct NodeRecord {
    pub id: usize,
    #[serde(rename = "atn-sq")]
    pub action_seq: Vec<String>,
    #[serde(rename = "avl-acs")]
    pub legal_actions: Option<Vec<String>>,
    #[serde(rename = "rg-strat")]
    pub range_strategy: OrderedMap<Vec<f64>>,
    #[serde(rename = "rg-EVs")]
    pub range_evs: OrderedMap<f64>,
    #[serde(rename = "act-EVs")]
    pub action_evs: OrderedMap<Vec<f64>>,
}

fn render_actions(actions: &[Action]) -> Vec<String> {
    actions.iter().map(|a| a.to_string()).collect()
}

/// Builds the `§6` node-record array in the tree's construction order (the
/// root, whose `atn-sq` is empty, is first). Terminals get `avl-acs: null`
/// and a single-element `rg-EVs`/`act-EVs` per hand (there is no `rg-strat`
/// entry to report for a terminal beyond the degenerate single-action case,
/// so it is emitted as an empty-vector strategy, matching "no decision made
/// here" rather than omitting the hand entirely).
pub fn build_records(tree: &Tree) -> Vec<NodeRecord> {
    tree.nodes
        .iter()
        .map(|node| {
            let legal_actions = match &node.kind {
                NodeKind::Decision { legal_actions, .. } => Some(render_actions(legal_actions)),
                _ => None,
            };

            let mut range_strategy = OrderedMap::new();
            let mut range_evs = OrderedMap::new();
            let mut action_evs = OrderedMap::new();

            for hand in node.player_range.hands() {
                let strat = if matches!(node.kind, NodeKind::Decision { .. }) {
                    hand.avg_strat.clone()
                } else {
                    Vec::new()
                };
                let rg_ev: f64 = if strat.is_empty() {
                    hand.evs.first().copied().unwrap_or(0.0)
                } else {
                    strat.iter().zip(hand.evs.iter()).map(|(s, v)| s * v).sum()
                };

                range_strategy.insert(hand.tag.clone(), strat);
                range_evs.insert(hand.tag.clone(), rg_ev);
                action_evs.insert(hand.tag.clone(), hand.evs.clone());
            }

            NodeRecord {
                id: node.id,
                action_seq: render_actions(&node.action_seq),
                legal_actions,
                range_strategy,
                range_evs,
                action_evs,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::cards::parse_board;
    use crate::cfr::solve;
    use crate::range::parse_range_line;
    use crate::tree::{build_tree, TreeConfig};

    #[test]
    fn root_record_has_empty_action_sequence_and_terminals_have_no_legal_actions() {
        let cfg = TreeConfig {
            starting_pot: 10.0,
            starting_stack: 50.0,
            oop_bets: Vec::new(),
            ip_bets: Vec::new(),
            oop_raises: Vec::new(),
            ip_raises: Vec::new(),
            all_in_threshold: 70.0,
        };
        let oop = parse_range_line("AsAc").unwrap();
        let ip = parse_range_line("KsKc").unwrap();
        let mut tree = build_tree(&cfg, &oop, &ip);
        let board = parse_board("2c2h2s2d3h").unwrap();
        solve(&mut tree, &board, 5).unwrap();

        let records = build_records(&tree);
        assert_eq!(records[0].id, 0);
        assert!(records[0].action_seq.is_empty());
        assert!(records[0].legal_actions.is_some());

        let terminal = records.last().unwrap();
        assert!(terminal.legal_actions.is_none());
        assert!(terminal.range_evs.contains_key("KsKc"));
    }

    #[test]
    fn root_strategy_sums_to_one_per_hand() {
        let cfg = TreeConfig {
            starting_pot: 10.0,
            starting_stack: 50.0,
            oop_bets: vec![crate::tree::SizeSpec::Pct(50.0)],
            ip_bets: Vec::new(),
            oop_raises: Vec::new(),
            ip_raises: Vec::new(),
            all_in_threshold: 70.0,
        };
        let oop = parse_range_line("AsAc").unwrap();
        let ip = parse_range_line("KsKc").unwrap();
        let mut tree = build_tree(&cfg, &oop, &ip);
        let board = parse_board("2c2h2s2d3h").unwrap();
        solve(&mut tree, &board, 5).unwrap();

        let records = build_records(&tree);
        let root_strat = &records[0].range_strategy["AsAc"];
        let sum: f64 = root_strat.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn serializes_to_the_wire_field_names() {
        let cfg = TreeConfig {
            starting_pot: 10.0,
            starting_stack: 50.0,
            oop_bets: Vec::new(),
            ip_bets: Vec::new(),
            oop_raises: Vec::new(),
            ip_raises: Vec::new(),
            all_in_threshold: 70.0,
        };
        let oop = parse_range_line("AsAc").unwrap();
        let ip = parse_range_line("KsKc").unwrap();
        let mut tree = build_tree(&cfg, &oop, &ip);
        let board = parse_board("2c2h2s2d3h").unwrap();
        solve(&mut tree, &board, 3).unwrap();

        let records = build_records(&tree);
        let json = serde_json::to_string(&records).unwrap();
        assert!(json.contains("\"atn-sq\""));
        assert!(json.contains("\"avl-acs\""));
        assert!(json.contains("\"rg-strat\""));
        assert!(json.contains("\"rg-EVs\""));
        assert!(json.contains("\"act-EVs\""));
    }

    #[test]
    fn record_fields_preserve_range_insertion_order() {
        let cfg = TreeConfig {
            starting_pot: 10.0,
            starting_stack: 50.0,
            oop_bets: Vec::new(),
            ip_bets: Vec::new(),
            oop_raises: Vec::new(),
            ip_raises: Vec::new(),
            all_in_threshold: 70.0,
        };
        let oop = parse_range_line("AsAc, 7h2d, KsKd").unwrap();
        let ip = parse_range_line("QsQc").unwrap();
        let mut tree = build_tree(&cfg, &oop, &ip);
        let board = parse_board("2c2h2s2d3h").unwrap();
        solve(&mut tree, &board, 3).unwrap();

        let records = build_records(&tree);
        let root = &records[0];
        let tags: Vec<&str> = root.range_evs.0.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(tags, vec!["AsAc", "7h2d", "KsKd"]);

        // The JSON itself must reproduce that order, not a rehashed one.
        let json = serde_json::to_string(root).unwrap();
        let as_ac_pos = json.find("AsAc").unwrap();
        let kd_pos = json.find("KsKd").unwrap();
        assert!(as_ac_pos < kd_pos, "json={json}");
    }
}
