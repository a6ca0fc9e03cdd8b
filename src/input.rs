//! Input Parser (`SPEC_FULL.md` §6, ambient stack component 6): reads the
//! 12-line plain-text format into a validated `RiverInput`, rejecting every
//! malformed field before any tree is built (`SPEC_FULL.md` §7).
//!
//! Grounded on `cards::parse_card`/`parse_board` for fields 3-5 and on
//! `tree::parse_sizing_menu` for fields 6-9; this module's own job is just
//! line-splitting, numeric parsing, and wiring the twelve fields into
//! `tree::TreeConfig` plus the two starting ranges.

use crate::cards::parse_board;
use crate::error::{GtoError, GtoResult};
use crate::range::{parse_range_line, Range};
use crate::tree::{parse_sizing_menu, TreeConfig};

pub struct RiverInput {
    pub board: Vec<crate::cards::Card>,
    pub oop_range: Range,
    pub ip_range: Range,
    pub tree_config: TreeConfig,
    pub max_iterations: u64,
    pub target_exploitability: f64,
}

fn line(lines: &[&str], idx: usize) -> GtoResult<String> {
    lines
        .get(idx)
        .map(|s| s.to_string())
        .ok_or_else(|| GtoError::InvalidInputLine {
            line: idx + 1,
            reason: "missing line".to_string(),
        })
}

fn parse_decimal(lines: &[&str], idx: usize) -> GtoResult<f64> {
    let raw = line(lines, idx)?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GtoError::InvalidInputLine {
            line: idx + 1,
            reason: format!("expected a decimal number, got '{}'", raw.trim()),
        })
}

/// Parses the `§6` 12-line input file. The file may use either `\n` or
/// `\r\n` line endings; trailing blank lines beyond the twelfth are ignored.
pub fn parse_input(text: &str) -> GtoResult<RiverInput> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 12 {
        return Err(GtoError::InvalidInputLine {
            line: lines.len() + 1,
            reason: format!("expected 12 lines, got {}", lines.len()),
        });
    }

    let pot = parse_decimal(&lines, 0)?;
    let stack = parse_decimal(&lines, 1)?;

    let oop_range = parse_range_line(&line(&lines, 2)?).map_err(|e| GtoError::InvalidInputLine {
        line: 3,
        reason: e.to_string(),
    })?;
    let ip_range = parse_range_line(&line(&lines, 3)?).map_err(|e| GtoError::InvalidInputLine {
        line: 4,
        reason: e.to_string(),
    })?;

    let board_text = line(&lines, 4)?;
    let board_trimmed = board_text.trim();
    if board_trimmed.len() != 10 {
        return Err(GtoError::InvalidInputLine {
            line: 5,
            reason: format!("board must be exactly 10 characters, got {}", board_trimmed.len()),
        });
    }
    let board = parse_board(board_trimmed).map_err(|e| GtoError::InvalidInputLine {
        line: 5,
        reason: e.to_string(),
    })?;
    if board.len() != 5 {
        return Err(GtoError::InvalidInputLine {
            line: 5,
            reason: format!("board must name exactly 5 cards, got {}", board.len()),
        });
    }
    {
        let mut seen = std::collections::HashSet::new();
        for c in &board {
            if !seen.insert(*c) {
                return Err(GtoError::InvalidInputLine {
                    line: 5,
                    reason: format!("duplicate card {} on board", c),
                });
            }
        }
    }

    let oop_bets = parse_sizing_menu(&line(&lines, 5)?).map_err(|e| GtoError::InvalidInputLine {
        line: 6,
        reason: e.to_string(),
    })?;
    let ip_bets = parse_sizing_menu(&line(&lines, 6)?).map_err(|e| GtoError::InvalidInputLine {
        line: 7,
        reason: e.to_string(),
    })?;
    let oop_raises = parse_sizing_menu(&line(&lines, 7)?).map_err(|e| GtoError::InvalidInputLine {
        line: 8,
        reason: e.to_string(),
    })?;
    let ip_raises = parse_sizing_menu(&line(&lines, 8)?).map_err(|e| GtoError::InvalidInputLine {
        line: 9,
        reason: e.to_string(),
    })?;

    let all_in_threshold = parse_decimal(&lines, 9)?;
    if !(0.0..=100.0).contains(&all_in_threshold) {
        return Err(GtoError::InvalidInputLine {
            line: 10,
            reason: format!("all-in threshold must be within [0, 100], got {}", all_in_threshold),
        });
    }

    let max_iterations_raw = line(&lines, 10)?;
    let max_iterations: u64 = max_iterations_raw
        .trim()
        .parse()
        .map_err(|_| GtoError::InvalidInputLine {
            line: 11,
            reason: format!("expected an integer >= 1, got '{}'", max_iterations_raw.trim()),
        })?;
    if max_iterations < 1 {
        return Err(GtoError::InvalidInputLine {
            line: 11,
            reason: "maximum iterations must be >= 1".to_string(),
        });
    }

    let target_exploitability = parse_decimal(&lines, 11)?;

    Ok(RiverInput {
        board,
        oop_range,
        ip_range,
        tree_config: TreeConfig {
            starting_pot: pot,
            starting_stack: stack,
            oop_bets,
            ip_bets,
            oop_raises,
            ip_raises,
            all_in_threshold,
        },
        max_iterations,
        target_exploitability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        [
            "10", "50", "AsAc", "KsKc", "2c2h2s2d3h", "", "", "", "", "70", "10", "0.5",
        ]
        .join("\n")
    }

    #[test]
    fn parses_a_well_formed_twelve_line_file() {
        let input = parse_input(&sample()).unwrap();
        assert_eq!(input.tree_config.starting_pot, 10.0);
        assert_eq!(input.tree_config.starting_stack, 50.0);
        assert_eq!(input.oop_range.len(), 1);
        assert_eq!(input.ip_range.len(), 1);
        assert_eq!(input.board.len(), 5);
        assert_eq!(input.max_iterations, 10);
        assert_eq!(input.target_exploitability, 0.5);
    }

    #[test]
    fn rejects_too_few_lines() {
        assert!(parse_input("10\n50\n").is_err());
    }

    #[test]
    fn rejects_malformed_board_length() {
        let mut lines: Vec<&str> = sample().lines().collect();
        lines[4] = "2c2h2s2d";
        let text = lines.join("\n");
        assert!(parse_input(&text).is_err());
    }

    #[test]
    fn rejects_non_numeric_pot() {
        let mut lines: Vec<&str> = sample().lines().collect();
        lines[0] = "not-a-number";
        let text = lines.join("\n");
        assert!(parse_input(&text).is_err());
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let mut lines: Vec<&str> = sample().lines().collect();
        lines[2] = "AsAc:1.5";
        let text = lines.join("\n");
        assert!(parse_input(&text).is_err());
    }

    #[test]
    fn empty_sizing_lines_are_legal() {
        let input = parse_input(&sample()).unwrap();
        assert!(input.tree_config.oop_bets.is_empty());
        assert!(input.tree_config.ip_raises.is_empty());
    }
}
