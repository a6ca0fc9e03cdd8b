//! Human-facing status/error text (ambient stack component 10): `println!`/
//! `eprintln!` dressed with `colored`, matching the teacher's own choice not
//! to pull in a structured logging crate.

use colored::Colorize;

use crate::cards::{Card, Suit};

/// Renders a board with suit-colored cards, for the CLI's pre-solve echo.
pub fn board_display(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|card| {
            let rank = card.rank.to_char();
            let symbol = card.suit.symbol();
            match card.suit {
                Suit::Spades => format!("{}{}", rank, symbol).white().to_string(),
                Suit::Hearts => format!("{}{}", rank, symbol).red().to_string(),
                Suit::Diamonds => format!("{}{}", rank, symbol).blue().to_string(),
                Suit::Clubs => format!("{}{}", rank, symbol).green().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("  {}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_board;

    #[test]
    fn board_display_renders_one_token_per_card() {
        let board = parse_board("2c2h2s2d3h").unwrap();
        let rendered = board_display(&board);
        assert_eq!(rendered.split(' ').count(), 5);
    }
}
