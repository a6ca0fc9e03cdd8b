//! CLI entry point (ambient stack component 9): a single `clap`-derive
//! command tree, trimmed from the teacher's much broader surface
//! (`range`/`equity`/`odds`/`board`/`action`/`mdf`/`spr`/`combos`/`bluff`/
//! `query`/`play`/`solve {pushfold,preflop,river,turn,flop,batch}`) down to
//! the one subcommand this crate's core supports.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cfr::solve;
use crate::display::{board_display, print_error, print_section, print_success};
use crate::error::GtoResult;
use crate::input::parse_input;
use crate::output::build_records;
use crate::tree::build_tree;

#[derive(Parser)]
#[command(name = "gto", version = "1.0.0", about = "River-street no-limit hold'em CFR equilibrium solver.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a spot with counterfactual regret minimization.
    Solve {
        #[command(subcommand)]
        solver: SolverCommands,
    },
}

#[derive(Subcommand)]
enum SolverCommands {
    /// Solve a fixed-board river spot for two ranges and a sizing menu.
    River {
        /// Path to the 12-line input file (`SPEC_FULL.md` §6).
        input_file: PathBuf,
        /// Path the solved JSON node-record array is written to.
        output_file: PathBuf,
        /// Pretty-print the output JSON instead of compact.
        #[arg(long)]
        pretty: bool,
    },
}

pub fn run_with_args(args: Vec<String>) {
    let cli = Cli::parse_from(args);
    let result = match cli.command {
        Commands::Solve { solver } => match solver {
            SolverCommands::River {
                input_file,
                output_file,
                pretty,
            } => run_river(&input_file, &output_file, pretty),
        },
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn run_river(input_file: &PathBuf, output_file: &PathBuf, pretty: bool) -> GtoResult<()> {
    let text = fs::read_to_string(input_file)?;
    let parsed = parse_input(&text)?;

    print_section(
        "Board",
        &board_display(&parsed.board),
    );
    println!(
        "  OOP range: {} combos, IP range: {} combos",
        parsed.oop_range.len(),
        parsed.ip_range.len()
    );

    let mut tree = build_tree(&parsed.tree_config, &parsed.oop_range, &parsed.ip_range);
    println!("  Tree built: {} nodes", tree.len());
    println!("  Solving for {} iterations...", parsed.max_iterations);

    solve(&mut tree, &parsed.board, parsed.max_iterations)?;

    let records = build_records(&tree);
    let json = if pretty {
        serde_json::to_vec_pretty(&records)?
    } else {
        serde_json::to_vec(&records)?
    };
    fs::write(output_file, json)?;

    print_success(&format!(
        "Solved {} nodes, wrote result to {}",
        tree.len(),
        output_file.display()
    ));
    Ok(())
}
