use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub subcommand: Option<Subcommands>,
}

#[derive(Subcommand)]
pub enum Subcommands {
    /// Run the bundled perft suite (epds/perftsuite.epd)
    Perft,
    /// Fixed-depth search benchmark over the built-in positions
    Bench {
        #[clap(long, default_value_t = 8)]
        depth: i32,
    },
    /// Check the engine finds the best move in every epds/engine.epd entry
    Suite {
        #[clap(long, default_value_t = 6)]
        depth: i32,
    },
}
