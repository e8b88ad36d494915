use carnelian::{
    bench,
    cli::{self, Subcommands},
    perft, uci,
};

fn main() -> anyhow::Result<()> {
    if std::env::args_os().len() == 1 {
        // fast path to UCI:
        return uci::main_loop();
    }

    let cli = <cli::Cli as clap::Parser>::parse();

    match cli.subcommand {
        Some(Subcommands::Perft) => perft::gamut(),
        Some(Subcommands::Bench { depth }) => bench::run(depth),
        Some(Subcommands::Suite { depth }) => bench::engine_suite(depth),
        None => uci::main_loop(),
    }
}
