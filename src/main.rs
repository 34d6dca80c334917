#![deny(unsafe_code)]
pub mod commands;

use anyhow::Result;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgAction, Parser};
use commands::binnie::Binnie;
use commands::command::Command;
use commands::liftover::Liftover;
use enum_dispatch::enum_dispatch;
use env_logger::Env;
use log::{error, info};

use bridgebuilder_lib::errors::BinnieError;

/// Custom styles for CLI help output
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(styles = STYLES)]
#[command(version)]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,

    /// Increase log verbosity (repeat for more)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[enum_dispatch(Command)]
#[derive(Parser, Debug)]
#[allow(clippy::large_enum_variant)]
enum Subcommand {
    #[command(display_order = 1)]
    Binnie(Binnie),
    #[command(display_order = 2)]
    Liftover(Liftover),
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            // Argument errors carry a stable exit code distinct from clap's
            let _ = e.print();
            std::process::exit(BinnieError::Args { reason: String::new() }.exit_code());
        }
    };

    let default_filter = if args.debug {
        "trace"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Running bridgebuilder version {}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run(&args) {
        error!("{err:#}");
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<BinnieError>())
            .map_or(1, BinnieError::exit_code);
        std::process::exit(code);
    }
}

fn run(args: &Args) -> Result<()> {
    args.subcommand.execute()
}
