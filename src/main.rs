mod cli;

use clap::{Parser, Subcommand};

use cli::emit::EmitArgs;
use cli::plan::PlanArgs;

#[derive(Parser)]
#[command(
    name = "fieldsynth",
    version,
    about = "Synthesize GPU kernel bodies for field dataflow operations"
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. info, debug)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize the kernel(s) for a request file and print them
    Emit(EmitArgs),
    /// Show the multi-pass plan for a transform length
    Plan(PlanArgs),
}

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Command::Emit(args) => cli::emit::cmd_emit(args),
        Command::Plan(args) => cli::plan::cmd_plan(args),
    }
}
