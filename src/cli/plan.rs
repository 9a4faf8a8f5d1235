use std::process;

use clap::Args;

use fieldsynth::fft::{FftPlanner, PlanKey, RadixPlanner};

use super::load_config;

#[derive(Args)]
pub struct PlanArgs {
    /// Transform length (a power of two)
    #[arg(long)]
    pub length: usize,
    /// Independent lines transformed together
    #[arg(long, default_value_t = 1)]
    pub lines: usize,
    /// Tensor planes per point
    #[arg(long, default_value_t = 1)]
    pub planes: usize,
    /// Plan the inverse transform
    #[arg(long)]
    pub inverse: bool,
    /// Thread-per-block ceiling (defaults to the config's)
    #[arg(long)]
    pub max_threads: Option<usize>,
    /// Built-in config preset (default, compact)
    #[arg(long)]
    pub preset: Option<String>,
    /// Print each pass's butterfly text as well
    #[arg(long)]
    pub source: bool,
}

pub fn cmd_plan(args: PlanArgs) {
    let cfg = load_config(None, args.preset.as_deref());
    let key = PlanKey {
        length: args.length,
        lines: args.lines,
        planes: args.planes,
        max_threads: args.max_threads.unwrap_or(cfg.max_threads_per_block),
        inverse: args.inverse,
    };
    let plan = match RadixPlanner::new(cfg.fft_max_radix).plan(&key) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    println!(
        "length {} x {} line(s) x {} plane(s), {} pass(es), {}",
        key.length,
        key.lines,
        key.planes,
        plan.len(),
        if key.inverse { "inverse" } else { "forward" }
    );
    for (i, pass) in plan.passes.iter().enumerate() {
        println!(
            "  pass {}: radix {:>2} stride {:>4} global {:?} local {:?} batch {}",
            i, pass.radix, pass.stride, pass.dims.global, pass.dims.local, pass.dims.batch
        );
        if args.source {
            for line in pass.source.lines() {
                println!("      {}", line);
            }
        }
    }
}
