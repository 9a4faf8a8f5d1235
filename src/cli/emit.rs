use std::path::PathBuf;
use std::process;

use clap::Args;
use tracing::info;

use fieldsynth::diagnostic::{Diagnostic, Signature};
use fieldsynth::{HandleAllocator, Kernel, Synthesis, Synthesizer};

use super::{load_config, read_file, Request};

#[derive(Args)]
pub struct EmitArgs {
    /// Request file (TOML) naming the opcode and its input field types
    pub request: PathBuf,
    /// Synthesis config file; overrides --preset
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Built-in config preset (default, compact)
    #[arg(long)]
    pub preset: Option<String>,
    /// Print only the kernel sources
    #[arg(long)]
    pub quiet: bool,
}

pub fn cmd_emit(args: EmitArgs) {
    let EmitArgs {
        request,
        config,
        preset,
        quiet,
    } = args;
    let filename = request.display().to_string();
    let text = read_file(&request);
    let request = match Request::parse(&text) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {}: {}", filename, e);
            process::exit(1);
        }
    };

    let cfg = load_config(config.as_deref(), preset.as_deref());
    let synth = match Synthesizer::new(cfg) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let mut alloc = HandleAllocator::new();
    let inputs: Vec<_> = request.inputs.iter().cloned().map(|t| alloc.input(t)).collect();
    let input_types: Vec<_> = request.inputs.iter().collect();
    let results = match &request.results {
        Some(results) => Ok(results.clone()),
        None => synth.expected_results(&request.opcode, &input_types),
    };

    let outcome =
        results.and_then(|results| synth.synthesize(&request.opcode, &inputs, &results));

    match outcome {
        Ok(synthesis) => {
            info!(
                opcode = %request.opcode,
                kernels = synthesis.kernels().len(),
                "synthesized"
            );
            print_synthesis(&synthesis, quiet);
        }
        Err(e) => {
            let declared = request.results.clone().unwrap_or_default();
            let signature = Signature::new(&request.opcode, &request.inputs, &declared);
            let diag = Diagnostic::from_kernel_error(&e, &signature);
            if diag.render(&filename, &signature.text).is_err() {
                eprintln!("error: {}", e);
            }
            process::exit(1);
        }
    }
}

fn print_synthesis(synthesis: &Synthesis, quiet: bool) {
    for kernel in synthesis.kernels() {
        if !quiet {
            print_header(kernel);
        }
        print!("{}", kernel.source());
        if !quiet {
            println!();
        }
    }
}

fn print_header(kernel: &Kernel) {
    let geometry = kernel.geometry();
    println!("// kernel   {}", kernel.name());
    if let Some(pass) = geometry.pass {
        println!("// pass     {} of {}", pass.index + 1, pass.count);
    }
    println!(
        "// mode     {}{}",
        kernel.addressing(),
        if kernel.is_fusable() { " (fusable)" } else { "" }
    );
    println!("// launch   {}", geometry.work_group);
    let outputs: Vec<String> = kernel.outputs().iter().map(|t| t.to_string()).collect();
    println!("// outputs  {}", outputs.join(", "));
    println!("// blake3   {}", kernel.fingerprint());
}
