//! bbvm command-line runner.
//!
//! Logging goes through `tracing`; set `RUST_LOG` (for example
//! `RUST_LOG=bb_eval=debug`) to see loading, analysis and scheduling
//! events on stderr.

mod options;

use bb_eval::{Vm, VmError};
use options::{parse_args, Command};
use std::path::Path;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn print_usage() {
    println!("bbvm - run bbvm bytecode");
    println!();
    println!("Usage:");
    println!("  bbvm [run] <file.bbvm> [--threads N]");
    println!("  bbvm analyze <file.bbvm>");
    println!();
    println!("Options:");
    println!("  -j, --threads N   Background threads allowed at once (default: CPU count)");
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

fn run(path: &Path, threads: usize) -> Result<(), VmError> {
    let vm = Vm::builder().max_threads(threads).build();
    let program = vm.load_file(path)?;
    tracing::info!(path = %path.display(), threads, "running");
    let outcome = vm.run(&program);
    let cache = vm.shutdown();
    outcome?;
    cache?;
    Ok(())
}

fn analyze(path: &Path) -> Result<(), VmError> {
    let vm = Vm::new();
    let loaded = vm.load_file(path)?;
    let program = loaded.program();
    let analysis = loaded.analysis();
    for span in program.blocks() {
        let command = program.command(span.begin);
        let name = vm.symbols().name(command.dest());
        let verdict = if analysis.is_parallel(span.begin) {
            "parallel"
        } else {
            "serial"
        };
        println!("{name:<24} line {:<6} {verdict}", command.origin.line);
    }
    println!(
        "{} of {} blocks parallel ({} fixpoint iterations)",
        analysis.parallel_count(),
        program.blocks().len(),
        analysis.iterations()
    );
    Ok(())
}

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}");
            print_usage();
            std::process::exit(2);
        }
    };
    let result = match command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::Analyze { path } => analyze(&path),
        Command::Run { path, threads } => run(&path, threads.unwrap_or_else(default_threads)),
    };
    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
