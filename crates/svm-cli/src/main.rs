//! Stack VM - CLI
//!
//! Runs chunk images or assembly source, and assembles source into images.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::{debug, info};

use svm_core::{assemble_source, Chunk, ChunkLoader, ChunkWriter, VirtualMachine, VmConfig};

#[derive(Parser)]
#[command(name = "svm", about = "Stack virtual machine runner and assembler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a chunk image or an assembly source file
    Run {
        /// Image (detected by its magic number) or assembly source
        file: PathBuf,

        /// Trace every instruction and enable debug logging
        #[arg(long)]
        debug: bool,

        /// Number of global variable slots
        #[arg(long)]
        globals: Option<usize>,

        /// Number of LOAD/STORE memory slots
        #[arg(long)]
        memory: Option<usize>,

        /// Maximum operand stack depth
        #[arg(long)]
        max_stack: Option<usize>,

        /// Live-object count that triggers the first collection
        #[arg(long)]
        gc_threshold: Option<usize>,
    },

    /// Assemble a source file into a chunk image
    Assemble {
        /// Assembly source
        source: PathBuf,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let debug = matches!(cli.command, Command::Run { debug: true, .. });
    let default_filter = if debug { "trace" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Command::Run {
            file,
            debug,
            globals,
            memory,
            max_stack,
            gc_threshold,
        } => {
            let mut config = VmConfig::new();
            config.trace = debug;
            if let Some(n) = globals {
                config.global_slots = n;
            }
            if let Some(n) = memory {
                config.memory_slots = n;
            }
            if let Some(n) = max_stack {
                config.max_stack_size = n;
            }
            if let Some(n) = gc_threshold {
                config.gc_threshold = n;
            }
            run(&file, config);
        }
        Command::Assemble { source, output } => assemble(&source, &output),
    }
}

fn run(path: &Path, config: VmConfig) {
    let chunk = load_chunk(path);
    info!("loaded {} instructions, {} constants", chunk.len(), chunk.constants().len());

    let mut vm = VirtualMachine::new(config);
    debug!("vm config: {:?}", vm.config());
    if let Err(fault) = vm.run(&chunk) {
        match fault.line {
            Some(line) => eprintln!("Runtime error: {} (line {})", fault, line),
            None => eprintln!("Runtime error: {}", fault),
        }
        process::exit(1);
    }
}

fn assemble(source: &Path, output: &Path) {
    let text = fs::read_to_string(source).unwrap_or_else(|e| {
        eprintln!("Error: failed to read {}: {}", source.display(), e);
        process::exit(1);
    });

    let chunk = assemble_source(&text).unwrap_or_else(|e| {
        eprintln!("Error in {}: {}", source.display(), e);
        process::exit(1);
    });

    if let Err(e) = fs::write(output, ChunkWriter::write(&chunk)) {
        eprintln!("Error: failed to write {}: {}", output.display(), e);
        process::exit(1);
    }
    info!("wrote {} instructions to {}", chunk.len(), output.display());
}

fn load_chunk(path: &Path) -> Chunk {
    let bytes = fs::read(path).unwrap_or_else(|e| {
        eprintln!("Error: failed to read {}: {}", path.display(), e);
        process::exit(1);
    });

    let result = if ChunkLoader::is_image(&bytes) {
        ChunkLoader::load(&bytes)
    } else {
        match String::from_utf8(bytes) {
            Ok(text) => assemble_source(&text),
            Err(_) => {
                eprintln!("Error: {} is neither a chunk image nor UTF-8 source", path.display());
                process::exit(1);
            }
        }
    };

    result.unwrap_or_else(|e| {
        eprintln!("Error in {}: {}", path.display(), e);
        process::exit(1);
    })
}
