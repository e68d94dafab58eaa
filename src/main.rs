//! Vela compiler CLI.
//!
//! Thin driver around the `velac` library: reads a serialized AST (the
//! interchange format produced by the external parser), runs the pipeline
//! and prints LLVM IR. File handling and exit codes live here; everything
//! semantic lives in the library.

use clap::{Parser as ClapParser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process;
use velac::{Ast, CompileOptions, eval};

#[derive(ClapParser)]
#[command(name = "velac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Vela compiler - lower serialized ASTs to LLVM IR", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a serialized AST to LLVM IR
    Build {
        /// Input AST file (JSON interchange format)
        input: PathBuf,

        /// Output .ll path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include commentary in the emitted IR
        #[arg(long)]
        verbose: bool,
    },

    /// Evaluate a constant integer expression from a serialized AST
    Eval {
        /// Input AST file (JSON interchange format)
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            verbose,
        } => {
            let (mut ast, root) = load_ast(&input);
            let options = CompileOptions::new().with_verbose(verbose);
            let ir = match velac::compile_ast(&mut ast, root, &options) {
                Ok(ir) => ir,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            };
            match output {
                Some(path) => {
                    if let Err(e) = fs::write(&path, ir) {
                        eprintln!("Error writing {}: {}", path.display(), e);
                        process::exit(1);
                    }
                }
                None => print!("{}", ir),
            }
        }
        Commands::Eval { input } => {
            let (ast, root) = load_ast(&input);
            match eval::evaluate(&ast, root) {
                Ok(value) => println!("{}", value),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}

/// Read and deserialize an AST file, exiting with a message on failure.
fn load_ast(path: &PathBuf) -> (Ast, velac::ExprId) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            process::exit(1);
        }
    };
    let ast: Ast = match serde_json::from_str(&content) {
        Ok(ast) => ast,
        Err(e) => {
            eprintln!("Error parsing {}: {}", path.display(), e);
            process::exit(1);
        }
    };
    let root = match ast.root {
        Some(root) => root,
        None => {
            eprintln!("Error: {} carries no program root", path.display());
            process::exit(1);
        }
    };
    (ast, root)
}
