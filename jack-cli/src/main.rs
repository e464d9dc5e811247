//! Entrypoint for CLI
use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};

use jack::{lex::Lexer, IMPL_VERSION};
use log::{error, info};

use self::error::{AppError, ErrorKind};

mod error;

static USAGE: &str = r#"
usage: jackc PATH
       jackc tokens FILE

commands:
    PATH    Compile a .jack file, or every .jack file in a directory,
            into .vm files placed next to the sources
    tokens  Print the token stream of the target .jack file

examples:
    jackc Main.jack
    jackc Pong/
    jackc tokens Main.jack
"#;

const SOURCE_EXTENSION: &str = "jack";
const OUTPUT_EXTENSION: &str = "vm";

/// Compile a single source file, writing the program next to it.
///
/// Nothing is written when compilation fails.
fn compile_file(filepath: &Path) -> Result<PathBuf, AppError> {
    let source_code = fs::read_to_string(filepath)?;
    let program = jack::compile_to_vm(source_code)?;

    let outpath = filepath.with_extension(OUTPUT_EXTENSION);
    fs::write(&outpath, program)?;

    Ok(outpath)
}

/// Source files to compile for the given path, in a stable order.
fn collect_sources(path: &Path) -> Result<Vec<PathBuf>, AppError> {
    if path.is_dir() {
        let mut sources = vec![];
        for entry in fs::read_dir(path)? {
            let entry_path = entry?.path();
            if entry_path.is_file() && is_source_file(&entry_path) {
                sources.push(entry_path);
            }
        }
        sources.sort();
        Ok(sources)
    } else if is_source_file(path) {
        Ok(vec![path.to_path_buf()])
    } else {
        Err(AppError::usage(path))
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == SOURCE_EXTENSION)
}

fn run_compiler(path: impl AsRef<Path>) -> Result<(), AppError> {
    let sources = collect_sources(path.as_ref())?;
    if sources.is_empty() {
        info!("no .{SOURCE_EXTENSION} files in {}", path.as_ref().display());
    }

    let mut failed = 0;
    for filepath in &sources {
        match compile_file(filepath) {
            Ok(outpath) => info!("compiled {} -> {}", filepath.display(), outpath.display()),
            Err(err) => {
                error!("{}: {}", filepath.display(), err.kind);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(AppError::failed(failed));
    }

    Ok(())
}

fn dump_tokens(filepath: impl AsRef<Path>) -> Result<(), AppError> {
    let source_code = fs::read_to_string(filepath.as_ref())?;
    let lexer = Lexer::new(source_code.as_str());

    println!(" line:col  | offset:len | token                    | fragment ");
    for result in lexer {
        let token = result?;
        let loc = format!("{}:{}", token.span.line, token.span.column);
        let offset = token.span.index;
        let len = token.span.size;
        let kind = format!("{:?}", token.kind); // cannot format debug print {:?} into columns
        let fragment = token.span.fragment(source_code.as_str());
        println!("{loc: >10} {offset:7}:{len: <3} {kind: <26} \"{fragment}\"");
    }

    Ok(())
}

fn main() {
    // RUST_LOG overrides the default level.
    let logger = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env();
    if let Err(err) = logger.init() {
        eprintln!("failed to initialise logger: {err}");
    }

    let result = match parse_args() {
        Some(Cmd::Compile { path }) => run_compiler(path),
        Some(Cmd::Tokens { filepath }) => dump_tokens(filepath),
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            process::exit(64)
        }
    };

    if let Err(err) = result {
        match err.kind {
            ErrorKind::Usage(_) => {
                error!("{err}");
                print_usage();
                process::exit(64)
            }
            _ => {
                error!("{err}");
                process::exit(1)
            }
        }
    }
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    let first = args.next()?;

    let cmd = match first.as_str() {
        "tokens" => Cmd::Tokens {
            filepath: consume_arg(&mut args)?,
        },
        "-h" | "--help" | "help" => return None,
        _ => Cmd::Compile { path: first },
    };

    // Trailing arguments are a usage error.
    if args.next().is_some() {
        return None;
    }

    Some(cmd)
}

fn consume_arg(args: &mut impl Iterator<Item = String>) -> Option<String> {
    args.next()
}

fn print_usage() {
    println!("Jack compiler v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Compile a file or directory
    Compile { path: String },
    /// Dump the token stream
    Tokens { filepath: String },
}
