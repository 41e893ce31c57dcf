use std::fs;
use std::io;
use std::process;

use anyhow::{Result, bail};
use golfcart::{interpreter, parser};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut debug = false;
    let mut ast_only = false;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" => {
                println!("Golfcart v{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--ebnf" => {
                println!("{}", parser::GRAMMAR);
                return Ok(());
            }
            "--ast" => {
                ast_only = true;
            }
            "--debug" => {
                debug = true;
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    // No file path: the user probably wants the REPL.
    let Some(path) = input_path else {
        interpreter::repl()?;
        return Ok(());
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("while reading {path}: {error}");
            process::exit(1);
        }
    };

    if ast_only {
        match parser::parse_source(&source) {
            Ok(program) => println!("{program:#?}"),
            Err(error) => {
                eprintln!("while running {path}: {error}");
                process::exit(1);
            }
        }
        return Ok(());
    }

    let mut output = io::stdout();
    let mut session = interpreter::Interpreter::new(&mut output);
    match session.eval_source(&source) {
        Ok(value) => println!("{value}"),
        Err(error) => {
            eprintln!("while running {path}: {error}");
            process::exit(1);
        }
    }

    if debug {
        println!("{}", session.dump_frames());
    }

    Ok(())
}
