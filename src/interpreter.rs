//! Tree-walking evaluation.
//!
//! Execution pipeline:
//! `run_program` -> `Interpreter::eval_source` -> `Runtime::eval_list`
//! (top-level expressions) -> `eval_expression` -> `eval_call`
//! (function bodies, loop bodies, chained accesses).
//!
//! The interpreter keeps one persistent root frame so the REPL can carry
//! definitions across lines. `log` writes through the injected sink; the
//! driver prints the program's final value.

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use anyhow::Result;

use crate::parser::{self, ast::ExpressionList};

mod error;
mod frame;
mod runtime;
mod value;

pub use error::RuntimeError;
pub use frame::Frame;
pub use value::{Function, Reference, Value, format_number};

use runtime::{Runtime, seed_native_globals};

pub struct Interpreter<'out, W: Write> {
    root: Rc<Frame>,
    runtime: Runtime<'out, W>,
}

impl<'out, W: Write> Interpreter<'out, W> {
    pub fn new(output: &'out mut W) -> Self {
        let root = Frame::root();
        seed_native_globals(&root);
        Self {
            root,
            runtime: Runtime::new(output),
        }
    }

    /// Evaluates a parsed program against the persistent root frame and
    /// returns the value of its last expression.
    pub fn eval(&mut self, program: &ExpressionList) -> Result<Value, RuntimeError> {
        self.runtime.eval_list(program, &self.root)
    }

    /// Parses and evaluates `source` in one step.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let program = parser::parse_source(source)?;
        Ok(self.eval(&program)?)
    }

    /// Renders the environment chain, for the `--debug` flag.
    pub fn dump_frames(&self) -> String {
        self.root.dump()
    }
}

/// Runs a whole program and returns the printed form of its final value.
/// `log` output goes to `output` as the program runs.
pub fn run_program<W: Write>(source: &str, output: &mut W) -> Result<String> {
    let mut interpreter = Interpreter::new(output);
    let value = interpreter.eval_source(source)?;
    Ok(value.to_string())
}

const LOGO: &str = r#"
      .-::":-.
    .'''..''..'.
   /..''..''..''\
  ;'..''..''..''.;
  ;'..''..''..'..;
   \..''..''..''/
    '.''..''...'
      '-..::-'"#;

/// Read-eval-print loop over one persistent interpreter. Errors are printed
/// and the session continues.
pub fn repl() -> io::Result<()> {
    println!("{LOGO} Golfcart v{}", env!("CARGO_PKG_VERSION"));

    let mut output = io::stdout();
    let mut interpreter = Interpreter::new(&mut output);
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("λ ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        match interpreter.eval_source(&line) {
            Ok(value) => println!("{value}"),
            Err(error) => println!("{error}"),
        }
    }
}
