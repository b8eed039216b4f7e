use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};

use minipy::interpreter::Interpreter;
use minipy::{lexer, parser};

fn main() -> ExitCode {
    let mut dump_globals = false;
    let mut input_path: Option<String> = None;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dump-globals" => dump_globals = true,
            _ if input_path.is_none() => input_path = Some(arg),
            _ => {
                eprintln!("Only one input file is supported");
                return ExitCode::from(1);
            }
        }
    }

    let Some(path) = input_path else {
        eprintln!("Usage: minipy [--dump-globals] <source-file>");
        return ExitCode::from(1);
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Could not read {path}: {error}");
            return ExitCode::from(1);
        }
    };

    match run(&source, dump_globals) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::from(2)
        }
    }
}

fn run(source: &str, dump_globals: bool) -> Result<()> {
    let tokens = lexer::tokenize(source).context("lex error")?;
    let program = parser::parse_tokens(tokens).context("parse error")?;

    let mut stdout = io::stdout().lock();
    let globals = Interpreter::new()
        .run(&program, &mut stdout)
        .context("runtime error")?;

    if dump_globals {
        let mut names = globals.keys().collect::<Vec<_>>();
        names.sort();
        for name in names {
            writeln!(stdout, "{name} = {}", globals[name]).context("Writing scope dump")?;
        }
    }
    Ok(())
}
