//! The `mypl` command-line driver: selects a pipeline stage to stop at
//! (`--lex`/`--parse`/`--print`/`--check`/`--ir`/`--java`) or, with no
//! option, compiles and runs the program via the VM.

mod cli;
mod java;
mod print;

use std::fs;
use std::io::{self, Read as _};
use std::process::ExitCode;

use clap::Parser as _;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use mypl_lex::Lexer;
use mypl_par::Parser;
use mypl_vm::VM;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MYPL_LOG").unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn read_source(path: Option<&std::path::Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let source = read_source(cli.script.as_deref())?;

    if cli.mode.lex {
        for token in Lexer::tokenize(&source)? {
            println!("{:?} '{}' {}", token.kind, token.lexeme, token.pos);
        }
        return Ok(());
    }

    let tokens = Lexer::tokenize(&source)?;
    let program = Parser::parse(tokens)?;

    if cli.mode.parse {
        return Ok(());
    }
    if cli.mode.print {
        print!("{}", print::print_program(&program));
        return Ok(());
    }
    if cli.mode.java {
        print!("{}", java::transpile_program(&program));
        return Ok(());
    }

    mypl_sem::Checker::check(&program)?;
    if cli.mode.check {
        return Ok(());
    }

    let frames = mypl_gen::generate(&program)?;
    if cli.mode.ir {
        for frame in &frames {
            print!("{frame}");
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut vm = VM::new(frames, stdin.lock(), stdout.lock());
    vm.run()?;
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mypl: {err}");
            ExitCode::FAILURE
        }
    }
}
