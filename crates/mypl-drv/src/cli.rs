use std::path::PathBuf;

use clap::{Args, Parser};

/// `mypl [option] [script-file]` — reads stdin when no script file is given.
#[derive(Debug, Parser)]
#[command(name = "mypl", version, about = "The MyPL compiler and virtual machine")]
pub struct Cli {
    #[command(flatten)]
    pub mode: ModeArgs,

    /// Source file to compile/run; reads from stdin when omitted.
    pub script: Option<PathBuf>,
}

#[derive(Debug, Default, Args)]
#[group(multiple = false)]
pub struct ModeArgs {
    /// Print each token produced by the lexer.
    #[arg(long)]
    pub lex: bool,

    /// Run syntax-only parsing and stop.
    #[arg(long)]
    pub parse: bool,

    /// Pretty-print the parsed program.
    #[arg(long)]
    pub print: bool,

    /// Run the semantic checker and stop.
    #[arg(long)]
    pub check: bool,

    /// Print the generated VM frames instead of running them.
    #[arg(long)]
    pub ir: bool,

    /// Transpile to Java instead of running.
    #[arg(long)]
    pub java: bool,
}
