use clap::Parser;
use nscheme::{tokenize, Module, Session};
use nscheme_driver::{
    cli::{TargetArgs, Verbosity},
    diagnostic, logging,
};
use rustyline::error::ReadlineError;
use tracing::debug;
use yansi::Paint;

/// Interactive session: every line is compiled into one shared module.
#[derive(Parser, Debug)]
#[command(name = "nsci", version)]
struct Cli {
    /// Print the tokens of every line before compiling it
    #[arg(long)]
    show_tokens: bool,
    #[command(flatten)]
    target: TargetArgs,
    #[command(flatten)]
    verbosity: Verbosity,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbosity.level());

    let mut module = Module::new("top");
    module.set_target(cli.target.resolve()?);
    let mut session = Session::with_module(module);

    println!("{}\n", "nscheme".bold());
    let mut readline = rustyline::DefaultEditor::new()?;
    loop {
        let input = match readline.readline("nscheme> ") {
            Ok(input) => input,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => return Err(err.into()),
        };
        if input.trim().is_empty() {
            continue;
        }
        readline.add_history_entry(input.as_str())?;

        if cli.show_tokens {
            if let Ok(tokens) = tokenize(&input) {
                let kinds: Vec<_> = tokens.iter().map(|tok| tok.kind.to_string()).collect();
                let lexemes: Vec<_> = tokens.iter().map(|tok| tok.lexeme.as_ref()).collect();
                println!("[{}]", kinds.join(" "));
                println!("[{}]", lexemes.join(" "));
            }
        }

        match session.compile(&input) {
            Ok(values) => {
                debug!(count = values.len(), "compiled line");
                print!("{}", session.module());
            }
            Err(err) => print!("{}", diagnostic::render("<stdin>", &input, &err)),
        }
    }

    Ok(())
}
