use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use nscheme::Session;
use nscheme_driver::{
    cli::{output_path, TargetArgs, Verbosity},
    diagnostic, logging,
};
use tracing::info;

/// Compiles a source file into a textual module.
#[derive(Parser, Debug)]
#[command(name = "nsc", version)]
struct Cli {
    /// Source file to compile
    input: PathBuf,
    /// Where to write the module [default: <input base name>.ll]
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the module to stdout instead of writing it
    #[arg(long)]
    dump: bool,
    #[command(flatten)]
    target: TargetArgs,
    #[command(flatten)]
    verbosity: Verbosity,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbosity.level());

    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("could not open input file {}", cli.input.display()))?;
    let target = cli.target.resolve()?;
    info!(input = %cli.input.display(), %target, "compiling");

    let name = cli.input.display().to_string();
    let mut session = Session::new(&name);
    session.module_mut().set_target(target);
    if let Err(err) = session.compile(&source) {
        eprint!("{}", diagnostic::render(&name, &source, &err));
        return Ok(ExitCode::FAILURE);
    }

    let module = session.into_module();
    if cli.dump {
        print!("{module}");
    } else {
        let output = output_path(&cli.input, cli.output.as_deref());
        std::fs::write(&output, module.to_string())
            .with_context(|| format!("could not write output file {}", output.display()))?;
        info!(output = %output.display(), "wrote module");
    }
    Ok(ExitCode::SUCCESS)
}
