use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use clap::{ArgAction, Args};
use nscheme::{BackendError, Target};
use tracing_subscriber::filter::LevelFilter;

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Target triple, e.g. `x86_64-unknown-linux-gnu` [default: the host]
    #[arg(long)]
    pub target: Option<String>,
    /// CPU model
    #[arg(long, default_value = "generic")]
    pub cpu: String,
    /// Target features, e.g. `+avx2,+fma`
    #[arg(long, default_value = "")]
    pub features: String,
}

impl TargetArgs {
    pub fn resolve(&self) -> Result<Target, BackendError> {
        let target = match &self.target {
            Some(triple) => triple.parse()?,
            None => Target::host(),
        };
        Ok(target.with_cpu(&self.cpu).with_features(&self.features))
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct Verbosity {
    /// Log more (`-v` info, `-vv` debug, `-vvv` trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Verbosity {
    pub fn level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// `output` if given, else the input's base name with an `.ll` extension,
/// in the current directory.
pub fn output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(output) => output.to_path_buf(),
        None => {
            let stem = input.file_stem().unwrap_or(OsStr::new("out"));
            Path::new(stem).with_extension("ll")
        }
    }
}
