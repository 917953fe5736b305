use core::fmt;
use std::str::FromStr;

use super::BackendError;

const KNOWN_ARCHES: &[&str] = &[
    "x86_64",
    "i386",
    "i586",
    "i686",
    "aarch64",
    "arm",
    "armv7",
    "thumbv7em",
    "riscv32",
    "riscv64",
    "wasm32",
    "wasm64",
    "powerpc64",
    "powerpc64le",
    "s390x",
    "mips",
    "mips64",
];

/// What the module is being compiled for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    triple: Box<str>,
    cpu: Box<str>,
    features: Box<str>,
}

impl Target {
    /// Checks that `triple` is `arch-vendor-os[-env]` with a known architecture.
    pub fn new(triple: &str, cpu: &str, features: &str) -> Result<Self, BackendError> {
        let parts: Vec<_> = triple.split('-').collect();
        let well_formed = matches!(parts.len(), 3 | 4)
            && parts.iter().all(|part| !part.is_empty())
            && KNOWN_ARCHES.contains(&parts[0]);
        if !well_formed {
            return Err(BackendError::UnknownTarget(Box::from(triple)));
        }
        Ok(Self {
            triple: Box::from(triple),
            cpu: Box::from(cpu),
            features: Box::from(features),
        })
    }

    /// The machine we are running on, with a generic cpu and no extra features.
    pub fn host() -> Self {
        let arch = match std::env::consts::ARCH {
            "x86" => "i686",
            arch => arch,
        };
        let triple = match std::env::consts::OS {
            "linux" => format!("{arch}-unknown-linux-gnu"),
            "macos" => format!("{arch}-apple-darwin"),
            "windows" => format!("{arch}-pc-windows-msvc"),
            os => format!("{arch}-unknown-{os}"),
        };
        Self {
            triple: Box::from(triple.as_str()),
            cpu: Box::from("generic"),
            features: Box::from(""),
        }
    }

    pub fn with_cpu(mut self, cpu: &str) -> Self {
        self.cpu = Box::from(cpu);
        self
    }

    pub fn with_features(mut self, features: &str) -> Self {
        self.features = Box::from(features);
        self
    }

    pub fn triple(&self) -> &str {
        &self.triple
    }

    pub fn cpu(&self) -> &str {
        &self.cpu
    }

    pub fn features(&self) -> &str {
        &self.features
    }
}

impl FromStr for Target {
    type Err = BackendError;

    fn from_str(triple: &str) -> Result<Self, Self::Err> {
        Self::new(triple, "generic", "")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (cpu: {}", self.triple, self.cpu)?;
        if !self.features.is_empty() {
            write!(f, ", features: {}", self.features)?;
        }
        write!(f, ")")
    }
}
