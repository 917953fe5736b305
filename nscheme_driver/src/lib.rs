//! Shared pieces of the `nsc` and `nsci` front-ends.
pub mod cli;
pub mod diagnostic;
pub mod logging;
