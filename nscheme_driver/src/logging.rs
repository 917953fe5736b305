use tracing_subscriber::filter::LevelFilter;

/// Installs a plain stderr subscriber. Timestamps and targets are left out,
/// so each event reads as `LEVEL message`.
pub fn init(level: LevelFilter) {
    let result = tracing_subscriber::fmt()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(err) = result {
        eprintln!("logging was already initialised: {err}");
    }
}
