use tracing::Level;

/// How chatty the stderr log is, from repeated `-v` flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verbosity(pub u8);

impl Verbosity {
    pub fn level(self) -> Level {
        match self.0 {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Install the global fmt subscriber on stderr.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(verbosity.level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
