// 📜 Logging - tracing subscriber shared by both binaries
//
// RUST_LOG wins when set; otherwise `info` (or `debug` with --verbose).
// Logs go to stderr so `--json` output on stdout stays clean.

use tracing_subscriber::EnvFilter;

pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pokemon_vote={0},vote_server={0},tower_http={0}",
            default_level
        ))
    });

    // try_init: a second call (tests, embedding) is not an error
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
