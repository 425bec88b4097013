use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "SIFT_LOG";
pub const ENV_LOG_JSON: &str = "SIFT_LOG_JSON";

const DEFAULT_DIRECTIVES: &str = "info";

/// Filter from `RUST_LOG`, else `SIFT_LOG`, else `info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(ENV_LOG))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber, writing to stderr so stdout carries only
/// decisions. `level` (from `-v`/`-q`) overrides the environment filter.
/// Set `SIFT_LOG_JSON=1` for one JSON object per event.
pub fn init(level: Option<&str>) {
    let filter = match level {
        Some(directives) => EnvFilter::new(directives),
        None => env_filter(),
    };
    let json = std::env::var(ENV_LOG_JSON)
        .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // a subscriber may already be installed (tests, embedding)
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
