use tracing_subscriber::fmt::format::FmtSpan;

// The engine itself never logs-and-swallows -- every failure comes back as an
// error value -- but callers embedding it usually want the diagnostics.
pub fn setup(env_filter: &str) {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW)
        .with_target(false)
        .with_env_filter(env_filter)
        .compact()
        .init();
}
