// basket_service/src/telemetry.rs
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Installs the global subscriber for a binary. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let json = std::env::var("LOG_FORMAT").map(|f| f.eq_ignore_ascii_case("json")).unwrap_or(false);

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE)
    .with_target(true);
  if json {
    builder.json().init();
  } else {
    builder.init();
  }
}
