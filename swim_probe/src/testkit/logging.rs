use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
});

/// Installs a `tracing` subscriber filtered by `RUST_LOG`. Safe to call from every test.
pub fn init_logging() {
  Lazy::force(&TRACING);
}
