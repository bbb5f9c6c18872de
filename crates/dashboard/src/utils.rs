/// Installs a fmt subscriber filtered by `RUST_LOG`.
///
/// Hosts that manage their own subscriber should not call this.
pub fn subscriber() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
