use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber. `VMTIDY_LOG` takes precedence over `--verbose`.
pub fn init(verbose: bool) {
    let fallback = if verbose { "vmtidy=info" } else { "vmtidy=warn" };
    let filter = EnvFilter::try_from_env("VMTIDY_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
