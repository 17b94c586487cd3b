//! Logging setup shared by Plaza binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence. Without it, the binary's own crate, the
/// Plaza library crates and `tower_http` log at `default_level`.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(bin_name, default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn default_directives(bin_name: &str, default_level: &str) -> String {
    let bin_target = bin_name.replace('-', "_");
    let mut directives = vec![format!("{bin_target}={default_level}")];
    for target in ["plaza_server", "plaza_shared", "tower_http"] {
        if target != bin_target {
            directives.push(format!("{target}={default_level}"));
        }
    }
    directives.join(",")
}
