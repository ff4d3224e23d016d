use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::RouterConfig;

/// Installs the global tracing subscriber
///
/// `RUST_LOG` wins over `config.log_filter`. Returns false when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_tracing(config: &RouterConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok()
}
