use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "metric_planner=info";

static INIT: OnceCell<()> = OnceCell::new();

/// Installs a fmt subscriber once per process. `RUST_LOG` overrides the
/// default filter; a subscriber installed elsewhere is left in place.
pub fn init_tracing() {
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init();
    });
}
