//! Log subsystem bootstrap. Installs a global `tracing` subscriber once at
//! startup; everything downstream (including `relay_core::logging::
//! TracingLogger`) just calls the `tracing` macros.

use tracing_subscriber::EnvFilter;

pub(crate) fn init(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
