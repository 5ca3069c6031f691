use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` sets one.
///
/// wgpu's own crates are chatty at `info` during adapter and surface setup.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "vista_engine=debug,wgpu_core=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Filter string in effect: explicit config, then `RUST_LOG`, then
    /// [`DEFAULT_FILTER`]. Blank sources are skipped.
    pub fn resolve_filter(&self, rust_log: Option<String>) -> String {
        let non_blank = |f: &String| !f.trim().is_empty();
        self.env_filter
            .clone()
            .filter(non_blank)
            .or_else(|| rust_log.filter(non_blank))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolve_filter(std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized ({filter})");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_env() {
        let config = LoggingConfig {
            env_filter: Some("debug".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_filter(Some("trace".into())), "debug");
    }

    #[test]
    fn env_filter_used_when_not_configured() {
        let config = LoggingConfig::default();
        assert_eq!(config.resolve_filter(Some("warn".into())), "warn");
    }

    #[test]
    fn blank_explicit_filter_falls_through_to_env() {
        let config = LoggingConfig {
            env_filter: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_filter(Some("warn".into())), "warn");
        assert_eq!(config.resolve_filter(None), DEFAULT_FILTER);
    }

    #[test]
    fn default_quiets_wgpu() {
        let config = LoggingConfig::default();
        let filter = config.resolve_filter(Some("  ".into()));
        assert_eq!(filter, DEFAULT_FILTER);
        assert!(filter.starts_with("info"));
        assert!(filter.contains("wgpu_core=warn"));
    }
}
