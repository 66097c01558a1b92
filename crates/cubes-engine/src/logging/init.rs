use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` provides one.
///
/// The graphics stack is chatty at info level, so it is capped at warn.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "cubes_engine=debug,wgpu_core=warn").
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

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
///
/// Filter precedence: `config.env_filter`, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`].
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = resolve_filter(config.env_filter, std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);

        if let Err(err) = builder.try_init() {
            eprintln!("logger already installed: {err}");
            return;
        }

        log::debug!("logging initialized ({filter})");
    });
}

fn resolve_filter(explicit: Option<String>, from_env: Option<String>) -> String {
    let usable = |f: &String| !f.trim().is_empty();
    explicit
        .filter(usable)
        .or_else(|| from_env.filter(usable))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_environment() {
        let f = resolve_filter(Some("debug".into()), Some("trace".into()));
        assert_eq!(f, "debug");
    }

    #[test]
    fn environment_is_used_when_not_configured() {
        assert_eq!(resolve_filter(None, Some("warn".into())), "warn");
    }

    #[test]
    fn blank_explicit_filter_defers_to_environment() {
        assert_eq!(resolve_filter(Some("  ".into()), Some("warn".into())), "warn");
        assert_eq!(resolve_filter(Some(String::new()), None), DEFAULT_FILTER);
    }

    #[test]
    fn blank_filter_falls_back_to_default() {
        assert_eq!(resolve_filter(None, Some("  ".into())), DEFAULT_FILTER);
        assert_eq!(resolve_filter(None, None), DEFAULT_FILTER);
    }
}
