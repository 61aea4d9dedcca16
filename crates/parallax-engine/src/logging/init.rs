use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` uses the `env_logger` filter syntax (e.g. "info",
/// "parallax_engine=debug,parallax_vr=debug,wgpu=warn"). When unset, `RUST_LOG` is
/// consulted before falling back to `info`.
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

/// Installs the global logger. Only the first call has an effect.
///
/// Returns whether this call installed `env_logger`; `false` on later calls or when
/// another logger was already set.
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut installed = false;
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.env_filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                // wgpu is chatty at info.
                builder
                    .filter_level(log::LevelFilter::Info)
                    .filter_module("wgpu_core", log::LevelFilter::Warn)
                    .filter_module("wgpu_hal", log::LevelFilter::Warn);
            }
        }

        builder.write_style(config.write_style);

        match builder.try_init() {
            Ok(()) => {
                installed = true;
                log::debug!("logging initialized");
            }
            // Tests may have installed a logger already.
            Err(e) => log::debug!("keeping existing logger: {e}"),
        }
    });
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_init_installs_logger() {
        let first = init_logging(LoggingConfig {
            env_filter: Some("off".into()),
            ..LoggingConfig::default()
        });
        assert!(first);
        assert_eq!(log::max_level(), log::LevelFilter::Off);

        assert!(!init_logging(LoggingConfig::default()));
        assert_eq!(log::max_level(), log::LevelFilter::Off);
        log::info!("still fine");
    }
}
