use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Logger configuration shared by the command line tools.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggerConfig {
    /// Level for the awkit crates.
    pub app_level_filter: LevelFilter,
    /// Level for everything else.
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            app_level_filter: LevelFilter::Info,
            level_filter: LevelFilter::Warn,
        }
    }
}

impl LoggerConfig {
    /// `--verbose` on the command line.
    pub fn verbose() -> Self {
        Self {
            app_level_filter: LevelFilter::Debug,
            ..Default::default()
        }
    }

    /// Filter directives in `env_logger` syntax, e.g. `warn,awkit_core=info`.
    ///
    /// `crates` lists the module roots that get `app_level_filter`.
    pub fn filter_directives(&self, crates: &[&str]) -> String {
        let mut directives = vec![self.level_filter.to_string().to_lowercase()];
        for name in crates {
            directives.push(format!(
                "{}={}",
                name,
                self.app_level_filter.to_string().to_lowercase()
            ));
        }
        directives.join(",")
    }
}
