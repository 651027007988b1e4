// Configuration module
// Settings that shape session behavior, loaded from TOML or pushed by the host

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Maximum size of a single kill ring entry (10 MB)
pub const DEFAULT_MAX_KILL_BYTES: usize = 10 * 1024 * 1024;

/// Whether sessions share one kill ring or keep their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KillRingScope {
    /// One ring for every document in the process.
    #[default]
    Shared,
    /// Each document session owns a ring.
    Isolated,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Number of entries the kill ring keeps before discarding the oldest
    pub kill_ring_max: usize,
    pub kill_ring_scope: KillRingScope,
    /// Kills larger than this many bytes are refused
    pub max_kill_bytes: usize,
    /// Magnitude of a bare `C-u`; each further `C-u` multiplies by it
    pub universal_argument_base: i64,
    /// Context key published to the host whenever mark mode changes
    pub mark_mode_context: String,
}

/// Loosely typed value, as hosts hand settings over.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kill_ring_max: 60,
            kill_ring_scope: KillRingScope::Shared,
            max_kill_bytes: DEFAULT_MAX_KILL_BYTES,
            universal_argument_base: 4,
            mark_mode_context: "emcx.inMarkMode".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kill_ring_max == 0 {
            return Err(ConfigError::Invalid(
                "kill-ring-max must be at least 1".to_string(),
            ));
        }
        if self.universal_argument_base < 2 {
            return Err(ConfigError::Invalid(format!(
                "universal-argument-base must be at least 2, got {}",
                self.universal_argument_base
            )));
        }
        if self.mark_mode_context.is_empty() {
            return Err(ConfigError::Invalid(
                "mark-mode-context must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a single host setting by its TOML key.
    ///
    /// The config is left untouched when the key is unknown, the value has the
    /// wrong type, or the result fails validation.
    pub fn set<V: Into<ConfigValue>>(&mut self, key: &str, value: V) -> Result<(), ConfigError> {
        let value = value.into();
        let mut next = self.clone();
        match (key, value) {
            ("kill-ring-max", ConfigValue::Int(n)) => next.kill_ring_max = non_negative(key, n)?,
            ("max-kill-bytes", ConfigValue::Int(n)) => next.max_kill_bytes = non_negative(key, n)?,
            ("universal-argument-base", ConfigValue::Int(n)) => next.universal_argument_base = n,
            ("mark-mode-context", ConfigValue::String(s)) => next.mark_mode_context = s,
            ("kill-ring-scope", ConfigValue::String(s)) => {
                next.kill_ring_scope = match s.as_str() {
                    "shared" => KillRingScope::Shared,
                    "isolated" => KillRingScope::Isolated,
                    other => {
                        return Err(ConfigError::Invalid(format!(
                            "kill-ring-scope must be `shared` or `isolated`, got `{other}`"
                        )));
                    }
                }
            }
            (key, value) => {
                return Err(ConfigError::Invalid(format!(
                    "unknown setting or wrong type: {key} = {value:?}"
                )));
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn non_negative(key: &str, n: i64) -> Result<usize, ConfigError> {
    usize::try_from(n).map_err(|_| ConfigError::Invalid(format!("{key} must not be negative")))
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.kill_ring_max, 60);
        assert_eq!(config.kill_ring_scope, KillRingScope::Shared);
        assert_eq!(config.universal_argument_base, 4);
        assert_eq!(config.mark_mode_context, "emcx.inMarkMode");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str("kill-ring-max = 8\nkill-ring-scope = \"isolated\"\n")
            .unwrap();
        assert_eq!(config.kill_ring_max, 8);
        assert_eq!(config.kill_ring_scope, KillRingScope::Isolated);
        assert_eq!(config.max_kill_bytes, DEFAULT_MAX_KILL_BYTES);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml_str("kill-ring-size = 8").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml_str("kill-ring-max = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("universal-argument-base = 1"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "universal-argument-base = 10").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.universal_argument_base, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/emcx.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_set_settings() {
        let mut config = Config::default();
        config.set("kill-ring-max", 5i64).unwrap();
        config.set("kill-ring-scope", "isolated").unwrap();
        config.set("mark-mode-context", "host.markActive").unwrap();
        assert_eq!(config.kill_ring_max, 5);
        assert_eq!(config.kill_ring_scope, KillRingScope::Isolated);
        assert_eq!(config.mark_mode_context, "host.markActive");
    }

    #[test]
    fn test_set_rejects_bad_values_without_mutating() {
        let mut config = Config::default();
        assert!(config.set("kill-ring-max", true).is_err());
        assert!(config.set("kill-ring-max", -3i64).is_err());
        assert!(config.set("universal-argument-base", 0i64).is_err());
        assert!(config.set("no-such-key", 1i64).is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_value_conversions() {
        let b: ConfigValue = true.into();
        assert_eq!(b, ConfigValue::Bool(true));

        let i: ConfigValue = 100i64.into();
        assert_eq!(i, ConfigValue::Int(100));

        let s: ConfigValue = "test".into();
        assert_eq!(s, ConfigValue::String("test".to_string()));
    }
}
