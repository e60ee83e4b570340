//! Command-line configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! max_type_depth = 32
//! max_signature_nesting = 4
//! default_chain_id = "$SIGIL_CHAIN_ID"
//! ```
//!
//! # Environment Variables
//!
//! - `SIGIL_CONFIG` - Path to configuration file (default: `sigil.toml`)
//! - `SIGIL_MAX_DEPTH` - Override `max_type_depth`
//! - `SIGIL_MAX_NESTING` - Override `max_signature_nesting`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use sigil::HashingLimits;
use sigil::eip712::DEFAULT_MAX_DEPTH;

/// Default bound on Safe-owned-by-Safe signature nesting.
pub const DEFAULT_MAX_SIGNATURE_NESTING: usize = 4;

/// Errors raised while loading [`SigilConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but cannot be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`SigilConfig`].
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// An override variable holds something other than a number.
    #[error("{var}={value:?} is not a valid number")]
    InvalidOverride {
        /// Variable name.
        var: &'static str,
        /// Its value.
        value: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigilConfig {
    /// Maximum struct/array nesting when hashing typed data (default: `32`).
    #[serde(default = "default_max_type_depth")]
    pub max_type_depth: usize,

    /// Maximum nesting of contract signatures checked by `--nested`
    /// (default: `4`).
    #[serde(default = "default_max_signature_nesting")]
    pub max_signature_nesting: usize,

    /// Chain id used by `safe-hash` when `--chain-id` is not given. Accepts
    /// a number or a string, so it can come from an expanded variable.
    #[serde(default, deserialize_with = "deserialize_chain_id")]
    pub default_chain_id: Option<u64>,
}

impl Default for SigilConfig {
    fn default() -> Self {
        Self {
            max_type_depth: default_max_type_depth(),
            max_signature_nesting: default_max_signature_nesting(),
            default_chain_id: None,
        }
    }
}

const fn default_max_type_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

const fn default_max_signature_nesting() -> usize {
    DEFAULT_MAX_SIGNATURE_NESTING
}

fn deserialize_chain_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid chain id {s:?}"))),
    }
}

impl SigilConfig {
    /// Loads configuration from the path given by the `SIGIL_CONFIG`
    /// environment variable, falling back to `sigil.toml` in the current
    /// directory. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override variable is not a number.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SIGIL_CONFIG").unwrap_or_else(|_| "sigil.toml".to_owned());
        Self::load_from(Path::new(&path))
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Same as [`SigilConfig::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml(&content, |name| std::env::var(name).ok())
    }

    /// Parses TOML, resolving variables and overrides through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on invalid TOML or overrides.
    pub fn from_toml(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let expanded = expand_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;

        if let Some(depth) = parse_override("SIGIL_MAX_DEPTH", &lookup)? {
            config.max_type_depth = depth;
        }
        if let Some(nesting) = parse_override("SIGIL_MAX_NESTING", &lookup)? {
            config.max_signature_nesting = nesting;
        }
        Ok(config)
    }

    /// Hashing limits for typed-data commands.
    #[must_use]
    pub const fn hashing_limits(&self) -> HashingLimits {
        HashingLimits {
            max_depth: self.max_type_depth,
        }
    }
}

fn parse_override<T: FromStr>(
    var: &'static str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { var, value })
        })
        .transpose()
}

/// Expands `$VAR` and `${VAR}` patterns in a string.
///
/// Unresolved variables are left as-is.
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match lookup(&name) {
            Some(value) if !name.is_empty() && (closed || !braced) => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_expand_vars() {
        let lookup = env(&[("CHAIN", "137"), ("NAME", "safe")]);
        assert_eq!(expand_vars("id = $CHAIN", &lookup), "id = 137");
        assert_eq!(expand_vars("${NAME}-x", &lookup), "safe-x");
        assert_eq!(expand_vars("$MISSING and ${MISSING}", &lookup), "$MISSING and ${MISSING}");
        assert_eq!(expand_vars("cost $ 5", &lookup), "cost $ 5");
        assert_eq!(expand_vars("${NAME", &lookup), "${NAME");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SigilConfig::from_toml("", env(&[])).unwrap();
        assert_eq!(config, SigilConfig::default());
        assert_eq!(config.max_type_depth, 32);
        assert_eq!(config.max_signature_nesting, 4);
        assert_eq!(config.default_chain_id, None);
    }

    #[test]
    fn test_file_values_and_expansion() {
        let config = SigilConfig::from_toml(
            "max_type_depth = 8\ndefault_chain_id = \"$CHAIN\"\n",
            env(&[("CHAIN", "100")]),
        )
        .unwrap();
        assert_eq!(config.max_type_depth, 8);
        assert_eq!(config.default_chain_id, Some(100));
        assert_eq!(config.hashing_limits().max_depth, 8);
    }

    #[test]
    fn test_numeric_chain_id() {
        let config = SigilConfig::from_toml("default_chain_id = 1", env(&[])).unwrap();
        assert_eq!(config.default_chain_id, Some(1));
    }

    #[test]
    fn test_env_overrides() {
        let config = SigilConfig::from_toml(
            "max_type_depth = 8\nmax_signature_nesting = 2",
            env(&[("SIGIL_MAX_DEPTH", "16"), ("SIGIL_MAX_NESTING", " 1 ")]),
        )
        .unwrap();
        assert_eq!(config.max_type_depth, 16);
        assert_eq!(config.max_signature_nesting, 1);
    }

    #[test]
    fn test_invalid_override() {
        let err = SigilConfig::from_toml("", env(&[("SIGIL_MAX_DEPTH", "deep")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride { var: "SIGIL_MAX_DEPTH", .. }
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = SigilConfig::load_from(Path::new("/nonexistent/sigil.toml")).unwrap();
        assert_eq!(config.max_signature_nesting, DEFAULT_MAX_SIGNATURE_NESTING);
    }
}
