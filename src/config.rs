//! Configuration management for amnesia-anchor

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::anchor::ResolverConfig;
use crate::highlight::HighlightConfig;
use crate::selectors::SelectorConfig;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// All tunables of the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorConfig {
    pub selectors: SelectorConfig,
    pub resolver: ResolverConfig,
    pub highlight: HighlightConfig,
}

fn parse<T: FromStr>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn parse_bool(var: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let normalized = value.as_deref().map(|v| v.trim().to_ascii_lowercase());
    match normalized {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            var,
            value: value.unwrap_or_default(),
        }),
    }
}

impl AnchorConfig {
    /// Read overrides from `ANCHOR_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let selectors = SelectorConfig {
            prefix_len: parse("ANCHOR_PREFIX_LEN", lookup("ANCHOR_PREFIX_LEN"), defaults.selectors.prefix_len)?,
            suffix_len: parse("ANCHOR_SUFFIX_LEN", lookup("ANCHOR_SUFFIX_LEN"), defaults.selectors.suffix_len)?,
        };

        let hint_scale: f64 = parse("ANCHOR_HINT_SCALE", lookup("ANCHOR_HINT_SCALE"), defaults.resolver.hint_scale)?;
        if !hint_scale.is_finite() || hint_scale < 0.0 {
            return Err(ConfigError::Invalid {
                var: "ANCHOR_HINT_SCALE",
                value: hint_scale.to_string(),
            });
        }
        let resolver = ResolverConfig {
            hint_scale,
            ..defaults.resolver
        };

        let highlight = HighlightConfig {
            tag: lookup("ANCHOR_HIGHLIGHT_TAG").unwrap_or(defaults.highlight.tag),
            class_prefix: lookup("ANCHOR_HIGHLIGHT_CLASS").unwrap_or(defaults.highlight.class_prefix),
            id_attribute: lookup("ANCHOR_ID_ATTRIBUTE").unwrap_or(defaults.highlight.id_attribute),
            type_attribute: defaults.highlight.type_attribute,
            include_inline_styles: parse_bool(
                "ANCHOR_INLINE_STYLES",
                lookup("ANCHOR_INLINE_STYLES"),
                defaults.highlight.include_inline_styles,
            )?,
        };

        Ok(Self {
            selectors,
            resolver,
            highlight,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AnchorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AnchorConfig::default());
        assert_eq!(config.selectors.prefix_len, 32);
        assert_eq!(config.highlight.id_attribute, "data-annotation-id");
    }

    #[test]
    fn test_overrides() {
        let config = AnchorConfig::from_lookup(lookup(&[
            ("ANCHOR_PREFIX_LEN", "16"),
            ("ANCHOR_HINT_SCALE", "250"),
            ("ANCHOR_HIGHLIGHT_TAG", "mark"),
            ("ANCHOR_INLINE_STYLES", "off"),
        ]))
        .unwrap();
        assert_eq!(config.selectors.prefix_len, 16);
        assert_eq!(config.selectors.suffix_len, 32);
        assert_eq!(config.resolver.hint_scale, 250.0);
        assert_eq!(config.highlight.tag, "mark");
        assert!(!config.highlight.include_inline_styles);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            AnchorConfig::from_lookup(lookup(&[("ANCHOR_SUFFIX_LEN", "many")])),
            Err(ConfigError::Invalid {
                var: "ANCHOR_SUFFIX_LEN",
                value: "many".to_string()
            })
        );
        assert!(AnchorConfig::from_lookup(lookup(&[("ANCHOR_INLINE_STYLES", "maybe")])).is_err());
        assert!(AnchorConfig::from_lookup(lookup(&[("ANCHOR_HINT_SCALE", "-1")])).is_err());
    }
}
