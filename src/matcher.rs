//! # Asset Selection Module
//!
//! Predicato di inclusione `test` / `include` / `exclude` sui nomi degli asset.
//!
//! ## Regole:
//! - `/pattern/` oppure `/pattern/i` → regular expression
//! - qualsiasi altra stringa → match per prefisso
//!
//! Un nome è selezionato se matcha `test` (o nessun test), almeno un
//! `include` (o nessun include) e nessun `exclude`.

use regex::{Regex, RegexBuilder};

use crate::config::Config;
use crate::error::OptimizeError;

/// A single name pattern
#[derive(Debug, Clone)]
pub enum Rule {
    Prefix(String),
    Regex(Regex),
}

impl Rule {
    pub fn parse(raw: &str) -> Result<Self, OptimizeError> {
        if let Some((pattern, flags)) = split_regex_literal(raw) {
            let mut builder = RegexBuilder::new(pattern);
            for flag in flags.chars() {
                match flag {
                    'i' => {
                        builder.case_insensitive(true);
                    }
                    'm' => {
                        builder.multi_line(true);
                    }
                    's' => {
                        builder.dot_matches_new_line(true);
                    }
                    // global/unicode/sticky have no meaning for a single test
                    'g' | 'u' | 'y' => {}
                    other => {
                        return Err(OptimizeError::Configuration(format!(
                            "unsupported regex flag '{}' in {}",
                            other, raw
                        )))
                    }
                }
            }
            let regex = builder.build().map_err(|e| {
                OptimizeError::Configuration(format!("invalid pattern {}: {}", raw, e))
            })?;
            return Ok(Rule::Regex(regex));
        }

        Ok(Rule::Prefix(raw.to_string()))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Rule::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Rule::Regex(regex) => regex.is_match(name),
        }
    }
}

fn split_regex_literal(raw: &str) -> Option<(&str, &str)> {
    let body = raw.strip_prefix('/')?;
    let end = body.rfind('/')?;
    let (pattern, flags) = (&body[..end], &body[end + 1..]);
    if flags.chars().all(|c| c.is_ascii_alphabetic()) {
        Some((pattern, flags))
    } else {
        None
    }
}

/// Compiled inclusion predicate
#[derive(Debug, Clone, Default)]
pub struct AssetMatcher {
    test: Vec<Rule>,
    include: Vec<Rule>,
    exclude: Vec<Rule>,
}

impl AssetMatcher {
    pub fn from_config(config: &Config) -> Result<Self, OptimizeError> {
        Ok(Self {
            test: compile(config.test.as_ref().map(|t| t.as_slice()))?,
            include: compile(config.include.as_ref().map(|t| t.as_slice()))?,
            exclude: compile(config.exclude.as_ref().map(|t| t.as_slice()))?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        if !self.test.is_empty() && !self.test.iter().any(|r| r.matches(name)) {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|r| r.matches(name)) {
            return false;
        }
        !self.exclude.iter().any(|r| r.matches(name))
    }
}

fn compile(patterns: Option<&[String]>) -> Result<Vec<Rule>, OptimizeError> {
    patterns
        .unwrap_or_default()
        .iter()
        .map(|p| Rule::parse(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Patterns;

    fn matcher(test: Option<&[&str]>, include: Option<&[&str]>, exclude: Option<&[&str]>) -> AssetMatcher {
        let to_patterns = |p: Option<&[&str]>| p.map(|p| Patterns::from(p.to_vec()));
        let config = Config {
            test: to_patterns(test),
            include: to_patterns(include),
            exclude: to_patterns(exclude),
            ..Config::default()
        };
        AssetMatcher::from_config(&config).unwrap()
    }

    #[test]
    fn test_default_matches_css_with_query() {
        let m = AssetMatcher::from_config(&Config::default()).unwrap();
        assert!(m.matches("main.css"));
        assert!(m.matches("main.CSS?v=3"));
        assert!(!m.matches("main.js"));
        assert!(!m.matches("main.css.map"));
    }

    #[test]
    fn test_single_regex() {
        let m = matcher(Some(&["/bar.*\\.css$/"]), None, None);
        assert!(m.matches("bar1.css"));
        assert!(m.matches("bar2.css"));
        assert!(!m.matches("foo.css"));
    }

    #[test]
    fn test_multiple_regexes() {
        let m = matcher(Some(&["/bar1.*\\.css$/", "/bar2.*\\.css$/"]), None, None);
        assert!(m.matches("bar1.css"));
        assert!(m.matches("bar2.css"));
        assert!(!m.matches("bar3.css"));
    }

    #[test]
    fn test_include_and_exclude() {
        let m = matcher(Some(&["/\\.css$/"]), Some(&["included"]), Some(&["/excluded/"]));
        assert!(m.matches("included1.css"));
        assert!(!m.matches("other.css"));
        assert!(!m.matches("included-but-excluded.css"));
    }

    #[test]
    fn test_no_test_selects_everything() {
        let m = matcher(None, None, None);
        assert!(m.matches("anything.txt"));
    }

    #[test]
    fn test_invalid_regex_is_configuration_error() {
        let err = Rule::parse("/(unclosed/").unwrap_err();
        assert!(matches!(err, OptimizeError::Configuration(_)));

        let err = Rule::parse("/a/q").unwrap_err();
        assert!(matches!(err, OptimizeError::Configuration(_)));
    }

    #[test]
    fn test_plain_string_is_prefix() {
        assert!(matches!(Rule::parse("assets/").unwrap(), Rule::Prefix(_)));
        assert!(Rule::parse("assets/").unwrap().matches("assets/site.css"));
    }
}
