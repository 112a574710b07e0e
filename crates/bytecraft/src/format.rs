//! A named, compiled format: the codec for one schema file plus the filename
//! pattern that selects it, and the batch loader over many schema sources.

use globset::{Glob, GlobMatcher};
use thiserror::Error;

use crate::compiled::Codec;
use crate::errors::CompileError;
use crate::registry::Registry;
use crate::serde::FormatDef;

/// Errors from loading one schema source: either the JSON is malformed or
/// the schema fails to compile. Fatal for that schema only.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid schema json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// A compiled format, reusable across every file it matches.
#[derive(Debug, Clone)]
pub struct Format {
    pub name: String,
    pub pattern: String,
    /// Precompiled glob, present only when the pattern has wildcards.
    matcher: Option<GlobMatcher>,
    pub codec: Codec,
}

impl Format {
    /// Compiles a schema description into a format.
    pub fn compile(def: &FormatDef, registry: &Registry) -> Result<Format, CompileError> {
        let pattern = def.pattern().to_string();

        let matcher = if pattern.contains('*') || pattern.contains('?') {
            let glob = Glob::new(&pattern).map_err(|e| CompileError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            Some(glob.compile_matcher())
        } else {
            None
        };

        Ok(Format {
            name: def.name.clone().unwrap_or_else(|| "unnamed".to_string()),
            pattern,
            matcher,
            codec: Codec::compile(&def.structure, registry)?,
        })
    }

    /// Parses schema JSON and compiles it.
    pub fn from_json(json: &str, registry: &Registry) -> Result<Format, LoadError> {
        let def: FormatDef = serde_json::from_str(json)?;
        Ok(Format::compile(&def, registry)?)
    }

    /// Whether this format applies to `filename`: exact match first, then
    /// wildcard glob, then case-insensitive comparison as a fallback for
    /// formats named after uppercase DOS-era files.
    pub fn matches(&self, filename: &str) -> bool {
        if self.pattern == filename {
            return true;
        }
        match &self.matcher {
            Some(matcher) => matcher.is_match(filename),
            None => self.pattern.eq_ignore_ascii_case(filename),
        }
    }
}

/// Loads a batch of `(label, json)` schema sources. A source that fails to
/// parse or compile is skipped and reported alongside the ones that loaded;
/// only the caller decides whether a partial batch is acceptable.
pub fn load_formats<'a, I>(sources: I, registry: &Registry) -> (Vec<Format>, Vec<(String, LoadError)>)
where
    I: IntoIterator<Item = (String, &'a str)>,
{
    let mut formats = Vec::new();
    let mut failures = Vec::new();

    for (label, json) in sources {
        match Format::from_json(json, registry) {
            Ok(format) => formats.push(format),
            Err(err) => failures.push((label, err)),
        }
    }

    (formats, failures)
}

/// Finds the first format whose pattern matches `filename`.
pub fn find_format<'a>(formats: &'a [Format], filename: &str) -> Option<&'a Format> {
    formats.iter().find(|f| f.matches(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_with_pattern(pattern: &str) -> Format {
        let json = format!(
            r#"{{"name": "t", "pattern": "{pattern}",
                 "structure": {{"type": "uint8"}}}}"#
        );
        Format::from_json(&json, &Registry::default()).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let format = format_with_pattern("trains.dat");
        assert!(format.matches("trains.dat"));
        assert!(!format.matches("planes.dat"));
    }

    #[test]
    fn test_wildcard_match() {
        let format = format_with_pattern("NODES*.DAT");
        assert!(format.matches("NODES0.DAT"));
        assert!(format.matches("NODES63.DAT"));
        assert!(!format.matches("NODES0.dat"));
        assert!(!format.matches("PATHS0.DAT"));
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let format = format_with_pattern("TRAINS.DAT");
        assert!(format.matches("trains.dat"));
    }

    #[test]
    fn test_find_format_first_match_wins() {
        let a = format_with_pattern("*.dat");
        let b = format_with_pattern("trains.dat");
        let formats = vec![a, b];
        assert_eq!(
            find_format(&formats, "trains.dat").unwrap().pattern,
            "*.dat"
        );
        assert!(find_format(&formats, "readme.txt").is_none());
    }

    #[test]
    fn test_batch_load_skips_bad_schema() {
        let sources = vec![
            (
                "good.json".to_string(),
                r#"{"name": "good", "pattern": "a.bin",
                    "structure": {"type": "uint8"}}"#,
            ),
            (
                "bad.json".to_string(),
                r#"{"name": "bad", "pattern": "b.bin",
                    "structure": {"type": "foo"}}"#,
            ),
        ];

        let (formats, failures) = load_formats(sources, &Registry::default());
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].name, "good");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad.json");
        assert!(failures[0].1.to_string().contains("foo"));
    }

    #[test]
    fn test_missing_pattern_matches_anything() {
        let format = Format::from_json(
            r#"{"structure": {"type": "uint8"}}"#,
            &Registry::default(),
        )
        .unwrap();
        assert_eq!(format.name, "unnamed");
        assert!(format.matches("whatever.bin"));
    }
}
