//! Parsing of translation lines and language pairs.

use crate::error::PipelineError;

/// One `source<delimiter>target` pair taken from a single input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    /// 1-based position of the line in the input.
    pub index: usize,
    pub source: String,
    pub target: String,
}

impl TranslationEntry {
    /// Parse one input line.
    ///
    /// Trailing whitespace is stripped first. The line must then split into
    /// exactly two non-empty fields around `delimiter`.
    pub fn parse(index: usize, line: &str, delimiter: &str) -> Result<Self, PipelineError> {
        let line = line.trim_end();
        match split_pair(line, delimiter) {
            Some((source, target)) => Ok(Self {
                index,
                source: source.to_string(),
                target: target.to_string(),
            }),
            None => Err(PipelineError::MalformedEntry {
                index,
                line: line.to_string(),
            }),
        }
    }
}

/// Source and target language codes, fixed for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    /// Parse a pair such as `en:ru` using the same delimiter as the entries.
    pub fn parse(value: &str, delimiter: &str) -> Result<Self, PipelineError> {
        split_pair(value.trim(), delimiter)
            .map(|(source, target)| Self {
                source: source.to_string(),
                target: target.to_string(),
            })
            .ok_or_else(|| PipelineError::InvalidLanguagePair {
                value: value.to_string(),
                delimiter: delimiter.to_string(),
            })
    }
}

/// Result of parsing a whole input: valid entries in input order plus the
/// rejected lines.
#[derive(Debug, Default)]
pub struct ParsedEntries {
    pub entries: Vec<TranslationEntry>,
    pub rejected: Vec<PipelineError>,
}

/// Parse every line, logging and collecting malformed ones instead of
/// stopping at the first bad line.
pub fn parse_entries<I, L>(lines: I, delimiter: &str) -> ParsedEntries
where
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
{
    let mut parsed = ParsedEntries::default();
    for (idx, line) in lines.into_iter().enumerate() {
        match TranslationEntry::parse(idx + 1, line.as_ref(), delimiter) {
            Ok(entry) => parsed.entries.push(entry),
            Err(err) => {
                log::warn!("{err}");
                parsed.rejected.push(err);
            }
        }
    }
    parsed
}

fn split_pair<'a>(value: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    if delimiter.is_empty() {
        return None;
    }
    let mut fields = value.split(delimiter);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(first), Some(second), None) if !first.is_empty() && !second.is_empty() => {
            Some((first, second))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pair_around_delimiter() {
        let entry = TranslationEntry::parse(1, "cat:кот", ":").unwrap();
        assert_eq!(entry.source, "cat");
        assert_eq!(entry.target, "кот");
        assert_eq!(entry.index, 1);
    }

    #[test]
    fn strips_line_terminating_whitespace() {
        let entry = TranslationEntry::parse(1, "dog:собака \r\n", ":").unwrap();
        assert_eq!(entry.target, "собака");
    }

    #[test]
    fn keeps_spaces_inside_words() {
        let entry = TranslationEntry::parse(1, "hello world:привет", ":").unwrap();
        assert_eq!(entry.source, "hello world");
    }

    #[test]
    fn supports_multi_character_delimiters() {
        let entry = TranslationEntry::parse(1, "house => дом", " => ").unwrap();
        assert_eq!(entry.source, "house");
        assert_eq!(entry.target, "дом");
    }

    #[test]
    fn rejects_wrong_field_counts() {
        for line in ["standalone", "a:b:c", "", "   ", ":кот", "cat:"] {
            let err = TranslationEntry::parse(4, line, ":").unwrap_err();
            assert!(
                matches!(err, PipelineError::MalformedEntry { index: 4, .. }),
                "line {line:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_entries_skips_bad_lines_and_keeps_order() {
        let parsed = parse_entries(["cat:кот", "standalone", "dog:собака"], ":");
        let sources: Vec<&str> = parsed.entries.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["cat", "dog"]);
        assert_eq!(parsed.entries[1].index, 3);
        assert_eq!(parsed.rejected.len(), 1);
        assert!(matches!(
            &parsed.rejected[0],
            PipelineError::MalformedEntry { index: 2, line } if line == "standalone"
        ));
    }

    #[test]
    fn parses_language_pair() {
        let pair = LanguagePair::parse("en:ru", ":").unwrap();
        assert_eq!(pair.source, "en");
        assert_eq!(pair.target, "ru");
    }

    #[test]
    fn rejects_language_pair_without_delimiter() {
        assert!(matches!(
            LanguagePair::parse("en-ru", ":"),
            Err(PipelineError::InvalidLanguagePair { .. })
        ));
    }
}
