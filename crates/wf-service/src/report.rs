//! Final report of a service run.
//!
//! Text output is one `word: count` line per word in lexicographic order.
//! With a `top` limit, the most frequent words are listed instead, highest
//! count first. JSON output is an object with `stats`, the word totals, and
//! a `words` map whose keys are always sorted.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;
use wf_core::WordCount;

use crate::stats::ServiceSnapshot;

/// Output format of a [`ServiceReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// `word: count` lines.
    #[default]
    Text,
    /// A pretty-printed JSON object.
    Json,
}

/// The global word count and statistics at shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    /// Final counters.
    pub stats: ServiceSnapshot,
    /// The global word count.
    pub words: WordCount,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    stats: &'a ServiceSnapshot,
    distinct_words: usize,
    total_words: u64,
    words: BTreeMap<&'a str, u64>,
}

impl ServiceReport {
    /// Returns the number of distinct words.
    #[inline]
    #[must_use]
    pub fn distinct_words(&self) -> usize {
        self.words.len()
    }

    /// Returns the sum of all word occurrences.
    #[inline]
    #[must_use]
    pub fn total_words(&self) -> u64 {
        self.words.total()
    }

    /// Returns the words to report, sorted by word or, with `top`, by rank.
    #[must_use]
    pub fn entries(&self, top: Option<usize>) -> Vec<(&str, u64)> {
        match top {
            Some(n) => self.words.top(n),
            None => self.words.sorted(),
        }
    }

    /// Writes the report to `out` in `format`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from `out`.
    pub fn write_to<W: Write>(
        &self,
        out: &mut W,
        format: ReportFormat,
        top: Option<usize>,
    ) -> io::Result<()> {
        match format {
            ReportFormat::Text => {
                for (word, count) in self.entries(top) {
                    writeln!(out, "{word}: {count}")?;
                }
            }
            ReportFormat::Json => {
                let report = JsonReport {
                    stats: &self.stats,
                    distinct_words: self.distinct_words(),
                    total_words: self.total_words(),
                    words: self.entries(top).into_iter().collect(),
                };
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
            }
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::tokenize;

    fn report() -> ServiceReport {
        ServiceReport {
            stats: ServiceSnapshot {
                batches_merged: 2,
                ..ServiceSnapshot::default()
            },
            words: tokenize(b"pear apple pear fig pear apple"),
        }
    }

    fn render(report: &ServiceReport, format: ReportFormat, top: Option<usize>) -> String {
        let mut out = Vec::new();
        report.write_to(&mut out, format, top).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_is_lexicographic() {
        let text = render(&report(), ReportFormat::Text, None);
        insta::assert_snapshot!(text, @r"
        apple: 2
        fig: 1
        pear: 3
        ");
    }

    #[test]
    fn test_text_top_is_ranked() {
        let text = render(&report(), ReportFormat::Text, Some(2));
        insta::assert_snapshot!(text, @r"
        pear: 3
        apple: 2
        ");
    }

    #[test]
    fn test_json_shape() {
        let json = render(&report(), ReportFormat::Json, None);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["stats"]["batches_merged"], 2);
        assert_eq!(value["distinct_words"], 3);
        assert_eq!(value["total_words"], 6);
        assert_eq!(value["words"]["pear"], 3);
    }

    #[test]
    fn test_json_top_limits_words() {
        let json = render(&report(), ReportFormat::Json, Some(1));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let words = value["words"].as_object().unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words["pear"], 3);
    }

    #[test]
    fn test_empty_report() {
        let empty = ServiceReport {
            stats: ServiceSnapshot::default(),
            words: WordCount::new(),
        };
        assert_eq!(render(&empty, ReportFormat::Text, None), "");
        assert_eq!(empty.total_words(), 0);
    }
}
