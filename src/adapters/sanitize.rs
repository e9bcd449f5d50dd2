//! Log sanitization for patient data.
//!
//! Formatted log lines pass through [`SanitizingMakeWriter`] before reaching
//! the sink. It redacts:
//! - Biomarker readings written as `<feature>=<value>`, `<feature>: <value>`
//!   or `<feature>: value <value>` (the coercion error form)
//! - UUIDs and medical record numbers (MRNs)
//! - Email addresses and phone numbers
//!
//! Input is capped per line (`AppConfig::sanitize_max_bytes`) so a huge log
//! line costs bounded work.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::FEATURE_ORDER;

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

/// Default per-line cap; overridden via `IFX_SANITIZE_MAX_BYTES`.
pub const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Pattern {
    regex: Regex,
    replacement: String,
}

struct Patterns {
    set: RegexSet,
    rules: Vec<Pattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// `(?i)\b(Fg|CDAI|...)\s*[:=]\s*(value\s+)?<number, quoted text or JSON literal>`
fn feature_value_pattern() -> String {
    let keys = FEATURE_ORDER
        .iter()
        .map(|f| regex::escape(f.key()))
        .collect::<Vec<_>>()
        .join("|");
    format!(
        r#"(?i)\b((?:{keys}))"?\s*[:=]\s*(?:value\s+)?(?:"(?:[^"\\]|\\.)*"|[-+]?[0-9][0-9.eE+-]{{0,32}}|[-+]?(?:NaN|inf(?:inity)?)|true|false|null|\[[^\]]*\]|\{{[^}}]*\}})"#
    )
}

fn get_patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let rules: Vec<(String, &'static str)> = vec![
            (feature_value_pattern(), "${1}=[REDACTED]"),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}".into(),
                "[REDACTED-UUID]",
            ),
            (r"\bMRN[:\s]?\d{6,10}\b".into(), "[REDACTED-MRN]"),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b".into(),
                "[REDACTED-EMAIL]",
            ),
            (
                r"\b(?:\+?\d{1,3}[-.\s])?\(?\d{3}\)?[-.\s]\d{3,4}[-.\s]\d{4}\b".into(),
                "[REDACTED-PHONE]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| p.as_str())).expect("Valid regex set");
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| Pattern {
                regex: Regex::new(&pattern).expect("Valid regex"),
                replacement: replacement.to_string(),
            })
            .collect();
        Patterns { set, rules }
    })
}

/// Replace patient data in `input` with redaction markers.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, DEFAULT_SANITIZE_MAX_BYTES)
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let rule = &patterns.rules[idx];
        result = rule
            .regex
            .replace_all(&result, rule.replacement.as_str())
            .into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// A `tracing_subscriber` writer wrapper that sanitizes each formatted log
/// line before it is written to the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
    max_bytes: usize,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            max_bytes: DEFAULT_SANITIZE_MAX_BYTES,
        }
    }

    /// Override the per-line cap; zero keeps the default.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        if max_bytes > 0 {
            self.max_bytes = max_bytes;
        }
        self
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
    max_bytes: usize,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W, max_bytes: usize) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            max_bytes,
        }
    }

    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner
            .write_all(sanitize_with_limit(&text, self.max_bytes).as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A line with no newline must not buffer without bound.
        if self.buffer.len() > self.max_bytes.saturating_mul(2) {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer(), self.max_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorReport, FeatureVector, RawValue};
    use std::io::Write;

    #[test]
    fn test_sanitize_feature_values() {
        let sanitized = sanitize("submitted Fg=3.2 CDAI: 150 ALB=40");
        assert!(sanitized.contains("Fg=[REDACTED]"));
        assert!(sanitized.contains("CDAI=[REDACTED]"));
        assert!(sanitized.contains("ALB=[REDACTED]"));
        assert!(!sanitized.contains("3.2"));
        assert!(!sanitized.contains("150"));
    }

    #[test]
    fn test_sanitize_multiword_and_quoted_keys() {
        let sanitized = sanitize(r#"{"Lesion site": 3, "D-Dimer": "0.7"}"#);
        assert!(sanitized.contains("Lesion site=[REDACTED]"));
        assert!(sanitized.contains("D-Dimer=[REDACTED]"));
        assert!(!sanitized.contains("0.7"));
    }

    #[test]
    fn test_sanitize_coercion_report() {
        let mut map = FeatureVector::defaults().to_map();
        map.insert("Fg".into(), RawValue::from("12.5.3"));
        let err = FeatureVector::from_map(&map).expect_err("not numeric");

        let line = sanitize(&format!("WARN Prediction failed: {}", ErrorReport::from(&err)));
        assert!(line.contains("TypeCoercionError"));
        assert!(line.contains("Fg=[REDACTED]"));
        assert!(!line.contains("12.5.3"), "leaked: {line}");

        let other = sanitize(r#"Feature ADA: value "4,2 \"approx\" and more" is not a finite real number"#);
        assert!(!other.contains("approx"), "leaked: {other}");
        assert!(sanitize("Feature CDAI: value true is not").contains("CDAI=[REDACTED] is not"));
    }

    #[test]
    fn test_sanitize_leaves_plain_text() {
        let input = "Loaded artifacts from \"models\"";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_sanitize_identifiers() {
        let sanitized = sanitize(
            "patient 550e8400-e29b-41d4-a716-446655440000 MRN:12345678 nurse@hospital.org",
        );
        assert!(sanitized.contains("[REDACTED-UUID]"));
        assert!(sanitized.contains("[REDACTED-MRN]"));
        assert!(sanitized.contains("[REDACTED-EMAIL]"));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("prefix ééééé suffix", 9);
        assert!(sanitized.ends_with(" [TRUNCATED]"));
        assert!(sanitized.starts_with("prefix "));
    }

    #[test]
    fn test_writer_sanitizes_each_line() {
        let mut writer = SanitizingWriter::new(Vec::new(), DEFAULT_SANITIZE_MAX_BYTES);
        writer.write_all(b"Age=54\nWBC=").expect("write");
        writer.write_all(b"6.1\n").expect("write");
        writer.flush().expect("flush");

        let out = String::from_utf8(writer.inner).expect("utf8");
        assert_eq!(out, "Age=[REDACTED]\nWBC=[REDACTED]\n");
    }
}
