//! Log sanitization for on-chain identifiers and secret material.
//!
//! Diary logs naturally mention accounts, ciphertext handles, proofs and
//! transaction hashes. These helpers redact them from formatted log lines:
//! - Wallet and contract addresses (`0x` + 40 hex)
//! - Ciphertext handles and transaction hashes (`0x` + 64 hex)
//! - Long hex or base64 blobs (serialized ciphertexts, proofs, signatures)
//! - Contextual secrets (`seed=...`, `private_key: ...`)
//!
//! # Important: prefer redaction-by-type
//!
//! Domain types (`Handle`, `EncryptedInput`) already print short, non-sensitive
//! `Debug` forms. String sanitizing is the fallback for what slips through.
//!
//! # Performance / DoS
//!
//! `sanitize()` caps its input (see `CIPHERDIARY_SANITIZE_MAX_BYTES`).

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

/// Compiled redaction patterns.
static PATTERNS: OnceLock<RedactionPatterns> = OnceLock::new();

/// Default maximum number of bytes sanitized per call (16 KiB).
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct RedactionPattern {
    regex: Regex,
    replacement: &'static str,
}

struct RedactionPatterns {
    set: RegexSet,
    patterns: Vec<RedactionPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("CIPHERDIARY_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static RedactionPatterns {
    PATTERNS.get_or_init(|| {
        // Order matters: longer hex forms are replaced before shorter ones.
        let rules: Vec<(&'static str, &'static str)> = vec![
            // Contextual secrets first, so the value is not half-matched below.
            (
                r"(?i)\b(?:seed|secret|private[_-]?key|signing[_-]?key|password|mnemonic)\b\s*[:=]\s*\S{8,}",
                "[REDACTED-SECRET]",
            ),
            // Handles and transaction hashes
            (r"\b0x[0-9a-fA-F]{64}\b", "[REDACTED-HANDLE]"),
            // Addresses
            (r"\b0x[0-9a-fA-F]{40}\b", "[REDACTED-ADDRESS]"),
            // Bare long hex (proofs, signatures, serialized keys)
            (r"\b[0-9a-fA-F]{64,}\b", "[REDACTED-BLOB]"),
            // Long base64 runs (serialized ciphertexts)
            (r"[A-Za-z0-9+/]{64,}={0,2}", "[REDACTED-BLOB]"),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| RedactionPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        RedactionPatterns { set, patterns }
    })
}

/// Sanitize a string by replacing identifiers and secrets.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    if patterns.set.is_match(prefix) {
        // Apply every pattern in order; a match of one can expose another.
        for pattern in &patterns.patterns {
            if pattern.regex.is_match(&result) {
                result = pattern
                    .regex
                    .replace_all(&result, pattern.replacement)
                    .into_owned();
            }
        }
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains anything `sanitize` would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().set.is_match(prefix)
}

/// A `tracing_subscriber` writer wrapper that sanitizes formatted log output
/// before it is written to the underlying sink.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M> Clone for SanitizingMakeWriter<M>
where
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A formatter writing one huge line must not buffer without bound.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if hard_cap > 0 && self.buffer.len() > hard_cap {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
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
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_address() {
        let input = "Wallet connected: 0x00112233445566778899aabbccddeeff00112233";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-ADDRESS]"));
        assert!(!sanitized.contains("00112233"));
    }

    #[test]
    fn test_sanitize_handle() {
        let input = format!("handle 0x{} resolved", "ab".repeat(32));
        let sanitized = sanitize(&input);
        assert!(sanitized.contains("[REDACTED-HANDLE]"));
        assert!(!sanitized.contains("[REDACTED-ADDRESS]"));
    }

    #[test]
    fn test_sanitize_signature_blob() {
        let input = format!("proof={}", "0f".repeat(64));
        assert!(sanitize(&input).contains("[REDACTED-BLOB]"));
    }

    #[test]
    fn test_sanitize_contextual_secret() {
        let sanitized = sanitize("gateway seed=QWxhZGRpbjpvcGVuIHNlc2FtZQ");
        assert!(sanitized.contains("[REDACTED-SECRET]"));
        assert!(!sanitized.contains("QWxhZGRp"));
    }

    #[test]
    fn test_short_handle_debug_is_kept() {
        // The Debug form of a handle carries only 4 bytes and stays readable.
        let input = "Encrypted input Handle(0xabababab..) (ciphertext size: 4096 bytes)";
        assert_eq!(sanitize(input), input);
        assert!(!contains_sensitive(input));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let input = "prefix 0x00112233445566778899aabbccddeeff00112233 suffix";
        let sanitized = sanitize_with_limit(input, 16);
        assert!(sanitized.ends_with("[TRUNCATED]"));
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut writer = SanitizingWriter::new(Vec::new());
        writer
            .write_all(b"first 0x00112233445566778899aabbccddeeff00112233\nsecond")
            .expect("write");
        writer.flush().expect("flush");
        let out = String::from_utf8(std::mem::take(&mut writer.inner)).expect("utf8");
        assert_eq!(out, "first [REDACTED-ADDRESS]\nsecond");
    }
}
