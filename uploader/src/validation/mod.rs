//! Batch validation for candidate files.
//!
//! A batch is judged as one unit: every file is checked for size and type,
//! the batch as a whole is checked against the remaining queue capacity,
//! and all reasons are collected. Any reason rejects the whole batch.
//!
//! # Accept patterns
//!
//! - `.pdf` - file-name suffix, case-insensitive
//! - `image/*` - MIME pattern, `*` matches any run of characters
//! - `application/pdf` - exact MIME type, case-insensitive
//! - `*`, `*/*` or an empty list - accept everything
//!
//! # Example
//!
//! ```rust,ignore
//! use dropload::{CandidateFile, ValidationPolicy, Verdict};
//!
//! let policy = ValidationPolicy::new(&[".pdf"], 5_000_000, 5)?;
//! let batch = vec![CandidateFile::new("report.pdf", 4_000_000, "application/pdf")];
//! assert!(matches!(policy.evaluate(&batch, 0), Verdict::Accepted));
//! ```

use regex::{Regex, RegexBuilder};

use crate::error::{ConfigError, ConfigResult, ValidationError};
use crate::models::CandidateFile;

/// Outcome of evaluating a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Ordered reasons: per-file reasons in submission order, then the count reason.
    Rejected(Vec<ValidationError>),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// A compiled accept pattern.
#[derive(Debug, Clone)]
pub enum AcceptPattern {
    /// Lowercased suffix including the leading dot.
    Extension(String),
    /// Exact MIME type, lowercased.
    Mime(String),
    /// MIME pattern containing `*`.
    MimeWildcard(Regex),
}

impl AcceptPattern {
    /// Parse one pattern. Returns `None` for accept-all patterns.
    pub fn parse(raw: &str) -> ConfigResult<Option<Self>> {
        let pattern = raw.trim();
        if pattern.is_empty() || pattern == "*" || pattern == "*/*" {
            return Ok(None);
        }

        if pattern.starts_with('.') {
            return Ok(Some(AcceptPattern::Extension(pattern.to_lowercase())));
        }

        if !pattern.contains('/') {
            // Bare extension such as "pdf"
            return Ok(Some(AcceptPattern::Extension(format!(
                ".{}",
                pattern.to_lowercase()
            ))));
        }

        if !pattern.contains('*') {
            return Ok(Some(AcceptPattern::Mime(pattern.to_lowercase())));
        }

        let source = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = RegexBuilder::new(&format!("^{}$", source))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(AcceptPattern::MimeWildcard(regex)))
    }

    /// Whether this pattern admits the file.
    pub fn matches(&self, file: &CandidateFile) -> bool {
        match self {
            AcceptPattern::Extension(ext) => file.name.to_lowercase().ends_with(ext.as_str()),
            AcceptPattern::Mime(mime) => {
                !file.mime_type.is_empty() && file.mime_type.eq_ignore_ascii_case(mime)
            }
            AcceptPattern::MimeWildcard(regex) => {
                !file.mime_type.is_empty() && regex.is_match(&file.mime_type)
            }
        }
    }
}

/// Decides whether a batch may enter the queue.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Empty when every type is accepted.
    patterns: Vec<AcceptPattern>,
    max_size_bytes: u64,
    max_count: usize,
}

impl ValidationPolicy {
    /// Build a policy from raw accept patterns.
    ///
    /// Any accept-all pattern (`*`, `*/*`, empty) disables the type check.
    pub fn new<S: AsRef<str>>(
        accept: &[S],
        max_size_bytes: u64,
        max_count: usize,
    ) -> ConfigResult<Self> {
        let mut patterns = Vec::with_capacity(accept.len());
        let mut accept_all = accept.is_empty();
        for raw in accept {
            match AcceptPattern::parse(raw.as_ref())? {
                Some(pattern) => patterns.push(pattern),
                None => accept_all = true,
            }
        }
        if accept_all {
            patterns.clear();
        }

        Ok(Self {
            patterns,
            max_size_bytes,
            max_count,
        })
    }

    pub fn accepts_all_types(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Evaluate a batch against the current queue length.
    pub fn evaluate(&self, batch: &[CandidateFile], queue_len: usize) -> Verdict {
        let mut reasons = Vec::new();

        for file in batch {
            if file.size > self.max_size_bytes {
                reasons.push(ValidationError::SizeExceeded {
                    file: file.name.clone(),
                    size: file.size,
                    limit: self.max_size_bytes,
                });
            }

            if !self.type_accepted(file) {
                reasons.push(ValidationError::TypeRejected {
                    file: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                });
            }
        }

        if queue_len + batch.len() > self.max_count {
            reasons.push(ValidationError::TooManyFiles {
                submitted: batch.len(),
                queued: queue_len,
                max: self.max_count,
            });
        }

        if reasons.is_empty() {
            Verdict::Accepted
        } else {
            Verdict::Rejected(reasons)
        }
    }

    fn type_accepted(&self, file: &CandidateFile) -> bool {
        self.accepts_all_types() || self.patterns.iter().any(|p| p.matches(file))
    }
}

/// Render a byte count in megabytes (1 MB = 1024 * 1024 bytes).
///
/// Whole values print without decimals: `10485760` -> `"10 MB"`,
/// `5000000` -> `"4.77 MB"`.
pub fn format_megabytes(bytes: u64) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    let rendered = format!("{:.2}", mb);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} MB", trimmed)
}
