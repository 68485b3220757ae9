//! Requirements manifest parsing.
//!
//! A manifest is UTF-8 text with one requirement per line in the form
//! `<name><operator><version>`. Blank lines are skipped, and a `#` at the
//! start of a line or preceded by whitespace begins a comment. Only the
//! exact-equality operator `==` is supported; parsing is all-or-nothing.

use std::fmt;

/// A single parsed requirement: package name plus version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub specifier: Specifier,
}

/// Version constraint attached to a requirement (PEP 508 style).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub comparison: Comparison,
    pub version: String,
}

/// Version comparison operators recognized in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `===`
    Arbitrary,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `~=`
    Compatible,
    /// `<`
    Less,
    /// `>`
    Greater,
}

impl Comparison {
    /// Operator tokens ordered longest-first so `===` is never mis-read as
    /// `==` followed by a stray `=`.
    const TOKENS: [(&'static str, Comparison); 8] = [
        ("===", Comparison::Arbitrary),
        ("==", Comparison::Equal),
        ("!=", Comparison::NotEqual),
        ("<=", Comparison::LessEqual),
        (">=", Comparison::GreaterEqual),
        ("~=", Comparison::Compatible),
        ("<", Comparison::Less),
        (">", Comparison::Greater),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Arbitrary => "===",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
            Comparison::LessEqual => "<=",
            Comparison::GreaterEqual => ">=",
            Comparison::Compatible => "~=",
            Comparison::Less => "<",
            Comparison::Greater => ">",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while parsing a requirements manifest.
///
/// Every variant carries the 1-based line number and the offending line so
/// the failure can be pointed at directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line uses a version operator other than `==`.
    UnsupportedSpecifier {
        line: usize,
        comparison: Comparison,
        input: String,
    },
    /// The line carries no version operator at all.
    MissingSpecifier { line: usize, input: String },
    /// Nothing to the left of the operator.
    MissingName { line: usize, input: String },
    /// Nothing to the right of the operator.
    MissingVersion { line: usize, input: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnsupportedSpecifier {
                line,
                comparison,
                input,
            } => write!(
                f,
                "line {}: version specifier {} is not supported (only == is): {}",
                line, comparison, input
            ),
            ParseError::MissingSpecifier { line, input } => write!(
                f,
                "line {}: missing version specifier (expected <name>==<version>): {}",
                line, input
            ),
            ParseError::MissingName { line, input } => {
                write!(f, "line {}: missing package name: {}", line, input)
            }
            ParseError::MissingVersion { line, input } => {
                write!(f, "line {}: missing version: {}", line, input)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Strip a trailing comment: a `#` at the start of the line or preceded by
/// whitespace removes the rest of the line.
fn strip_comment(line: &str) -> &str {
    let mut prev_is_space = true;
    for (i, c) in line.char_indices() {
        if c == '#' && prev_is_space {
            return &line[..i];
        }
        prev_is_space = c.is_whitespace();
    }
    line
}

/// Find the earliest comparison operator in the line, longest-match-first.
/// Returns the byte offset of the operator and its parsed form.
fn find_comparison(line: &str) -> Option<(usize, Comparison)> {
    for (i, _) in line.char_indices() {
        for (token, comparison) in Comparison::TOKENS {
            if line[i..].starts_with(token) {
                return Some((i, comparison));
            }
        }
    }
    None
}

/// Parse a requirements manifest into an ordered list of requirements.
///
/// Parsing is all-or-nothing: the first malformed line aborts the whole
/// parse, and no partial requirement list is returned.
#[tracing::instrument(skip(manifest))]
pub fn parse_requirements(manifest: &str) -> Result<Vec<Requirement>, ParseError> {
    let mut requirements = Vec::new();

    for (index, raw_line) in manifest.lines().enumerate() {
        let line_number = index + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((at, comparison)) = find_comparison(line) else {
            return Err(ParseError::MissingSpecifier {
                line: line_number,
                input: line.to_string(),
            });
        };

        if comparison != Comparison::Equal {
            return Err(ParseError::UnsupportedSpecifier {
                line: line_number,
                comparison,
                input: line.to_string(),
            });
        }

        let name = line[..at].trim();
        let version = line[at + comparison.as_str().len()..].trim();

        if name.is_empty() {
            return Err(ParseError::MissingName {
                line: line_number,
                input: line.to_string(),
            });
        }
        if version.is_empty() {
            return Err(ParseError::MissingVersion {
                line: line_number,
                input: line.to_string(),
            });
        }

        requirements.push(Requirement {
            name: name.to_string(),
            specifier: Specifier {
                comparison,
                version: version.to_string(),
            },
        });
    }

    Ok(requirements)
}
