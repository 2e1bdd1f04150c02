//! Compilation of vocabulary pattern templates into regular expressions.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches `{name}` slots as well as the escaped braces `{{` and `}}`.
static PLACEHOLDER_SLOT: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// An error returned when a pattern template cannot be compiled.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// The boundary mode is not one of `both`, `left`, `right` or `none`.
    #[error("invalid boundary mode '{0}', expected one of both, left, right, none")]
    InvalidBoundaryMode(String),

    /// A placeholder pair is not of the form `key=value`.
    #[error("malformed placeholder pair '{0}', expected key=value")]
    MalformedPlaceholder(String),

    /// The template references a placeholder that has no value.
    #[error("no value for placeholder '{0}'")]
    UnresolvedPlaceholder(String),

    /// The resolved pattern is not a valid regular expression.
    #[error("could not compile pattern '{pattern}'")]
    Regex {
        /// The resolved pattern source.
        pattern: String,
        /// The compilation error.
        #[source]
        source: Box<fancy_regex::Error>,
    },
}

/// Where word boundaries are added around a compiled pattern.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Word boundaries on both sides.
    Both,
    /// A word boundary before the pattern.
    Left,
    /// A word boundary after the pattern.
    Right,
    /// The pattern is used as-is.
    #[default]
    None,
}

impl Boundary {
    /// Returns `true` if a word boundary is required before the pattern.
    pub fn has_left(self) -> bool {
        matches!(self, Boundary::Both | Boundary::Left)
    }

    /// Wraps the pattern source in the word boundaries of this mode.
    pub fn wrap(self, pattern: &str) -> Cow<'_, str> {
        match self {
            Boundary::Both => Cow::Owned(format!(r"\b{pattern}\b")),
            Boundary::Left => Cow::Owned(format!(r"\b{pattern}")),
            Boundary::Right => Cow::Owned(format!(r"{pattern}\b")),
            Boundary::None => Cow::Borrowed(pattern),
        }
    }
}

impl FromStr for Boundary {
    type Err = PatternError;

    /// Parses a boundary mode case-insensitively. An empty string is [`Boundary::None`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" => Ok(Boundary::Both),
            "left" => Ok(Boundary::Left),
            "right" => Ok(Boundary::Right),
            "none" | "" => Ok(Boundary::None),
            _ => Err(PatternError::InvalidBoundaryMode(s.to_owned())),
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Boundary::Both => "both",
            Boundary::Left => "left",
            Boundary::Right => "right",
            Boundary::None => "none",
        })
    }
}

/// Named values substituted into `{name}` slots of a pattern template.
///
/// Parsed from whitespace-separated `key=value` pairs, for instance `n=\d+ unit=psi`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Placeholders(BTreeMap<String, String>);

impl Placeholders {
    /// Returns the value of the given placeholder.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns `true` if there are no placeholder values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substitutes all `{name}` slots of the template.
    ///
    /// `{{` and `}}` produce literal braces. Braces that do not enclose an identifier, such as
    /// the repetition in `\d{3,4}`, are left untouched.
    pub fn resolve<'a>(&self, template: &'a str) -> Result<Cow<'a, str>, PatternError> {
        let mut resolved = String::with_capacity(template.len());
        let mut last = 0;

        for captures in PLACEHOLDER_SLOT.captures_iter(template) {
            let Some(slot) = captures.get(0) else {
                continue;
            };

            resolved.push_str(&template[last..slot.start()]);
            match captures.get(1) {
                Some(name) => {
                    let value = self.get(name.as_str()).ok_or_else(|| {
                        PatternError::UnresolvedPlaceholder(name.as_str().to_owned())
                    })?;
                    resolved.push_str(value);
                }
                None => resolved.push_str(&slot.as_str()[..1]),
            }
            last = slot.end();
        }

        if last == 0 {
            return Ok(Cow::Borrowed(template));
        }

        resolved.push_str(&template[last..]);
        Ok(Cow::Owned(resolved))
    }
}

impl FromStr for Placeholders {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut values = BTreeMap::new();

        for pair in s.split_whitespace() {
            match pair.split_once('=') {
                Some((key, value)) if !key.is_empty() && !value.contains('=') => {
                    values.insert(key.to_owned(), value.to_owned());
                }
                _ => return Err(PatternError::MalformedPlaceholder(pair.to_owned())),
            }
        }

        Ok(Self(values))
    }
}

impl<K, V> FromIterator<(K, V)> for Placeholders
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Compiles a raw pattern source without placeholder resolution or boundaries.
pub(crate) fn compile_raw(pattern: &str, case_insensitive: bool) -> Result<Regex, PatternError> {
    let source = if case_insensitive {
        Cow::Owned(format!("(?i){pattern}"))
    } else {
        Cow::Borrowed(pattern)
    };

    Regex::new(&source).map_err(|source| PatternError::Regex {
        pattern: pattern.to_owned(),
        source: Box::new(source),
    })
}

/// Turns pattern templates into compiled regular expressions.
///
/// Compilation resolves placeholders first and adds word boundaries afterwards. Patterns are
/// case-insensitive unless configured otherwise.
///
/// # Example
///
/// ```
/// use geia_text::PatternCompiler;
///
/// let pattern = PatternCompiler::new().compile("{n}\\s*psi", "n=\\d+", "left").unwrap();
/// assert!(pattern.is_match("at 250 PSI").unwrap());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PatternCompiler {
    case_insensitive: bool,
}

impl PatternCompiler {
    /// Creates a compiler for case-insensitive patterns.
    pub fn new() -> Self {
        Self {
            case_insensitive: true,
        }
    }

    /// Sets whether compiled patterns ignore case.
    pub fn case_insensitive(mut self, value: bool) -> Self {
        self.case_insensitive = value;
        self
    }

    /// Compiles a template with the raw placeholder text and boundary mode of a catalog row.
    pub fn compile(
        &self,
        template: &str,
        placeholders: &str,
        boundary: &str,
    ) -> Result<Regex, PatternError> {
        let boundary = boundary.parse()?;
        let placeholders = placeholders.parse()?;
        self.compile_with(template, &placeholders, boundary)
    }

    /// Compiles a template with parsed placeholders and boundary mode.
    pub fn compile_with(
        &self,
        template: &str,
        placeholders: &Placeholders,
        boundary: Boundary,
    ) -> Result<Regex, PatternError> {
        let resolved = placeholders.resolve(template)?;
        compile_raw(&boundary.wrap(&resolved), self.case_insensitive)
    }
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}
