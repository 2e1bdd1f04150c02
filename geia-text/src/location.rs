//! Tagging of well locations in free text.
//!
//! Records mention locations as a facility prefix followed by a well number and optional section
//! letters, for instance `gu abc 12u`. Where the prefix is missing, the location falls back to
//! the facility of the record. Every recognized well becomes a `<LOC: Name|Letter|WellSection>`
//! tag.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::substitution::{Batch, Segment, normalize_whitespace, segments};

/// Finds facility prefixes such as `gu`, `ta` or `gu abc` at word starts.
static LOCATION_PREFIX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)\b(?:gu|sm|je|[pld]a|t[aeu]|ib|bi)(?:abc|[a-frq]x?)?").unwrap()
});

/// Splits a facility prefix into its name and letter.
static LOCATION_NAME: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)^(gu|sm|je|[pld]a|t[aeu]|ib|bi)((?:abc|[a-frq]x?)?)").unwrap()
});

/// Text following a prefix that makes the prefix part of an ordinary word.
///
/// Matched case-sensitively against the text right after the prefix.
static WORD_CONTINUATION: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(?:[a-z]{3,}|st|h)").unwrap());

/// Matches an optional letter, a well number and optional section letters.
static WELL_SECTION: LazyLock<fancy_regex::Regex> = LazyLock::new(|| {
    fancy_regex::Regex::new(concat!(
        r"(?i)((?:abc|[a-frq]x?)?)[-/\s\\.,]*([0-5]?\d)[-/\s\\.,]*",
        r"(?!(?:[%>]|:\d+))((?:[uil]+[-/\s\\and&]*[ul]?)?)\b[-/\s\\.,]*(?:and|&)?",
    ))
    .unwrap()
});

/// Facilities known without further configuration.
const BUILTIN_FACILITIES: &[(&str, &str, &str)] = &[
    ("Guntong ABC", "Gu", "ABC"),
    ("Guntong D", "Gu", "D"),
    ("Guntong F", "Gu", "F"),
    ("Irong Barat A", "Ib", "A"),
    ("Palas", "Pa", "A"),
    ("Semangkok A", "Sm", "A"),
    ("Tabu", "Tu", "X"),
    ("Tapis", "Ta", "X"),
    ("Tapis B", "Ta", "B"),
];

/// An error returned when locations cannot be tagged.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    /// The record has no facility.
    #[error("no facility for record {key}")]
    MissingFacility {
        /// The record key.
        key: String,
    },

    /// The facility of a record is not part of the directory.
    #[error("unknown facility '{facility}' for record {key}")]
    UnknownFacility {
        /// The record key.
        key: String,
        /// The full facility name.
        facility: String,
    },

    /// A directory entry is not of the form `Name Letter`.
    #[error("malformed short code '{value}' for facility '{name}', expected 'Name Letter'")]
    MalformedFacility {
        /// The full facility name.
        name: String,
        /// The malformed short code.
        value: String,
    },
}

/// Capitalizes a facility name, as in `Gu`.
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Uppercases a facility letter, as in `ABC`.
pub fn normalize_letter(letter: &str) -> String {
    letter.to_uppercase()
}

/// Pads a well number to at least two digits, as in `07`.
pub fn normalize_well(well: &str) -> String {
    format!("{well:0>2}")
}

/// Uppercases section letters and drops repeated ones, as in `UL`.
pub fn normalize_section(section: &str) -> String {
    let mut normalized = String::with_capacity(section.len());
    for c in section.chars().flat_map(char::to_uppercase) {
        if !normalized.contains(c) {
            normalized.push(c);
        }
    }
    normalized
}

/// A facility short code and letter.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Facility {
    /// The short name, such as `Gu`.
    pub name: String,
    /// The facility letter, such as `ABC`.
    pub letter: String,
}

impl Facility {
    /// Creates a facility from its short name and letter.
    pub fn new(name: impl Into<String>, letter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            letter: letter.into(),
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.letter)
    }
}

/// Maps full facility names to their short code and letter.
///
/// Serialized as a map from full name to `"Name Letter"`, for instance
/// `"Guntong ABC": "Gu ABC"`. Defaults to the built-in facilities.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct FacilityDirectory {
    entries: BTreeMap<String, Facility>,
}

impl FacilityDirectory {
    /// Creates a directory from full names and short codes of the form `Name Letter`.
    pub fn new<I, N, V>(entries: I) -> Result<Self, LocationError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: AsRef<str>,
    {
        let mut directory = BTreeMap::new();

        for (name, value) in entries {
            let name = name.into();
            let value = value.as_ref();

            let mut parts = value.split_whitespace();
            let (Some(short), Some(letter), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(LocationError::MalformedFacility {
                    name,
                    value: value.to_owned(),
                });
            };

            directory.insert(name.trim().to_owned(), Facility::new(short, letter));
        }

        Ok(Self { entries: directory })
    }

    /// Returns the facility with the given full name.
    pub fn get(&self, name: &str) -> Option<&Facility> {
        self.entries.get(name.trim())
    }

    /// Returns the number of facilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the directory has no facilities.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FacilityDirectory {
    fn default() -> Self {
        let entries = BUILTIN_FACILITIES
            .iter()
            .map(|&(name, short, letter)| (name.to_owned(), Facility::new(short, letter)))
            .collect();

        Self { entries }
    }
}

impl TryFrom<BTreeMap<String, String>> for FacilityDirectory {
    type Error = LocationError;

    fn try_from(value: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FacilityDirectory> for BTreeMap<String, String> {
    fn from(value: FacilityDirectory) -> Self {
        value
            .entries
            .into_iter()
            .map(|(name, facility)| (name, facility.to_string()))
            .collect()
    }
}

/// A well location.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Location {
    name: String,
    letter: String,
    well: String,
    section: String,
}

impl Location {
    /// Creates a normalized location from raw parts.
    pub fn new(name: &str, letter: &str, well: &str, section: &str) -> Self {
        Self {
            name: normalize_name(name),
            letter: normalize_letter(letter),
            well: normalize_well(well),
            section: normalize_section(section),
        }
    }

    /// Returns the facility name, such as `Gu`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the facility letter, such as `ABC`.
    pub fn letter(&self) -> &str {
        &self.letter
    }

    /// Returns the well number, such as `07`.
    pub fn well(&self) -> &str {
        &self.well
    }

    /// Returns the section letters, such as `UL`.
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Returns `true` if the location has no facility name.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Returns the tags for this location, one per distinct section letter.
    ///
    /// ```
    /// use geia_text::Location;
    ///
    /// let location = Location::new("gu", "abc", "7", "ul");
    /// assert_eq!(location.tags(), ["<LOC: Gu|ABC|07U>", "<LOC: Gu|ABC|07L>"]);
    /// ```
    pub fn tags(&self) -> Vec<String> {
        if self.section.is_empty() {
            return vec![format!("<LOC: {}|{}|{}>", self.name, self.letter, self.well)];
        }

        self.section
            .chars()
            .map(|section| {
                format!(
                    "<LOC: {}|{}|{}{section}>",
                    self.name, self.letter, self.well
                )
            })
            .collect()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tags().join(" "))
    }
}

/// Splits text at facility prefixes, keeping the prefixes as separate tokens.
///
/// The result alternates between text and prefixes, starting and ending with text.
fn split_prefixes(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for prefix in LOCATION_PREFIX.find_iter(text) {
        tokens.push(&text[last..prefix.start()]);
        tokens.push(prefix.as_str());
        last = prefix.end();
    }

    tokens.push(&text[last..]);
    tokens
}

/// Scans the text of a single record.
///
/// The well, section and letter carry over from one match to the next within the record. The
/// facility name and letter fall back to the record's facility whenever a token is not a facility
/// prefix, or is a prefix that merely starts an ordinary word.
struct LocationScanner<'a> {
    fallback: &'a Facility,
    location: Location,
    output: String,
}

impl<'a> LocationScanner<'a> {
    fn new(fallback: &'a Facility) -> Self {
        Self {
            fallback,
            location: Location::default(),
            output: String::new(),
        }
    }

    fn scan(mut self, text: &str) -> String {
        for segment in segments(text) {
            match segment {
                Segment::Text(span) => self.scan_span(span),
                Segment::Tag(tag) => self.output.push_str(tag),
            }
        }

        normalize_whitespace(&self.output)
    }

    fn set_facility(&mut self, name: &str, letter: &str) {
        let location = &self.location;
        self.location = Location::new(name, letter, &location.well, &location.section);
    }

    fn reset_facility(&mut self) {
        let fallback = self.fallback;
        self.set_facility(&fallback.name, &fallback.letter);
    }

    fn scan_span(&mut self, span: &str) {
        let tokens = split_prefixes(span);
        let mut cursor = 0;

        while let Some(&current) = tokens.get(cursor) {
            let next = tokens.get(cursor + 1).copied().unwrap_or_default();

            match LOCATION_NAME.captures(current) {
                Some(captures) => {
                    cursor += 2;

                    let window = format!("{current}{next}");
                    if WORD_CONTINUATION.is_match(next) {
                        self.reset_facility();
                        self.scan_wells(&window, None);
                        continue;
                    }

                    self.set_facility(&captures[1], &captures[2]);

                    let prefix_end = captures[0].len();
                    self.scan_wells(&window, Some(prefix_end));
                }
                None => {
                    cursor += 1;

                    self.reset_facility();
                    self.scan_wells(current, None);
                }
            }
        }
    }

    /// Replaces every well in the window with its location tags.
    ///
    /// With an accepted prefix, the first tag takes the place of the prefix and the text between
    /// the prefix and the well follows the tag.
    fn scan_wells(&mut self, window: &str, mut prefix_end: Option<usize>) {
        let mut rest = window;

        loop {
            let captures = match WELL_SECTION.captures(rest) {
                Ok(Some(captures)) => captures,
                Ok(None) => break,
                Err(error) => {
                    geia_log::warn!(error = %error, "could not match text, leaving it unchanged");
                    break;
                }
            };

            let Some(matched) = captures.get(0) else {
                break;
            };

            let explicit_letter = captures.get(1).map_or("", |m| m.as_str());
            let well = captures.get(2).map_or("", |m| m.as_str());
            let section: String = captures
                .get(3)
                .map_or("", |m| m.as_str())
                .chars()
                .filter(|c| matches!(c.to_ascii_lowercase(), 'u' | 'i' | 'l'))
                .collect();

            let letter = if explicit_letter.is_empty()
                || explicit_letter.eq_ignore_ascii_case(&self.location.letter)
            {
                self.location.letter.clone()
            } else {
                explicit_letter.to_owned()
            };

            self.location = Location::new(&self.location.name, &letter, well, &section);
            geia_log::trace!(location = %self.location, "tagged location");

            let tags = self.location.tags().join(" ");
            match prefix_end.take() {
                Some(end) => {
                    let between = rest.get(end..matched.start()).unwrap_or_default();
                    self.output.push_str(&format!("  {tags} {between} "));
                }
                None => {
                    let before = &rest[..matched.start()];
                    self.output.push_str(&format!(" {before} {tags} "));
                }
            }

            rest = &rest[matched.end()..];
        }

        self.output.push_str(rest);
    }
}

/// Tags the well locations of every record in the batch.
///
/// `facilities` maps record keys to full facility names, which are resolved through the
/// directory. Every record needs a known facility, otherwise the batch is left unchanged and an
/// error is returned.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use geia_text::{FacilityDirectory, tag_locations};
///
/// let mut batch = BTreeMap::from([(1, "leak at gu abc 12u".to_owned())]);
/// let facilities = BTreeMap::from([(1, "Guntong ABC".to_owned())]);
///
/// tag_locations(&mut batch, &facilities, &FacilityDirectory::default()).unwrap();
/// assert_eq!(batch[&1], "leak at <LOC: Gu|ABC|12U>");
/// ```
pub fn tag_locations<K>(
    batch: &mut Batch<K>,
    facilities: &BTreeMap<K, String>,
    directory: &FacilityDirectory,
) -> Result<(), LocationError>
where
    K: Ord + Clone + fmt::Display,
{
    let mut tagged = Vec::with_capacity(batch.len());

    for (key, text) in batch.iter() {
        let facility = facilities
            .get(key)
            .ok_or_else(|| LocationError::MissingFacility {
                key: key.to_string(),
            })?;

        let fallback = directory
            .get(facility)
            .ok_or_else(|| LocationError::UnknownFacility {
                key: key.to_string(),
                facility: facility.clone(),
            })?;

        tagged.push((key.clone(), LocationScanner::new(fallback).scan(text)));
    }

    geia_log::trace!(records = tagged.len(), "tagged locations");
    batch.extend(tagged);
    Ok(())
}
