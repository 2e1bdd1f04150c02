//! Ordered regular expression substitution over batches of text.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use fancy_regex::{NoExpand, Regex, Replacer};

/// A batch of text values keyed by record identifier.
pub type Batch<K> = BTreeMap<K, String>;

/// Matches emitted tags such as `<DTM: 12/03/21>`.
static TAG_SPAN: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r"<[^>]+>").unwrap());

/// Matches runs of whitespace.
static WHITESPACE: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r"\s+").unwrap());

/// Characters stripped from both ends of a value after each pass.
const EDGE_CHARACTERS: &[char] = &['-', '.', ' '];

#[derive(Clone, Debug)]
enum Replacement {
    /// Inserted verbatim.
    Literal(String),
    /// May reference capture groups with `${1}`.
    Template(String),
}

/// A compiled pattern with its replacement.
///
/// Rules never touch text inside existing tags, so applying a rule to its own output does not
/// change it again.
#[derive(Clone, Debug)]
pub struct Rule {
    pattern: Regex,
    replacement: Replacement,
}

impl Rule {
    /// Creates a rule that inserts `text` verbatim for every match.
    pub fn literal(pattern: Regex, text: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: Replacement::Literal(text.into()),
        }
    }

    /// Creates a rule whose replacement references capture groups.
    ///
    /// Group references use the `${1}` syntax. Groups that did not participate in the match are
    /// replaced by an empty string.
    pub fn template(pattern: Regex, template: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: Replacement::Template(template.into()),
        }
    }

    /// Returns the compiled pattern.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Returns the replacement text or template.
    pub fn replacement(&self) -> &str {
        match &self.replacement {
            Replacement::Literal(text) | Replacement::Template(text) => text,
        }
    }

    /// Replaces all matches outside of tags in the given text.
    ///
    /// A segment the pattern cannot be matched against, for instance because it exceeds the
    /// backtracking limit, is left unchanged.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        replace_outside_tags(text, |segment| match &self.replacement {
            Replacement::Literal(replacement) => {
                try_replace_all(&self.pattern, segment, NoExpand(replacement))
            }
            Replacement::Template(template) => {
                try_replace_all(&self.pattern, segment, template.as_str())
            }
        })
    }
}

/// Replaces all matches in the text, or returns the text unchanged if matching fails.
pub(crate) fn try_replace_all<'a, R: Replacer>(
    pattern: &Regex,
    text: &'a str,
    replacer: R,
) -> Cow<'a, str> {
    match pattern.try_replacen(text, 0, replacer) {
        Ok(replaced) => replaced,
        Err(error) => {
            geia_log::warn!(
                error = %error,
                pattern = pattern.as_str(),
                "could not match text, leaving it unchanged"
            );
            Cow::Borrowed(text)
        }
    }
}

/// A piece of text that is either inside or outside of a tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Tag(&'a str),
}

/// Splits text into alternating untagged text and tags.
///
/// The result always starts and ends with a [`Segment::Text`], which may be empty.
pub(crate) fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for tag in TAG_SPAN.find_iter(text) {
        segments.push(Segment::Text(&text[last..tag.start()]));
        segments.push(Segment::Tag(tag.as_str()));
        last = tag.end();
    }

    segments.push(Segment::Text(&text[last..]));
    segments
}

/// Applies `replace` to every untagged part of the text and keeps tags verbatim.
pub(crate) fn replace_outside_tags<'a, F>(text: &'a str, mut replace: F) -> Cow<'a, str>
where
    F: FnMut(&'a str) -> Cow<'a, str>,
{
    let mut changed = false;
    let mut result = String::with_capacity(text.len());

    for segment in segments(text) {
        match segment {
            Segment::Text(part) => {
                let replaced = replace(part);
                changed |= matches!(replaced, Cow::Owned(_));
                result.push_str(&replaced);
            }
            Segment::Tag(tag) => result.push_str(tag),
        }
    }

    if changed {
        Cow::Owned(result)
    } else {
        Cow::Borrowed(text)
    }
}

/// Collapses whitespace runs into single spaces and strips hyphens, periods and spaces from
/// both ends.
///
/// # Example
///
/// ```
/// assert_eq!(geia_text::normalize_whitespace(" - leak  at\tpump. "), "leak at pump");
/// ```
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE
        .replace_all(text, " ")
        .trim_matches(EDGE_CHARACTERS)
        .to_owned()
}

/// Normalizes the whitespace of every value in the batch.
pub fn normalize_batch<K>(batch: &mut Batch<K>) {
    for value in batch.values_mut() {
        *value = normalize_whitespace(value);
    }
}

/// Applies the rules in order to a single text and normalizes whitespace.
pub fn apply_rules<'r, I>(text: &str, rules: I) -> String
where
    I: IntoIterator<Item = &'r Rule>,
{
    let mut text = text.to_owned();
    for rule in rules {
        if let Cow::Owned(replaced) = rule.apply(&text) {
            text = replaced;
        }
    }
    normalize_whitespace(&text)
}

/// Applies the rules in order to every value of the batch.
///
/// Each rule is applied to all values before the next rule runs, so a later rule sees the output
/// of all earlier rules. Whitespace is normalized once all rules have run.
pub fn map_patterns<'r, K, I>(batch: &mut Batch<K>, rules: I)
where
    I: IntoIterator<Item = &'r Rule>,
{
    let mut count = 0;
    for rule in rules {
        for value in batch.values_mut() {
            if let Cow::Owned(replaced) = rule.apply(value) {
                *value = replaced;
            }
        }
        count += 1;
    }

    geia_log::trace!(rules = count, records = batch.len(), "applied substitution rules");
    normalize_batch(batch);
}

#[cfg(test)]
mod tests {
    use crate::pattern::compile_raw;

    use super::*;

    fn rule(pattern: &str, replacement: &str) -> Rule {
        Rule::literal(compile_raw(pattern, true).unwrap(), replacement)
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  leak \n\t at   pump  "), "leak at pump");
        assert_eq!(normalize_whitespace("-- replaced seal ..."), "replaced seal");
        assert_eq!(normalize_whitespace("...."), "");
        assert_eq!(normalize_whitespace("a-b.c"), "a-b.c");
    }

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("at <DTM: 12/03/21> ok"),
            vec![
                Segment::Text("at "),
                Segment::Tag("<DTM: 12/03/21>"),
                Segment::Text(" ok"),
            ]
        );
        assert_eq!(
            segments("<TAG: pv-1234>"),
            vec![
                Segment::Text(""),
                Segment::Tag("<TAG: pv-1234>"),
                Segment::Text(""),
            ]
        );
        assert_eq!(segments("plain"), vec![Segment::Text("plain")]);
    }

    #[test]
    fn test_literal_is_not_expanded() {
        let rule = rule(r"\b(usd)\b", " $1 dollars ");
        assert_eq!(rule.apply("usd"), " $1 dollars ");
    }

    #[test]
    fn test_template_expands_groups() {
        let rule = Rule::template(compile_raw(r"(\d+)\s*(psi)?", true).unwrap(), "<${1}${2}>");
        assert_eq!(rule.apply("10 psi"), "<10psi>");
        assert_eq!(rule.apply("10"), "<10>");
    }

    #[test]
    fn test_tags_are_protected() {
        let rule = rule(r"\bpv\b", " valve ");
        assert_eq!(rule.apply("<TAG: pv-1234> pv"), "<TAG: pv-1234>  valve ");
    }

    #[test]
    fn test_apply_borrows_without_match() {
        let rule = rule(r"\bpmp\b", " pump ");
        assert!(matches!(rule.apply("valve"), Cow::Borrowed("valve")));
    }

    #[test]
    fn test_map_patterns_order() {
        // The second rule only matches the output of the first one.
        let rules = [rule(r"\bpmp\b", " pump "), rule(r"\bpump\s+seal\b", " mechanical seal ")];

        let mut batch = Batch::from([
            (1, "pmp seal leaking".to_owned()),
            (2, "  no change  ".to_owned()),
        ]);
        map_patterns(&mut batch, &rules);

        assert_eq!(batch[&1], "mechanical seal leaking");
        assert_eq!(batch[&2], "no change");
    }

    #[test]
    fn test_map_patterns_idempotent() {
        let rules = [rule(r"\bc/o\b", " changeout ")];
        let mut batch = Batch::from([(0, "c/o seal".to_owned())]);

        map_patterns(&mut batch, &rules);
        let first = batch.clone();
        map_patterns(&mut batch, &rules);

        assert_eq!(batch, first);
        assert_eq!(batch[&0], "changeout seal");
    }

    #[test]
    fn test_apply_rules() {
        let rules = [rule("&", " and "), rule(r"\bvlv\b", " valve ")];
        assert_eq!(apply_rules("pump&vlv", &rules), "pump and valve");
    }
}
