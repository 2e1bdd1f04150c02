//! Replacement of characters by Unicode general category.

use fancy_regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::pattern::{PatternError, compile_raw};
use crate::substitution::{Batch, normalize_batch, replace_outside_tags, try_replace_all};

/// Replaces all characters of a Unicode general category.
///
/// The category is given by its short name, either a major class such as `P` or a subclass such
/// as `Pd`. Every `{}` in the replacement stands for the replaced character.
///
/// ```
/// use geia_text::TranslateSpec;
///
/// let spec = TranslateSpec {
///     category: "P".to_owned(),
///     replacement: " {} ".to_owned(),
///     keep: "/".to_owned(),
/// };
///
/// let translator = spec.compile().unwrap();
/// assert_eq!(translator.translate("c/o seal, pump"), "c/o seal ,  pump");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct TranslateSpec {
    /// The Unicode general category, such as `P` or `Zs`.
    pub category: String,
    /// The replacement text, with `{}` standing for the character.
    pub replacement: String,
    /// Characters of the category that are left untouched.
    #[serde(default)]
    pub keep: String,
}

impl TranslateSpec {
    /// Validates the category and compiles the spec.
    pub fn compile(&self) -> Result<Translator, PatternError> {
        let category = self.category.trim();
        let pattern = compile_raw(&format!(r"\p{{{category}}}"), false)?;

        Ok(Translator {
            pattern,
            replacement: self.replacement.clone(),
            keep: self.keep.chars().collect(),
        })
    }
}

/// A compiled [`TranslateSpec`].
#[derive(Clone, Debug)]
pub struct Translator {
    pattern: Regex,
    replacement: String,
    keep: Vec<char>,
}

impl Translator {
    /// Replaces all matching characters outside of tags.
    pub fn translate(&self, text: &str) -> String {
        let replaced = replace_outside_tags(text, |segment| {
            try_replace_all(&self.pattern, segment, |captures: &Captures<'_>| {
                let matched = &captures[0];
                match matched.chars().next() {
                    Some(c) if self.keep.contains(&c) => matched.to_owned(),
                    _ => self.replacement.replace("{}", matched),
                }
            })
        });

        replaced.into_owned()
    }
}

/// Applies the translation to every value of the batch and normalizes whitespace.
pub fn translate<K>(batch: &mut Batch<K>, spec: &TranslateSpec) -> Result<(), PatternError> {
    let translator = spec.compile()?;

    for value in batch.values_mut() {
        *value = translator.translate(value);
    }

    normalize_batch(batch);
    Ok(())
}
