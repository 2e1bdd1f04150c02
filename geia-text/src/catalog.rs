//! Abbreviation catalogs grouped by semantic category.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use fancy_regex::Regex;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::pattern::{Boundary, PatternCompiler, PatternError, Placeholders};
use crate::substitution::Rule;

/// The initial used for records whose pattern does not start with a word character.
pub const WILDCARD_INITIAL: char = '#';

/// An error returned when loading an abbreviation catalog fails.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The category is not part of the catalog's category sequence.
    #[error("unknown abbreviation category '{0}'")]
    UnknownCategory(String),

    /// A row pattern could not be compiled.
    #[error("invalid pattern in abbreviation row {row}")]
    Pattern {
        /// The zero-based position of the row.
        row: usize,
        /// The compilation error.
        #[source]
        source: PatternError,
    },

    /// The index column of a row is not a non-negative integer.
    #[error("invalid index '{value}' in abbreviation row {row}")]
    InvalidIndex {
        /// The zero-based position of the row.
        row: usize,
        /// The raw index value.
        value: String,
    },

    /// A configured column is missing from the header.
    #[error("missing column '{0}' in abbreviation table")]
    MissingColumn(String),

    /// The abbreviation table could not be read.
    #[error("could not read abbreviation table")]
    Csv(#[from] csv::Error),
}

/// The semantic group of an abbreviation record.
///
/// Categories are applied in the order of the catalog's [`CategorySequence`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Symbols such as `&` or `@`.
    Symbol,
    /// Units of measurement.
    Uom,
    /// Time expressions.
    Time,
    /// Common misspellings.
    Misspelling,
    /// Nouns.
    Noun,
    /// Corrections applied after noun expansion.
    NounFix,
    /// Verb corrections.
    VerbFix,
    /// Objects such as equipment.
    Object,
    /// Everything else.
    Special,
}

impl Category {
    /// All categories in their default processing order.
    pub const ALL: [Category; 9] = [
        Category::Symbol,
        Category::Uom,
        Category::Time,
        Category::Misspelling,
        Category::Noun,
        Category::NounFix,
        Category::VerbFix,
        Category::Object,
        Category::Special,
    ];

    /// Returns the name of the category as used in abbreviation tables.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Symbol => "symbol",
            Category::Uom => "uom",
            Category::Time => "time",
            Category::Misspelling => "misspelling",
            Category::Noun => "noun",
            Category::NounFix => "noun_fix",
            Category::VerbFix => "verb_fix",
            Category::Object => "object",
            Category::Special => "special",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_owned()))
    }
}

/// The ordered list of categories a catalog applies.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CategorySequence(Vec<Category>);

impl CategorySequence {
    /// Creates a sequence from the given categories.
    pub fn new(categories: Vec<Category>) -> Self {
        Self(categories)
    }

    /// Returns `true` if the category is part of this sequence.
    pub fn contains(&self, category: Category) -> bool {
        self.0.contains(&category)
    }

    /// Iterates the categories in order.
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().copied()
    }
}

impl Default for CategorySequence {
    fn default() -> Self {
        Self(Category::ALL.to_vec())
    }
}

/// A raw row of an abbreviation table.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct AbbreviationRow {
    /// The category name.
    pub category: String,
    /// The ordering index, defaults to the row position.
    pub index: Option<usize>,
    /// The pattern template.
    pub pattern: String,
    /// Whitespace-separated `key=value` placeholder pairs.
    pub placeholder: String,
    /// The boundary mode.
    pub boundary: String,
    /// The abbreviated word.
    pub abbreviation: String,
    /// The replacement text.
    pub expansion: String,
}

impl AbbreviationRow {
    fn compile(
        self,
        position: usize,
        compiler: &PatternCompiler,
    ) -> Result<AbbreviationRecord, CatalogError> {
        let category: Category = self.category.parse()?;
        let invalid = |source| CatalogError::Pattern {
            row: position,
            source,
        };

        let boundary: Boundary = self.boundary.parse().map_err(invalid)?;
        let placeholders: Placeholders = self.placeholder.parse().map_err(invalid)?;
        let pattern = compiler
            .compile_with(&self.pattern, &placeholders, boundary)
            .map_err(invalid)?;

        let initial = match self.pattern.chars().next() {
            Some(c) if c.is_alphanumeric() && boundary.has_left() => {
                c.to_lowercase().next().unwrap_or(c)
            }
            _ => WILDCARD_INITIAL,
        };

        Ok(AbbreviationRecord {
            category,
            index: self.index.unwrap_or(position),
            initial,
            word: self.abbreviation,
            expansion: self.expansion,
            pattern,
        })
    }
}

/// A compiled abbreviation with its expansion.
#[derive(Clone, Debug)]
pub struct AbbreviationRecord {
    /// The semantic category.
    pub category: Category,
    /// The ordering index within the category.
    pub index: usize,
    /// The lowercase first character of the pattern, or [`WILDCARD_INITIAL`].
    pub initial: char,
    /// The abbreviated word.
    pub word: String,
    /// The replacement text.
    pub expansion: String,
    /// The compiled pattern.
    pub pattern: Regex,
}

/// Column names of an abbreviation table.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogColumns {
    /// The category column.
    pub category: String,
    /// The optional ordering index column.
    pub index: Option<String>,
    /// The pattern template column.
    pub pattern: String,
    /// The placeholder column.
    pub placeholder: String,
    /// The boundary mode column.
    pub boundary: String,
    /// The abbreviated word column.
    pub abbreviation: String,
    /// The expansion column.
    pub expansion: String,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            category: "category".to_owned(),
            index: None,
            pattern: "pattern".to_owned(),
            placeholder: "placeholder".to_owned(),
            boundary: "boundary".to_owned(),
            abbreviation: "abbreviation".to_owned(),
            expansion: "expansion".to_owned(),
        }
    }
}

/// Positions of the configured columns within a table header.
struct ColumnLayout {
    category: usize,
    index: Option<usize>,
    pattern: usize,
    placeholder: usize,
    boundary: usize,
    abbreviation: usize,
    expansion: usize,
}

impl ColumnLayout {
    fn new(headers: &csv::StringRecord, columns: &CatalogColumns) -> Result<Self, CatalogError> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| CatalogError::MissingColumn(name.to_owned()))
        };

        Ok(Self {
            category: position(&columns.category)?,
            index: columns.index.as_deref().map(position).transpose()?,
            pattern: position(&columns.pattern)?,
            placeholder: position(&columns.placeholder)?,
            boundary: position(&columns.boundary)?,
            abbreviation: position(&columns.abbreviation)?,
            expansion: position(&columns.expansion)?,
        })
    }

    fn row(&self, record: &csv::StringRecord, row: usize) -> Result<AbbreviationRow, CatalogError> {
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let index = match self.index.map(field).map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<usize>().map_err(|_| CatalogError::InvalidIndex {
                row,
                value: value.to_owned(),
            })?),
        };

        Ok(AbbreviationRow {
            category: field(self.category).to_owned(),
            index,
            pattern: field(self.pattern).to_owned(),
            placeholder: field(self.placeholder).to_owned(),
            boundary: field(self.boundary).to_owned(),
            abbreviation: field(self.abbreviation).to_owned(),
            expansion: field(self.expansion).to_owned(),
        })
    }
}

/// Compiled abbreviation records grouped by category.
///
/// Every pattern is compiled when the catalog is built, so an invalid row fails the load instead
/// of a later substitution pass.
///
/// # Example
///
/// ```
/// use geia_text::{AbbreviationCatalog, AbbreviationRow, CategorySequence, apply_rules};
///
/// let rows = [AbbreviationRow {
///     category: "noun".to_owned(),
///     pattern: "pmp".to_owned(),
///     boundary: "both".to_owned(),
///     abbreviation: "pmp".to_owned(),
///     expansion: "pump".to_owned(),
///     ..Default::default()
/// }];
///
/// let catalog = AbbreviationCatalog::from_rows(rows, CategorySequence::default()).unwrap();
/// assert_eq!(apply_rules("PMP leak", catalog.patterns()), "pump leak");
/// ```
#[derive(Clone, Debug)]
pub struct AbbreviationCatalog {
    categories: BTreeMap<Category, Vec<AbbreviationRecord>>,
    sequence: CategorySequence,
    rules: Vec<Rule>,
}

impl AbbreviationCatalog {
    /// Builds a catalog from raw rows.
    ///
    /// Rows without an explicit index are ordered by their position. The first row that fails to
    /// compile aborts loading.
    pub fn from_rows<I>(rows: I, sequence: CategorySequence) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = AbbreviationRow>,
    {
        let compiler = PatternCompiler::new();
        let mut categories = BTreeMap::<_, Vec<_>>::new();

        for (position, row) in rows.into_iter().enumerate() {
            let record = row.compile(position, &compiler)?;
            categories
                .entry(record.category)
                .or_default()
                .push(record);
        }

        for (category, records) in &mut categories {
            records.sort_by_key(|record| record.index);
            geia_log::debug!(%category, records = records.len(), "loaded abbreviation category");
        }

        let rules = derive_rules(&categories, &sequence);
        Ok(Self {
            categories,
            sequence,
            rules,
        })
    }

    /// Reads a catalog from CSV data with the given column names.
    pub fn from_reader<R>(
        reader: R,
        columns: &CatalogColumns,
        sequence: CategorySequence,
    ) -> Result<Self, CatalogError>
    where
        R: io::Read,
    {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        let layout = ColumnLayout::new(&headers, columns)?;

        let mut rows = Vec::new();
        for (position, record) in reader.records().enumerate() {
            rows.push(layout.row(&record?, position)?);
        }

        Self::from_rows(rows, sequence)
    }

    /// Reads a catalog from a CSV file with the given column names.
    pub fn from_path<P>(
        path: P,
        columns: &CatalogColumns,
        sequence: CategorySequence,
    ) -> Result<Self, CatalogError>
    where
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        Self::from_reader(io::BufReader::new(file), columns, sequence)
    }

    /// Returns the records of a category in index order.
    ///
    /// Categories without records return an empty slice. Categories outside of the catalog's
    /// sequence are an error.
    pub fn get(&self, category: Category) -> Result<&[AbbreviationRecord], CatalogError> {
        if !self.sequence.contains(category) {
            return Err(CatalogError::UnknownCategory(category.to_string()));
        }

        Ok(self
            .categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Returns the substitution rules of all categories in sequence order.
    ///
    /// Each rule replaces its pattern with the expansion padded by single spaces. When the same
    /// pattern text appears more than once, the rule keeps its first position and the expansion
    /// of the last occurrence.
    pub fn patterns(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the category sequence of this catalog.
    pub fn sequence(&self) -> &CategorySequence {
        &self.sequence
    }

    /// Iterates the categories of the sequence with their records.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[AbbreviationRecord])> + '_ {
        self.sequence.iter().map(|category| {
            let records = self.categories.get(&category).map(Vec::as_slice);
            (category, records.unwrap_or_default())
        })
    }

    /// Returns the total number of records.
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Returns `true` if the catalog has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn derive_rules(
    categories: &BTreeMap<Category, Vec<AbbreviationRecord>>,
    sequence: &CategorySequence,
) -> Vec<Rule> {
    let mut rules = IndexMap::new();

    for category in sequence.iter() {
        for record in categories.get(&category).into_iter().flatten() {
            let rule = Rule::literal(record.pattern.clone(), format!(" {} ", record.expansion));
            rules.insert(record.pattern.as_str().to_owned(), rule);
        }
    }

    rules.into_values().collect()
}
