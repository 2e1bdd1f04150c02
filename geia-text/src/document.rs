//! Pipelines of normalization steps over a batch of records.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::catalog::AbbreviationCatalog;
use crate::location::{FacilityDirectory, LocationError, tag_locations};
use crate::pattern::PatternError;
use crate::substitution::{Batch, map_patterns};
use crate::taggers::TaggerFamily;
use crate::unicode::{TranslateSpec, translate};

/// An error returned when a pipeline step fails.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The pipeline expands abbreviations, but no catalog was supplied.
    #[error("abbreviation step requires an abbreviation catalog")]
    MissingCatalog,

    /// The pipeline tags locations, but no facilities were supplied.
    #[error("location step requires the facility of every record")]
    MissingFacilities,

    /// A translation step has an invalid category.
    #[error("invalid translation step")]
    Pattern(#[from] PatternError),

    /// Locations could not be tagged.
    #[error("could not tag locations")]
    Location(#[from] LocationError),
}

/// A single step of a normalization pipeline.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Replaces characters by Unicode category.
    Translate(TranslateSpec),
    /// Expands abbreviations from the catalog.
    Abbreviations,
    /// Tags dates.
    Datetime,
    /// Tags shutdown years and reference codes.
    Reference,
    /// Tags times of day.
    Hour,
    /// Tags durations.
    Duration,
    /// Tags voting ratios.
    Uom,
    /// Tags equipment numbers.
    Tag,
    /// Tags well locations.
    Location,
}

impl Step {
    /// Returns the full pipeline in data-flow order.
    pub fn default_pipeline() -> Vec<Step> {
        let mut pipeline = vec![
            Step::Translate(TranslateSpec {
                category: "Z".to_owned(),
                replacement: " ".to_owned(),
                keep: String::new(),
            }),
            Step::Abbreviations,
        ];

        pipeline.extend(TaggerFamily::ALL.into_iter().map(Step::from));
        pipeline.push(Step::Location);
        pipeline
    }

    /// Returns the entity tagger family run by this step.
    pub fn tagger(&self) -> Option<TaggerFamily> {
        Some(match self {
            Step::Datetime => TaggerFamily::Datetime,
            Step::Reference => TaggerFamily::Reference,
            Step::Hour => TaggerFamily::Hour,
            Step::Duration => TaggerFamily::Duration,
            Step::Uom => TaggerFamily::Uom,
            Step::Tag => TaggerFamily::Tag,
            Step::Translate(_) | Step::Abbreviations | Step::Location => return None,
        })
    }

    /// Returns the name of the step.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Translate(_) => "translate",
            Step::Abbreviations => "abbreviations",
            Step::Location => "location",
            other => other.tagger().map_or("unknown", TaggerFamily::as_str),
        }
    }
}

impl From<TaggerFamily> for Step {
    fn from(family: TaggerFamily) -> Self {
        match family {
            TaggerFamily::Datetime => Step::Datetime,
            TaggerFamily::Reference => Step::Reference,
            TaggerFamily::Hour => Step::Hour,
            TaggerFamily::Duration => Step::Duration,
            TaggerFamily::Uom => Step::Uom,
            TaggerFamily::Tag => Step::Tag,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs shared by the steps of a pipeline.
#[derive(Debug)]
pub struct PipelineContext<'a, K> {
    /// The catalog for the abbreviation step.
    pub catalog: Option<&'a AbbreviationCatalog>,
    /// The directory resolving facility names.
    pub directory: &'a FacilityDirectory,
    /// The full facility name of every record, for the location step.
    pub facilities: Option<&'a BTreeMap<K, String>>,
}

/// A batch of free-text records being normalized.
///
/// Steps apply to the whole batch in the order they are given. Every step normalizes whitespace
/// of all values after it ran.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TechnicalDocument<K> {
    data: Batch<K>,
}

impl<K> TechnicalDocument<K>
where
    K: Ord + Clone + fmt::Display,
{
    /// Creates a document from text values keyed by record identifier.
    pub fn new(data: Batch<K>) -> Self {
        Self { data }
    }

    /// Returns the current text values.
    pub fn data(&self) -> &Batch<K> {
        &self.data
    }

    /// Returns the text values, consuming the document.
    pub fn into_data(self) -> Batch<K> {
        self.data
    }

    /// Runs all steps of the pipeline in order.
    pub fn run(
        &mut self,
        pipeline: &[Step],
        context: &PipelineContext<'_, K>,
    ) -> Result<&mut Self, DocumentError> {
        for step in pipeline {
            self.apply(step, context)?;
        }

        Ok(self)
    }

    /// Runs a single step.
    pub fn apply(
        &mut self,
        step: &Step,
        context: &PipelineContext<'_, K>,
    ) -> Result<&mut Self, DocumentError> {
        let start = Instant::now();
        geia_log::debug!(%step, records = self.data.len(), "running pipeline step");

        match step {
            Step::Translate(spec) => translate(&mut self.data, spec)?,
            Step::Abbreviations => {
                self.map_abbreviations(context)?;
            }
            Step::Location => {
                self.tag_locations(context)?;
            }
            other => {
                if let Some(family) = other.tagger() {
                    family.apply(&mut self.data);
                }
            }
        }

        geia_log::trace!(%step, elapsed = ?start.elapsed(), "finished pipeline step");
        Ok(self)
    }

    /// Expands abbreviations from the catalog.
    pub fn map_abbreviations(
        &mut self,
        context: &PipelineContext<'_, K>,
    ) -> Result<&mut Self, DocumentError> {
        let catalog = context.catalog.ok_or(DocumentError::MissingCatalog)?;
        map_patterns(&mut self.data, catalog.patterns());
        Ok(self)
    }

    /// Runs a single family of entity taggers.
    pub fn tag_entities(&mut self, family: TaggerFamily) -> &mut Self {
        family.apply(&mut self.data);
        self
    }

    /// Tags well locations with the facilities of the context.
    pub fn tag_locations(
        &mut self,
        context: &PipelineContext<'_, K>,
    ) -> Result<&mut Self, DocumentError> {
        let facilities = context
            .facilities
            .ok_or(DocumentError::MissingFacilities)?;
        tag_locations(&mut self.data, facilities, context.directory)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serde() {
        let result = serde_json::from_str::<Vec<Step>>(r#"[{"step": "noun_fix"}]"#);
        assert!(result.is_err());

        let pipeline: Vec<Step> = serde_json::from_str(
            r#"[
                {"step": "translate", "category": "P", "replacement": " {} "},
                {"step": "datetime"},
                {"step": "location"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            pipeline,
            [
                Step::Translate(TranslateSpec {
                    category: "P".to_owned(),
                    replacement: " {} ".to_owned(),
                    keep: String::new(),
                }),
                Step::Datetime,
                Step::Location,
            ]
        );
    }

    #[test]
    fn test_default_pipeline() {
        let names: Vec<_> = Step::default_pipeline().iter().map(Step::name).collect();
        assert_eq!(
            names,
            [
                "translate",
                "abbreviations",
                "datetime",
                "reference",
                "tag",
                "hour",
                "duration",
                "uom",
                "location",
            ]
        );
    }

    #[test]
    fn test_missing_catalog() {
        let directory = FacilityDirectory::default();
        let context = PipelineContext::<u32> {
            catalog: None,
            directory: &directory,
            facilities: None,
        };

        let mut document = TechnicalDocument::new(Batch::from([(0, "pmp".to_owned())]));
        let result = document.run(&[Step::Abbreviations], &context);
        assert!(matches!(result, Err(DocumentError::MissingCatalog)));
    }

    #[test]
    fn test_missing_facilities() {
        let directory = FacilityDirectory::default();
        let context = PipelineContext::<u32> {
            catalog: None,
            directory: &directory,
            facilities: None,
        };

        let mut document = TechnicalDocument::new(Batch::from([(0, "well 7".to_owned())]));
        let result = document.run(&[Step::Location], &context);
        assert!(matches!(result, Err(DocumentError::MissingFacilities)));
    }

    #[test]
    fn test_entity_steps() {
        geia_log::init_test!();

        let directory = FacilityDirectory::default();
        let context = PipelineContext::<u32> {
            catalog: None,
            directory: &directory,
            facilities: None,
        };

        let mut document = TechnicalDocument::new(Batch::from([
            (1, "pv 1234 replaced on 12/03/21".to_owned()),
            (2, "took 3 hrs".to_owned()),
        ]));

        let pipeline = [Step::Datetime, Step::Tag, Step::Duration];
        document.run(&pipeline, &context).unwrap();

        assert_eq!(
            document.data()[&1],
            "<TAG: pv-1234> replaced on <DTM: 12/03/21>"
        );
        assert_eq!(document.data()[&2], "took <DUR: 3 hrs>");
    }

    #[test]
    fn test_tag_entities_chained() {
        let mut document = TechnicalDocument::new(Batch::from([(0, "2oo3 at 14:30".to_owned())]));
        document
            .tag_entities(TaggerFamily::Uom)
            .tag_entities(TaggerFamily::Hour);

        assert_eq!(document.into_data()[&0], "<UOM: 2oo3> at <HRS: 14:30>");
    }
}
