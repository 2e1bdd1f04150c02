use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use geia_log::LogConfig;
use geia_text::{AbbreviationCatalog, CatalogColumns, CategorySequence, FacilityDirectory, Step};
use serde::{Deserialize, Serialize};

/// Defines the source of a config error.
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a file, either the config file or a file it references.
    File(PathBuf),
    /// An error originating from a single config field.
    Field(&'static str),
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    inner: Option<Box<dyn Error + Send + Sync>>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            source: ConfigErrorSource::None,
            kind,
            inner: None,
        }
    }

    #[inline]
    fn wrap<E>(inner: E, kind: ConfigErrorKind) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self {
            inner: Some(inner.into()),
            ..Self::new(kind)
        }
    }

    #[inline]
    fn file<P: AsRef<Path>>(mut self, p: P) -> Self {
        self.source = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::Field(name);
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ConfigErrorSource::None => fmt::Display::fmt(&self.kind, f),
            ConfigErrorSource::File(file_name) => {
                write!(f, "{} (file {})", self.kind, file_name.display())
            }
            ConfigErrorSource::Field(name) => write!(f, "{} (field {})", self.kind, name),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner
            .as_ref()
            .map(|inner| &**inner as &(dyn Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Invalid config value.
    #[error("invalid config value")]
    InvalidValue,
    /// The abbreviation table could not be loaded.
    #[error("could not load abbreviation table")]
    BadCatalog,
}

/// Controls where the abbreviation table is read from.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Abbreviations {
    /// Path to the CSV table, relative to the directory of the config file.
    pub path: PathBuf,
    /// Column names of the table.
    #[serde(default)]
    pub columns: CatalogColumns,
    /// Order in which the categories are applied.
    #[serde(default)]
    pub sequence: CategorySequence,
}

/// Describes the columns of the records to normalize.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Input {
    /// Free-text columns, each normalized as an independent batch.
    pub text_columns: Vec<String>,
    /// The column holding the full facility name of each record.
    pub facility_column: String,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            text_columns: vec![
                "TASK_DESCRIPTION".to_owned(),
                "PROBLEM_NOTE".to_owned(),
                "CAUSE_NOTE".to_owned(),
            ],
            facility_column: "FACILITY".to_owned(),
        }
    }
}

fn default_pipeline() -> Vec<Step> {
    Step::default_pipeline()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct ConfigValues {
    #[serde(default)]
    logging: LogConfig,
    #[serde(default)]
    abbreviations: Option<Abbreviations>,
    #[serde(default)]
    facilities: FacilityDirectory,
    #[serde(default)]
    input: Input,
    #[serde(default = "default_pipeline")]
    pipeline: Vec<Step>,
}

impl Default for ConfigValues {
    fn default() -> Self {
        Self {
            logging: LogConfig::default(),
            abbreviations: None,
            facilities: FacilityDirectory::default(),
            input: Input::default(),
            pipeline: default_pipeline(),
        }
    }
}

/// Config struct.
#[derive(Clone, Debug, Default)]
pub struct Config {
    values: ConfigValues,
    path: PathBuf,
}

impl Config {
    /// Loads a config from the given YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(path))?;

        let values: ConfigValues = serde_yaml::from_reader(io::BufReader::new(file))
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml).file(path))?;

        let config = Self::from_values(values, path.to_path_buf())?;

        geia_log::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parses a config from a YAML string.
    ///
    /// Relative paths resolve against the current directory. This is mostly useful for tests.
    pub fn from_yaml(yaml: &str) -> Result<Config, ConfigError> {
        let values: ConfigValues = serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml))?;

        Self::from_values(values, PathBuf::new())
    }

    fn from_values(values: ConfigValues, path: PathBuf) -> Result<Config, ConfigError> {
        if values.input.text_columns.is_empty() {
            return Err(
                ConfigError::new(ConfigErrorKind::InvalidValue).field("input.text_columns"),
            );
        }

        let needs_catalog = values.pipeline.contains(&Step::Abbreviations);
        if needs_catalog && values.abbreviations.is_none() {
            return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("abbreviations"));
        }

        for step in &values.pipeline {
            if let Step::Translate(spec) = step {
                spec.compile().map_err(|e| {
                    ConfigError::wrap(e, ConfigErrorKind::InvalidValue).field("pipeline")
                })?;
            }
        }

        Ok(Config { values, path })
    }

    /// Returns the path of the config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.values.logging
    }

    /// Returns the resolved path of the abbreviation table, if configured.
    pub fn abbreviations_path(&self) -> Option<PathBuf> {
        let abbreviations = self.values.abbreviations.as_ref()?;
        let base = self.path.parent().unwrap_or_else(|| Path::new(""));
        Some(base.join(&abbreviations.path))
    }

    /// Loads and compiles the abbreviation table, if configured.
    pub fn load_catalog(&self) -> Result<Option<AbbreviationCatalog>, ConfigError> {
        let (Some(abbreviations), Some(path)) =
            (&self.values.abbreviations, self.abbreviations_path())
        else {
            return Ok(None);
        };

        let catalog = AbbreviationCatalog::from_path(
            &path,
            &abbreviations.columns,
            abbreviations.sequence.clone(),
        )
        .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadCatalog).file(&path))?;

        geia_log::info!(
            path = %path.display(),
            records = catalog.len(),
            "loaded abbreviation table"
        );

        Ok(Some(catalog))
    }

    /// Returns the directory resolving facility names.
    pub fn facilities(&self) -> &FacilityDirectory {
        &self.values.facilities
    }

    /// Returns the free-text columns of the input.
    pub fn text_columns(&self) -> &[String] {
        &self.values.input.text_columns
    }

    /// Returns the facility column of the input.
    pub fn facility_column(&self) -> &str {
        &self.values.input.facility_column
    }

    /// Returns the normalization pipeline.
    pub fn pipeline(&self) -> &[Step] {
        &self.values.pipeline
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use geia_log::Level;
    use geia_text::Category;

    use super::*;

    const CATALOG: &str = "\
category,pattern,placeholder,boundary,abbreviation,expansion
noun,pmp,,both,pmp,pump
symbol,&,,none,&,and
";

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("pipeline: [{step: datetime}]").unwrap();

        assert_eq!(config.logging().level, Level::Info);
        assert_eq!(config.facility_column(), "FACILITY");
        assert_eq!(config.text_columns().len(), 3);
        assert_eq!(config.facilities().len(), 9);
        assert_eq!(config.pipeline(), [Step::Datetime]);
        assert!(config.abbreviations_path().is_none());
        assert!(config.load_catalog().unwrap().is_none());
    }

    #[test]
    fn test_default_pipeline_needs_abbreviations() {
        let error = Config::from_yaml("{}").unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert_eq!(error.to_string(), "invalid config value (field abbreviations)");
    }

    #[test]
    fn test_empty_text_columns() {
        let yaml = "
input:
  text_columns: []
pipeline: []
";
        let error = Config::from_yaml(yaml).unwrap_err();
        insta::assert_snapshot!(error, @"invalid config value (field input.text_columns)");
    }

    #[test]
    fn test_invalid_translate_category() {
        let yaml = "
pipeline:
  - {step: translate, category: Qq, replacement: ' '}
  - {step: datetime}
";
        let error = Config::from_yaml(yaml).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert!(error.source().is_some());
        insta::assert_snapshot!(error, @"invalid config value (field pipeline)");
    }

    #[test]
    fn test_bad_yaml() {
        let error = Config::from_yaml("pipeline: [{step: noun_fix}]").unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
        assert!(error.source().is_some());
    }

    #[test]
    fn test_malformed_facility() {
        let yaml = "
facilities:
  North Field: Nf
pipeline: []
";
        let error = Config::from_yaml(yaml).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yml");

        let error = Config::from_path(&path).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::CouldNotOpenFile);
        assert!(error.to_string().ends_with(&format!("(file {})", path.display())));
    }

    #[test]
    fn test_from_path_resolves_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("abbreviations.csv"), CATALOG).unwrap();

        let path = dir.path().join("geia.yml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "
logging:
  level: debug
abbreviations:
  path: abbreviations.csv
  sequence: [noun]
facilities:
  North Field: Nf B
input:
  text_columns: [NOTE]
  facility_column: SITE
"
        )
        .unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.path(), path);
        assert_eq!(config.logging().level, Level::Debug);
        assert_eq!(config.text_columns(), ["NOTE"]);
        assert_eq!(config.facility_column(), "SITE");
        assert!(config.facilities().get("North Field").is_some());
        assert!(config.facilities().get("Palas").is_none());
        assert_eq!(config.pipeline(), Step::default_pipeline());
        assert_eq!(
            config.abbreviations_path(),
            Some(dir.path().join("abbreviations.csv"))
        );

        let catalog = config.load_catalog().unwrap().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(Category::Noun).unwrap().len(), 1);
        assert!(catalog.get(Category::Symbol).is_err());
    }

    #[test]
    fn test_fixture() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/fixtures/geia.yml");
        let config = Config::from_path(path).unwrap();

        assert_eq!(config.text_columns(), ["text"]);
        assert_eq!(config.facility_column(), "facility");

        let catalog = config.load_catalog().unwrap().unwrap();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.get(Category::Noun).unwrap()[1].word, "vlvs");
    }

    #[test]
    fn test_bad_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("abbreviations.csv"),
            "category,pattern,placeholder,boundary,abbreviation,expansion\nnoun,pmp,,middle,pmp,pump\n",
        )
        .unwrap();

        let path = dir.path().join("geia.yml");
        fs::write(&path, "abbreviations: {path: abbreviations.csv}\n").unwrap();

        let config = Config::from_path(&path).unwrap();
        let error = config.load_catalog().unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadCatalog);
    }
}
