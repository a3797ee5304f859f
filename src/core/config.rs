/// Run configuration: file locations, stage selection and builder
/// parameters, loadable from RON and overridable by string flags.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::core::builder::BuilderSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
    #[error("unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Which stages a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Chains, pairs and schemas.
    #[default]
    All,
    ChainOnly,
    /// Start from an existing chain buffer.
    PairAndSchema,
    /// Start from an existing pair buffer.
    SchemaOnly,
}

impl Stage {
    pub fn runs_chains(self) -> bool {
        matches!(self, Stage::All | Stage::ChainOnly)
    }

    pub fn runs_pairs(self) -> bool {
        matches!(self, Stage::All | Stage::PairAndSchema)
    }

    pub fn runs_schemas(self) -> bool {
        !matches!(self, Stage::ChainOnly)
    }
}

impl FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Stage::All),
            "chain_only" | "chains" => Ok(Stage::ChainOnly),
            "pair_and_schema" | "pairs" => Ok(Stage::PairAndSchema),
            "schema_only" | "schemas" => Ok(Stage::SchemaOnly),
            other => Err(ConfigError::InvalidValue {
                key: "stage".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// A RON file of annotated documents, or a directory of them.
    pub corpus_path: PathBuf,
    /// Chain buffer.
    pub buffer_path: PathBuf,
    /// Ids of documents whose annotation ran out of resources.
    pub error_path: PathBuf,
    /// Pair buffer; `<buffer_path>_pairs` when unset.
    pub pair_path: Option<PathBuf>,
    /// Schema output file.
    pub output_path: PathBuf,
    pub frequency_cache_path: PathBuf,
    /// Persist a freshly computed frequency table to the cache.
    #[serde(deserialize_with = "lenient_write_frequency_cache")]
    pub write_frequency_cache: bool,
    pub stage: Stage,
    #[serde(deserialize_with = "lenient_schema_size")]
    pub schema_size: usize,
    #[serde(deserialize_with = "lenient_lambda")]
    pub lambda: f64,
    #[serde(deserialize_with = "lenient_beta")]
    pub beta: f64,
    #[serde(deserialize_with = "lenient_frequency_threshold")]
    pub frequency_threshold: u64,
    #[serde(deserialize_with = "lenient_use_full_prepositions")]
    pub use_full_prepositions: bool,
    #[serde(deserialize_with = "lenient_shuffle")]
    pub shuffle: bool,
    #[serde(deserialize_with = "lenient_sort")]
    pub sort: bool,
    #[serde(deserialize_with = "lenient_seed")]
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        let settings = BuilderSettings::default();
        Self {
            corpus_path: PathBuf::from("corpus.ron"),
            buffer_path: PathBuf::from("buffer"),
            error_path: PathBuf::from("errors"),
            pair_path: None,
            output_path: PathBuf::from("schemas"),
            frequency_cache_path: PathBuf::from("frequencyFile"),
            write_frequency_cache: false,
            stage: Stage::All,
            schema_size: settings.schema_size,
            lambda: settings.lambda,
            beta: settings.beta,
            frequency_threshold: settings.frequency_threshold,
            use_full_prepositions: settings.use_full_prepositions,
            shuffle: settings.shuffle,
            sort: settings.sort,
            seed: settings.seed,
        }
    }
}

impl Config {
    pub fn load_from_ron(path: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Config, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn pair_path(&self) -> PathBuf {
        match &self.pair_path {
            Some(path) => path.clone(),
            None => {
                let mut path = self.buffer_path.clone().into_os_string();
                path.push("_pairs");
                PathBuf::from(path)
            }
        }
    }

    pub fn builder_settings(&self) -> BuilderSettings {
        BuilderSettings {
            lambda: self.lambda,
            beta: self.beta,
            schema_size: self.schema_size,
            frequency_threshold: self.frequency_threshold,
            use_full_prepositions: self.use_full_prepositions,
            shuffle: self.shuffle,
            sort: self.sort,
            seed: self.seed,
        }
    }

    /// Apply one `key = value` override.
    ///
    /// Unknown keys are an error. A value that does not parse is logged and
    /// the current setting is kept.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "corpus_path" | "corpus" => self.corpus_path = PathBuf::from(value),
            "buffer_path" | "buffer" => self.buffer_path = PathBuf::from(value),
            "error_path" | "errors" => self.error_path = PathBuf::from(value),
            "pair_path" | "pairs" => self.pair_path = Some(PathBuf::from(value)),
            "output_path" | "output" => self.output_path = PathBuf::from(value),
            "frequency_cache_path" | "frequency_cache" => {
                self.frequency_cache_path = PathBuf::from(value)
            }
            "write_frequency_cache" => keep_or_set(key, value, &mut self.write_frequency_cache),
            "stage" => keep_or_set(key, value, &mut self.stage),
            "schema_size" => keep_or_set(key, value, &mut self.schema_size),
            "lambda" => keep_or_set(key, value, &mut self.lambda),
            "beta" => keep_or_set(key, value, &mut self.beta),
            "frequency_threshold" => keep_or_set(key, value, &mut self.frequency_threshold),
            "use_full_prepositions" => keep_or_set(key, value, &mut self.use_full_prepositions),
            "shuffle" => keep_or_set(key, value, &mut self.shuffle),
            "sort" => keep_or_set(key, value, &mut self.sort),
            "seed" => keep_or_set(key, value, &mut self.seed),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

/// Deserialize any RON value, keeping `fallback` when it has the wrong type.
fn lenient<'de, D, T>(deserializer: D, key: &str, fallback: T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = ron::Value::deserialize(deserializer)?;
    let shown = format!("{:?}", value);
    match value.into_rust::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(_) => {
            log::warn!(
                "{}",
                ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: shown,
                }
            );
            Ok(fallback)
        }
    }
}

macro_rules! lenient_field {
    ($($name:ident => $field:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<$ty, D::Error> {
                lenient(deserializer, stringify!($field), Config::default().$field)
            }
        )*
    };
}

lenient_field! {
    lenient_write_frequency_cache => write_frequency_cache: bool,
    lenient_schema_size => schema_size: usize,
    lenient_lambda => lambda: f64,
    lenient_beta => beta: f64,
    lenient_frequency_threshold => frequency_threshold: u64,
    lenient_use_full_prepositions => use_full_prepositions: bool,
    lenient_shuffle => shuffle: bool,
    lenient_sort => sort: bool,
    lenient_seed => seed: u64,
}

fn keep_or_set<T: FromStr + std::fmt::Debug>(key: &str, value: &str, slot: &mut T) {
    match value.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => log::warn!(
            "{}",
            ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }
        ),
    }
    log::debug!("{} = {:?}", key, slot);
}
