/// The induction pipeline: Corpus → chain buffer → pair buffer → schemas.
///
/// Each stage reads the previous stage's file and appends to its own, so a
/// run can start from any stage whose input already exists.

use std::path::Path;
use std::time::Instant;
use thiserror::Error;

use crate::core::annotation::{AnnotatedCorpus, AnnotationError, Annotator, RawDocument};
use crate::core::buffer::{self, BufferError};
use crate::core::builder::{BuilderSettings, SchemaBuilder};
use crate::core::config::{Config, ConfigError};
use crate::core::extractor::ChainExtractor;
use crate::core::pairs::{self, PairSummary};
use crate::core::stats::FrequencyTable;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("annotation error: {0}")]
    Annotation(#[from] AnnotationError),
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the chain stage did with the corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainSummary {
    pub documents: usize,
    /// Documents that produced a chain-buffer line.
    pub written: usize,
    /// Documents whose annotation ran out of resources; each is recorded
    /// in the error file when it can be written.
    pub exhausted: usize,
    /// Documents skipped after any other annotation failure.
    pub skipped: usize,
}

/// What the schema stage produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaSummary {
    pub records: usize,
    pub events: usize,
    pub frequencies: usize,
    pub schemas: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub chains: Option<ChainSummary>,
    pub pairs: Option<PairSummary>,
    pub schemas: Option<SchemaSummary>,
}

/// Annotate each document, extract its chains and append them to the
/// chain buffer.
pub fn extract_chains<A: Annotator>(
    annotator: &mut A,
    documents: &[RawDocument],
    buffer_path: &Path,
    error_path: &Path,
) -> Result<ChainSummary, PipelineError> {
    let start = Instant::now();
    let extractor = ChainExtractor::new();
    let mut summary = ChainSummary {
        documents: documents.len(),
        ..ChainSummary::default()
    };
    // Later stages read the buffer even when no document yields a chain.
    buffer::append(buffer_path, "")?;

    for raw in documents {
        if let Err(e) = buffer::check_document_id(&raw.id) {
            log::warn!("document skipped: {}", e);
            summary.skipped += 1;
            continue;
        }
        let annotated = match annotator.annotate(raw) {
            Ok(doc) => doc,
            Err(AnnotationError::ResourceExhausted(id)) => {
                log::warn!("document '{}': annotation resources exhausted", id);
                if let Err(e) = buffer::append_error(error_path, &id) {
                    log::warn!("could not record '{}' in {}: {}", id, error_path.display(), e);
                }
                summary.exhausted += 1;
                continue;
            }
            Err(e) => {
                log::warn!("document '{}' skipped: {}", raw.id, e);
                summary.skipped += 1;
                continue;
            }
        };

        let chains = extractor.extract(&annotated);
        log::debug!("document '{}': {} chains", raw.id, chains.len());
        if let Some(line) = buffer::format_chain_line(&raw.id, &chains) {
            buffer::append(buffer_path, &format!("{}\n", line))?;
            summary.written += 1;
        }
    }

    log::info!(
        "extracted chains for {}/{} documents in {} ms",
        summary.written,
        summary.documents,
        start.elapsed().as_millis()
    );
    Ok(summary)
}

/// Load the frequency cache if present, otherwise compute the table and
/// optionally persist it.
fn frequencies_for(
    builder: &SchemaBuilder,
    cache_path: &Path,
    write_cache: bool,
) -> Result<FrequencyTable, PipelineError> {
    if cache_path.is_file() {
        let table = FrequencyTable::load(cache_path)?;
        log::info!(
            "loaded {} argument frequencies from {}",
            table.len(),
            cache_path.display()
        );
        return Ok(table);
    }
    let table = builder.compute_frequencies();
    if write_cache {
        table.save(cache_path)?;
        log::info!("wrote frequency cache {}", cache_path.display());
    }
    Ok(table)
}

/// Build schemas from a pair buffer and append them to the output file.
pub fn build_schemas(
    pair_path: &Path,
    output_path: &Path,
    cache_path: &Path,
    write_cache: bool,
    settings: BuilderSettings,
) -> Result<SchemaSummary, PipelineError> {
    let records = buffer::read_pair_buffer(pair_path)?;
    let mut builder = SchemaBuilder::new(settings, &records);
    log::info!(
        "read {} pair records: {} events after purification, roles {:?}",
        records.len(),
        builder.events().len(),
        builder.dependency_pool()
    );

    let frequencies = frequencies_for(&builder, cache_path, write_cache)?;
    let frequency_count = frequencies.len();
    builder.set_frequencies(frequencies);

    let schemas = builder.run();
    buffer::append(output_path, &builder.render(&schemas))?;

    Ok(SchemaSummary {
        records: records.len(),
        events: builder.events().len(),
        frequencies: frequency_count,
        schemas: schemas.len(),
    })
}

/// Runs the configured stages.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run with the pre-annotated corpus named by the configuration.
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        if !self.config.stage.runs_chains() {
            return self.run_with(&mut AnnotatedCorpus::default(), &[]);
        }
        let mut corpus = AnnotatedCorpus::load(&self.config.corpus_path)?;
        log::info!(
            "loaded {} documents from {}",
            corpus.len(),
            self.config.corpus_path.display()
        );
        let documents = corpus.raw_documents();
        self.run_with(&mut corpus, &documents)
    }

    /// Run with any annotator over the given documents.
    pub fn run_with<A: Annotator>(
        &self,
        annotator: &mut A,
        documents: &[RawDocument],
    ) -> Result<RunSummary, PipelineError> {
        let config = &self.config;
        let pair_path = config.pair_path();
        let mut summary = RunSummary::default();

        if config.stage.runs_chains() {
            summary.chains = Some(extract_chains(
                annotator,
                documents,
                &config.buffer_path,
                &config.error_path,
            )?);
        }
        if config.stage.runs_pairs() {
            summary.pairs = Some(pairs::build_pair_buffer(&config.buffer_path, &pair_path)?);
        }
        if config.stage.runs_schemas() {
            summary.schemas = Some(build_schemas(
                &pair_path,
                &config.output_path,
                &config.frequency_cache_path,
                config.write_frequency_cache,
                config.builder_settings(),
            )?);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotation::AnnotatedDocument;

    /// Runs out of resources on the listed ids and has nothing for the rest.
    struct Flaky {
        exhausted: Vec<&'static str>,
    }

    impl Annotator for Flaky {
        fn annotate(&mut self, document: &RawDocument) -> Result<AnnotatedDocument, AnnotationError> {
            if self.exhausted.contains(&document.id.as_str()) {
                return Err(AnnotationError::ResourceExhausted(document.id.clone()));
            }
            Err(AnnotationError::MissingDocument(document.id.clone()))
        }
    }

    fn raw(id: &str) -> RawDocument {
        RawDocument {
            id: id.to_string(),
            text: String::new(),
        }
    }

    #[test]
    fn exhausted_documents_go_to_error_file() {
        let dir = tempfile::tempdir().unwrap();
        let buffer_path = dir.path().join("buffer");
        let error_path = dir.path().join("errors");
        let mut annotator = Flaky {
            exhausted: vec!["d2"],
        };
        let summary = extract_chains(
            &mut annotator,
            &[raw("d1"), raw("d2"), raw("d3")],
            &buffer_path,
            &error_path,
        )
        .unwrap();
        assert_eq!(summary.documents, 3);
        assert_eq!(summary.exhausted, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.written, 0);
        assert_eq!(std::fs::read_to_string(&error_path).unwrap(), "d2\n");
        assert_eq!(std::fs::read_to_string(&buffer_path).unwrap(), "");
    }

    #[test]
    fn unwritable_error_file_does_not_stop_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let buffer_path = dir.path().join("buffer");
        let error_path = dir.path().join("missing").join("errors");
        let mut annotator = Flaky {
            exhausted: vec!["d1", "d2"],
        };
        let summary = extract_chains(
            &mut annotator,
            &[raw("d1"), raw("d2"), raw("d3")],
            &buffer_path,
            &error_path,
        )
        .unwrap();
        assert_eq!(summary.exhausted, 2);
        assert_eq!(summary.skipped, 1);
        assert!(!error_path.exists());
    }

    #[test]
    fn unsafe_document_ids_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let buffer_path = dir.path().join("buffer");
        let error_path = dir.path().join("errors");
        let mut annotator = Flaky {
            exhausted: vec!["d:1"],
        };
        let summary = extract_chains(
            &mut annotator,
            &[raw("d:1"), raw("d;2")],
            &buffer_path,
            &error_path,
        )
        .unwrap();
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.exhausted, 0);
        assert!(!error_path.exists());
    }

    #[test]
    fn missing_pair_buffer_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_schemas(
            &dir.path().join("nope"),
            &dir.path().join("out"),
            &dir.path().join("cache"),
            false,
            BuilderSettings::default(),
        );
        assert!(matches!(result, Err(PipelineError::Buffer(BufferError::Io(_)))));
    }
}
