/// Annotation consumer: the contract of the external NLP annotation
/// service and a pre-annotated corpus that fulfils it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotationError {
    /// The annotator ran out of memory or time on this document.
    #[error("annotation resources exhausted for document '{0}'")]
    ResourceExhausted(String),
    #[error("no annotation available for document '{0}'")]
    MissingDocument(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A document as handed to the annotator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,
    pub text: String,
}

/// A token of a parsed sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// 1-based position within the sentence.
    pub index: usize,
    pub word: String,
    pub lemma: String,
    /// Penn-style part-of-speech tag; verbs start with `V`.
    pub pos: String,
    /// 0-based sentence index within the document.
    pub sentence_index: usize,
    /// Character offset of the token in the document text.
    pub begin: usize,
    #[serde(default)]
    pub document_id: String,
}

impl Token {
    /// The lemma if the annotator produced one, else the surface form.
    pub fn lemma_or_word(&self) -> &str {
        if self.lemma.is_empty() {
            &self.word
        } else {
            &self.lemma
        }
    }

    pub fn is_verb(&self) -> bool {
        self.pos.starts_with('V')
    }
}

/// A typed dependency edge between two tokens of one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub governor: usize,
    pub dependent: usize,
    pub relation: String,
}

/// Dependency graph of one sentence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceGraph {
    pub tokens: Vec<Token>,
    pub edges: Vec<DependencyEdge>,
}

impl SentenceGraph {
    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.iter().find(|t| t.index == index)
    }

    /// All edges carrying the given relation label.
    pub fn edges_with<'a>(&'a self, relation: &'a str) -> impl Iterator<Item = &'a DependencyEdge> {
        self.edges.iter().filter(move |e| e.relation == relation)
    }
}

/// A mention inside a coreference chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorefMention {
    pub span: String,
    /// 1-based sentence number.
    pub sentence_number: usize,
    /// 1-based token index of the head word.
    pub head_index: usize,
}

/// Mentions the annotator believes refer to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorefChain {
    pub representative: CorefMention,
    pub mentions: Vec<CorefMention>,
}

/// Output of the annotation service for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub sentences: Vec<SentenceGraph>,
    #[serde(default)]
    pub coref: BTreeMap<u32, CorefChain>,
}

/// Boundary to the external annotation pipeline.
pub trait Annotator {
    fn annotate(&mut self, document: &RawDocument) -> Result<AnnotatedDocument, AnnotationError>;
}

/// Documents annotated ahead of time and stored as RON.
#[derive(Debug, Clone, Default)]
pub struct AnnotatedCorpus {
    documents: Vec<AnnotatedDocument>,
}

impl AnnotatedCorpus {
    pub fn new(documents: Vec<AnnotatedDocument>) -> Self {
        Self { documents }
    }

    /// Parse a RON list of annotated documents.
    pub fn parse_ron(source: &str) -> Result<Self, AnnotationError> {
        let documents: Vec<AnnotatedDocument> = ron::from_str(source)?;
        Ok(Self::new(documents))
    }

    /// Load a RON file, or every `.ron` file of a directory in name order.
    pub fn load(path: &Path) -> Result<Self, AnnotationError> {
        if path.is_dir() {
            let mut files: Vec<_> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("ron"))
                .collect();
            files.sort();
            let mut documents = Vec::new();
            for file in files {
                let contents = std::fs::read_to_string(&file)?;
                documents.extend(Self::parse_ron(&contents)?.documents);
            }
            Ok(Self::new(documents))
        } else {
            let contents = std::fs::read_to_string(path)?;
            Self::parse_ron(&contents)
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The raw documents to feed back through `annotate`.
    pub fn raw_documents(&self) -> Vec<RawDocument> {
        self.documents
            .iter()
            .map(|d| RawDocument {
                id: d.id.clone(),
                text: d.text.clone(),
            })
            .collect()
    }
}

impl Annotator for AnnotatedCorpus {
    fn annotate(&mut self, document: &RawDocument) -> Result<AnnotatedDocument, AnnotationError> {
        self.documents
            .iter()
            .find(|d| d.id == document.id)
            .cloned()
            .ok_or_else(|| AnnotationError::MissingDocument(document.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = r#"[
        (
            id: "d1",
            text: "John ate. He slept.",
            sentences: [
                (
                    tokens: [
                        (index: 1, word: "John", lemma: "John", pos: "NNP", sentence_index: 0, begin: 0),
                        (index: 2, word: "ate", lemma: "eat", pos: "VBD", sentence_index: 0, begin: 5),
                    ],
                    edges: [(governor: 2, dependent: 1, relation: "nsubj")],
                ),
            ],
            coref: {
                1: (
                    representative: (span: "John", sentence_number: 1, head_index: 1),
                    mentions: [
                        (span: "John", sentence_number: 1, head_index: 1),
                        (span: "He", sentence_number: 2, head_index: 1),
                    ],
                ),
            },
        ),
    ]"#;

    #[test]
    fn parse_corpus() {
        let corpus = AnnotatedCorpus::parse_ron(CORPUS).unwrap();
        assert_eq!(corpus.len(), 1);
        let raw = corpus.raw_documents();
        assert_eq!(raw[0].id, "d1");
        assert_eq!(raw[0].text, "John ate. He slept.");
    }

    #[test]
    fn annotate_known_and_unknown() {
        let mut corpus = AnnotatedCorpus::parse_ron(CORPUS).unwrap();
        let doc = corpus
            .annotate(&RawDocument {
                id: "d1".into(),
                text: String::new(),
            })
            .unwrap();
        assert_eq!(doc.sentences[0].tokens.len(), 2);
        assert_eq!(doc.coref[&1].mentions.len(), 2);

        let missing = corpus.annotate(&RawDocument {
            id: "nope".into(),
            text: String::new(),
        });
        assert!(matches!(missing, Err(AnnotationError::MissingDocument(_))));
    }

    #[test]
    fn token_lookup_and_helpers() {
        let corpus = AnnotatedCorpus::parse_ron(CORPUS).unwrap();
        let mut c = corpus;
        let doc = c
            .annotate(&RawDocument {
                id: "d1".into(),
                text: String::new(),
            })
            .unwrap();
        let sentence = &doc.sentences[0];
        assert_eq!(sentence.token(2).unwrap().lemma, "eat");
        assert!(sentence.token(2).unwrap().is_verb());
        assert!(sentence.token(9).is_none());
        assert_eq!(sentence.edges_with("nsubj").count(), 1);
        assert_eq!(sentence.edges_with("dobj").count(), 0);
    }

    #[test]
    fn lemma_falls_back_to_word() {
        let t = Token {
            index: 1,
            word: "Ran".into(),
            lemma: String::new(),
            pos: "VBD".into(),
            sentence_index: 0,
            begin: 0,
            document_id: String::new(),
        };
        assert_eq!(t.lemma_or_word(), "Ran");
    }
}
