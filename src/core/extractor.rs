/// Chain extraction: typed events from dependency graphs, grouped into
/// entity-centred chains.

use crate::core::annotation::{AnnotatedDocument, CorefChain, CorefMention, SentenceGraph, Token};
use crate::schema::event::{Role, RoleKind, TypedDep, TypedEvent};

/// Core grammatical relations and the role each one fills.
const CORE_RELATIONS: &[(&str, RoleKind)] = &[
    ("nsubjpass", RoleKind::Object),
    ("dobj", RoleKind::Object),
    ("iobj", RoleKind::Object),
    ("obj", RoleKind::Object),
    ("nsubj", RoleKind::Subject),
    ("subj", RoleKind::Subject),
    ("agent", RoleKind::Subject),
];

/// Collapsed prepositional relations look like `prep_of`.
const PREPOSITION_PREFIX: &str = "prep_";

/// Auxiliary and copula governors carry no event semantics.
const IGNORED_GOVERNORS: &[&str] = &["be", "do"];

/// All events of one document whose argument resolved to one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityChain {
    /// Lemma of the protagonist.
    pub entity: String,
    pub events: Vec<TypedEvent>,
}

impl EntityChain {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Extracts entity chains from annotated documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainExtractor;

impl ChainExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the non-empty entity chains of one document.
    pub fn extract(&self, document: &AnnotatedDocument) -> Vec<EntityChain> {
        let mut state = DocumentState::new(document);
        for sentence in &document.sentences {
            state.capture(sentence);
        }
        state.into_chains()
    }
}

/// Per-document working state, discarded after extraction.
struct DocumentState<'a> {
    document: &'a AnnotatedDocument,
    /// Coreference chains with more than one mention, in chain-id order.
    chains: Vec<&'a CorefChain>,
    /// Tokens that matched a coreference chain, distinct by word and tag.
    entities: Vec<&'a Token>,
    /// Each event with the lemma of its resolved dependent.
    events: Vec<(TypedEvent, String)>,
}

impl<'a> DocumentState<'a> {
    fn new(document: &'a AnnotatedDocument) -> Self {
        let chains = document
            .coref
            .values()
            .filter(|c| c.mentions.len() > 1)
            .collect();
        Self {
            document,
            chains,
            entities: Vec::new(),
            events: Vec::new(),
        }
    }

    fn capture(&mut self, sentence: &'a SentenceGraph) {
        for (relation, kind) in CORE_RELATIONS {
            let role = match kind {
                RoleKind::Subject => Role::Subject,
                _ => Role::Object,
            };
            for edge in sentence.edges_with(relation) {
                self.record(sentence, edge.governor, edge.dependent, role.clone());
            }
        }
        for edge in &sentence.edges {
            if let Some(prep) = edge.relation.strip_prefix(PREPOSITION_PREFIX) {
                if prep.is_empty() {
                    continue;
                }
                let role = Role::Preposition(Some(prep.to_string()));
                self.record(sentence, edge.governor, edge.dependent, role);
            }
        }
    }

    fn record(&mut self, sentence: &'a SentenceGraph, governor: usize, dependent: usize, role: Role) {
        let (Some(gov), Some(dep)) = (sentence.token(governor), sentence.token(dependent)) else {
            log::debug!(
                "document '{}': edge {} -> {} points outside its sentence",
                self.document.id,
                governor,
                dependent
            );
            return;
        };
        if !gov.is_verb() || IGNORED_GOVERNORS.contains(&gov.lemma_or_word()) {
            return;
        }

        let resolved = self.resolve(dep);
        let argument = resolved.lemma_or_word().to_string();
        let event = TypedEvent::new(
            TypedDep::new(gov.lemma_or_word(), role),
            argument.clone(),
            self.mention_id(resolved),
            self.document.id.clone(),
        );
        self.events.push((event, argument));
    }

    /// Map a token to its canonical mention.
    ///
    /// A token matching a representative mention is its own canonical form;
    /// a token matching any other mention resolves to the head word of the
    /// representative. Both become entities of the document.
    fn resolve(&mut self, token: &'a Token) -> &'a Token {
        for chain in self.chains.clone() {
            if chain.representative.span == token.word {
                self.note_entity(token);
                return token;
            }
            if chain.mentions.iter().any(|m| m.span == token.word) {
                self.note_entity(token);
                return match self.head_of(&chain.representative) {
                    Some(head) => head,
                    None => {
                        log::warn!(
                            "document '{}': representative '{}' has no head at sentence {} index {}, keeping '{}'",
                            self.document.id,
                            chain.representative.span,
                            chain.representative.sentence_number,
                            chain.representative.head_index,
                            token.word
                        );
                        token
                    }
                };
            }
        }
        token
    }

    fn head_of(&self, mention: &CorefMention) -> Option<&'a Token> {
        let sentence = self
            .document
            .sentences
            .get(mention.sentence_number.checked_sub(1)?)?;
        sentence.token(mention.head_index)
    }

    fn note_entity(&mut self, token: &'a Token) {
        let known = self
            .entities
            .iter()
            .any(|e| e.word == token.word && e.pos == token.pos);
        if !known {
            self.entities.push(token);
        }
    }

    fn mention_id(&self, token: &Token) -> String {
        format!("{}_{}_{}", self.document.id, token.sentence_index, token.begin)
    }

    /// One chain per distinct entity lemma, in discovery order.
    fn into_chains(self) -> Vec<EntityChain> {
        let mut lemmas: Vec<&str> = Vec::new();
        for entity in &self.entities {
            let lemma = entity.lemma_or_word();
            if !lemmas.contains(&lemma) {
                lemmas.push(lemma);
            }
        }

        lemmas
            .into_iter()
            .map(|lemma| EntityChain {
                entity: lemma.to_string(),
                events: self
                    .events
                    .iter()
                    .filter(|(_, dep)| dep == lemma)
                    .map(|(e, _)| e.clone())
                    .collect(),
            })
            .filter(|c| !c.is_empty())
            .collect()
    }
}
