use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Role bucket used when scoring candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoleKind {
    Subject,
    Object,
    Preposition,
}

impl RoleKind {
    /// Roles whose presence completes the argument structure of a verb
    /// seen with this role.
    pub fn complements(&self) -> &'static [RoleKind] {
        match self {
            Self::Subject => &[RoleKind::Object],
            Self::Object => &[RoleKind::Subject],
            Self::Preposition => &[RoleKind::Subject, RoleKind::Object],
        }
    }
}

/// The grammatical slot a dependent fills for its verb.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Subject,
    Object,
    /// Prepositional argument. `None` is the collapsed form that ignores
    /// which preposition was used.
    Preposition(Option<String>),
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Subject => RoleKind::Subject,
            Self::Object => RoleKind::Object,
            Self::Preposition(_) => RoleKind::Preposition,
        }
    }

    /// Drop the preposition tag, keeping subjects and objects untouched.
    pub fn collapsed(&self) -> Role {
        match self {
            Self::Preposition(_) => Self::Preposition(None),
            other => other.clone(),
        }
    }

    /// Parse a role label: `s`, `o`, `p` or `p_<prep>`.
    pub fn parse(label: &str) -> Option<Role> {
        match label {
            "s" => Some(Self::Subject),
            "o" => Some(Self::Object),
            "p" => Some(Self::Preposition(None)),
            _ => {
                let prep = label.strip_prefix("p_")?;
                if prep.is_empty() {
                    None
                } else {
                    Some(Self::Preposition(Some(prep.to_string())))
                }
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject => f.write_str("s"),
            Self::Object => f.write_str("o"),
            Self::Preposition(None) => f.write_str("p"),
            Self::Preposition(Some(prep)) => write!(f, "p_{}", prep),
        }
    }
}

/// A verb lemma paired with a grammatical role, e.g. `arrest-o`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypedDep {
    pub verb: String,
    pub role: Role,
}

impl TypedDep {
    pub fn new(verb: impl Into<String>, role: Role) -> Self {
        Self {
            verb: verb.into(),
            role,
        }
    }

    /// Parse the textual form `verb-role`. The role is everything after the
    /// last hyphen, so hyphenated verbs survive.
    pub fn parse(text: &str) -> Option<TypedDep> {
        let (verb, role) = text.rsplit_once('-')?;
        if verb.is_empty() {
            return None;
        }
        Some(Self::new(verb, Role::parse(role)?))
    }

    pub fn collapsed(&self) -> TypedDep {
        Self::new(self.verb.clone(), self.role.collapsed())
    }
}

impl fmt::Display for TypedDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.verb, self.role)
    }
}

/// One observation of a verb taking an argument in a given role.
///
/// Two events are equal when their typed dependencies are equal; the
/// argument, mention and document are deliberately ignored so that
/// observations merge across documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedEvent {
    pub typed_dep: TypedDep,
    /// Lemma (or surface form) of the resolved dependent.
    pub argument: String,
    /// Identity of the resolved mention; shared by coreferent arguments.
    pub mention_id: String,
    pub document_id: String,
}

impl TypedEvent {
    pub fn new(
        typed_dep: TypedDep,
        argument: impl Into<String>,
        mention_id: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            typed_dep,
            argument: argument.into(),
            mention_id: mention_id.into(),
            document_id: document_id.into(),
        }
    }

    pub fn verb(&self) -> &str {
        &self.typed_dep.verb
    }

    /// Parse the textual form `verb-role( argument ) [ mention_id ]`.
    pub fn parse(text: &str, document_id: &str) -> Option<TypedEvent> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        if parts.len() < 5 {
            return None;
        }
        let typed_dep = TypedDep::parse(parts[0].strip_suffix('(')?)?;
        if parts[2] != ")" || parts[3] != "[" {
            return None;
        }
        Some(Self::new(typed_dep, parts[1], parts[4], document_id))
    }
}

impl PartialEq for TypedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.typed_dep == other.typed_dep
    }
}

impl Eq for TypedEvent {}

impl Hash for TypedEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.typed_dep.hash(state);
    }
}

impl fmt::Display for TypedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}( {} ) [ {} ]",
            self.typed_dep, self.argument, self.mention_id
        )
    }
}

/// Stable handle of a merged event inside the schema builder's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub usize);

/// All observations of one typed dependency across the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedEvent {
    pub typed_dep: TypedDep,
    pub arguments: BTreeSet<String>,
    pub occurrences: u64,
    /// Score of the last proposal that placed this event; starts at beta.
    pub max_score: f64,
}

impl MergedEvent {
    pub fn new(typed_dep: TypedDep, argument: impl Into<String>, beta: f64) -> Self {
        let mut arguments = BTreeSet::new();
        arguments.insert(argument.into());
        Self {
            typed_dep,
            arguments,
            occurrences: 1,
            max_score: beta,
        }
    }

    /// Fold another observation of the same typed dependency into this one.
    pub fn absorb(&mut self, argument: impl Into<String>) {
        self.arguments.insert(argument.into());
        self.occurrences += 1;
    }

    pub fn verb(&self) -> &str {
        &self.typed_dep.verb
    }
}
