//! The replacement engine: term classification, text substitution, entity
//! extraction and the recursive field walker.

pub mod classifier;
pub mod entities;
pub mod substitute;
pub mod walker;

pub use classifier::{classify, version_parts, TermClass, VersionParts};
pub use entities::{
    CapitalizedPhraseDetector, Entity, EntityExtractor, EntityKind, NoopDetector, ProperNounDetector,
};
pub use substitute::{substitute, InfixReplacer, Substituter, Substitution};
pub use walker::{TreeWalker, Walked};
