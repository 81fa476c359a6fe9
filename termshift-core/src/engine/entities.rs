//! Entity extraction for entity-consistent replacement.
//!
//! Emails and URLs are found with fixed patterns. People and organizations
//! come from a pluggable [`ProperNounDetector`]; the default detector finds
//! none, which only narrows what named-entity mode can rewrite.

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::classifier::COMPANY_INDICATORS;
use super::substitute::{whole_word_pattern, InfixReplacer, Substitution};
use crate::error::{Result, SweepError};

pub const PATTERN_CONFIDENCE: f32 = 0.95;
pub const PERSON_CONFIDENCE: f32 = 0.9;
pub const ORG_CONFIDENCE: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    Person,
    Org,
    Email,
    Url,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub confidence: f32,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .expect("email pattern is valid")
    })
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).expect("url pattern is valid")
    })
}

pub fn is_email(text: &str) -> bool {
    email_pattern().is_match(text)
}

pub fn is_url(text: &str) -> bool {
    url_pattern().is_match(text)
}

/// Proper-noun detection backing PERSON and ORG extraction.
pub trait ProperNounDetector: Send + Sync {
    fn people(&self, text: &str) -> Vec<String>;
    fn organizations(&self, text: &str) -> Vec<String>;
}

/// Detects nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDetector;

impl ProperNounDetector for NoopDetector {
    fn people(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }

    fn organizations(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Heuristic detector over runs of capitalized words.
///
/// A run ending in a company indicator ("Acme Corp") is an organization;
/// any other run of two or three words ("Jane Doe") is a person.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapitalizedPhraseDetector;

impl CapitalizedPhraseDetector {
    fn phrases(text: &str) -> Vec<String> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"\b[A-Z][A-Za-z&'-]*\.?(?:[ \t]+[A-Z][A-Za-z&'-]*\.?)+")
                .expect("capitalized phrase pattern is valid")
        });
        pattern
            .find_iter(text)
            .map(|m| m.as_str().trim_end_matches('.').to_string())
            .collect()
    }

    fn is_organization(phrase: &str) -> bool {
        phrase
            .split_whitespace()
            .last()
            .map(|word| {
                let word = word.trim_end_matches('.').to_lowercase();
                COMPANY_INDICATORS.contains(&word.as_str())
            })
            .unwrap_or(false)
    }
}

impl ProperNounDetector for CapitalizedPhraseDetector {
    fn people(&self, text: &str) -> Vec<String> {
        Self::phrases(text)
            .into_iter()
            .filter(|p| !Self::is_organization(p))
            .filter(|p| (2..=3).contains(&p.split_whitespace().count()))
            .collect()
    }

    fn organizations(&self, text: &str) -> Vec<String> {
        Self::phrases(text)
            .into_iter()
            .filter(|p| Self::is_organization(p))
            .collect()
    }
}

pub struct EntityExtractor {
    detector: Box<dyn ProperNounDetector>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(Box::new(NoopDetector))
    }
}

impl std::fmt::Debug for EntityExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityExtractor").finish_non_exhaustive()
    }
}

impl EntityExtractor {
    pub fn new(detector: Box<dyn ProperNounDetector>) -> Self {
        Self { detector }
    }

    /// Extract people, organizations, emails and URLs, in that order.
    pub fn extract(&self, text: &str) -> Vec<Entity> {
        let mut entities = Vec::new();

        for person in self.detector.people(text) {
            entities.push(Entity {
                text: person,
                kind: EntityKind::Person,
                confidence: PERSON_CONFIDENCE,
            });
        }

        for org in self.detector.organizations(text) {
            entities.push(Entity {
                text: org,
                kind: EntityKind::Org,
                confidence: ORG_CONFIDENCE,
            });
        }

        for m in email_pattern().find_iter(text) {
            entities.push(Entity {
                text: m.as_str().to_string(),
                kind: EntityKind::Email,
                confidence: PATTERN_CONFIDENCE,
            });
        }

        for m in url_pattern().find_iter(text) {
            entities.push(Entity {
                text: m.as_str().to_string(),
                kind: EntityKind::Url,
                confidence: PATTERN_CONFIDENCE,
            });
        }

        entities
    }

    /// Replace entities according to an old -> new mapping.
    ///
    /// URLs are matched as full literal patterns, everything else as whole
    /// words. Longer old values are processed first so that an entity wins
    /// over any shorter entity it contains; entries of equal length are
    /// processed in the order given.
    pub fn replace_entities(&self, text: &str, mapping: &[(String, String)]) -> Result<Substitution> {
        let mut ordered: Vec<&(String, String)> = mapping
            .iter()
            .filter(|(old, _)| !old.trim().is_empty())
            .collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut result = text.to_string();
        let mut count = 0;

        for (old, new) in ordered {
            let pattern = if is_url(old) && !is_email(old) {
                Regex::new(&format!("(?i){}", regex::escape(old)))
                    .map_err(|e| SweepError::InvalidTerm(e.to_string()))?
            } else {
                whole_word_pattern(old)?
            };

            let found = pattern.find_iter(&result).count();
            if found > 0 {
                count += found;
                result = pattern.replace_all(&result, NoExpand(new)).into_owned();
            }
        }

        Ok(Substitution {
            text: result,
            count,
        })
    }

    /// Mapping for entities in `text` that embed the find term, e.g.
    /// `info@oldbrand.com` -> `info@newbrand.com` when renaming OldBrand.
    pub fn mapping_for_term(
        &self,
        text: &str,
        find_term: &str,
        replace_term: &str,
    ) -> Result<Vec<(String, String)>> {
        let rewriter = InfixReplacer::new(find_term, replace_term)?;
        let mut mapping: Vec<(String, String)> = Vec::new();

        for entity in self.extract(text) {
            if entity.text.eq_ignore_ascii_case(find_term.trim()) || !rewriter.contains(&entity.text) {
                continue;
            }
            if mapping.iter().any(|(old, _)| *old == entity.text) {
                continue;
            }
            let renamed = rewriter.apply(&entity.text).text;
            mapping.push((entity.text, renamed));
        }

        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_email_and_url() {
        let extractor = EntityExtractor::default();
        let entities = extractor.extract("Mail sales@oldbrand.com or visit https://oldbrand.com/shop today");

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].kind, EntityKind::Email);
        assert_eq!(entities[0].text, "sales@oldbrand.com");
        assert_eq!(entities[0].confidence, PATTERN_CONFIDENCE);
        assert_eq!(entities[1].kind, EntityKind::Url);
        assert_eq!(entities[1].text, "https://oldbrand.com/shop");
    }

    #[test]
    fn test_noop_detector_finds_no_people() {
        let extractor = EntityExtractor::default();
        let entities = extractor.extract("Jane Doe joined Acme Corp");
        assert!(entities.is_empty());
    }

    #[test]
    fn test_heuristic_detector() {
        let extractor = EntityExtractor::new(Box::new(CapitalizedPhraseDetector));
        let entities = extractor.extract("yesterday Jane Doe joined Acme Corp as CTO");

        let person = entities.iter().find(|e| e.kind == EntityKind::Person).unwrap();
        assert_eq!(person.text, "Jane Doe");
        assert_eq!(person.confidence, PERSON_CONFIDENCE);

        let org = entities.iter().find(|e| e.kind == EntityKind::Org).unwrap();
        assert_eq!(org.text, "Acme Corp");
        assert_eq!(org.confidence, ORG_CONFIDENCE);
    }

    #[test]
    fn test_replace_url_without_word_boundaries() {
        let extractor = EntityExtractor::default();
        let mapping = vec![(
            "https://oldbrand.com/".to_string(),
            "https://newbrand.com/".to_string(),
        )];

        let result = extractor
            .replace_entities("See https://oldbrand.com/ now", &mapping)
            .unwrap();
        assert_eq!(result.text, "See https://newbrand.com/ now");
        assert_eq!(result.count, 1);
    }

    #[test]
    fn test_longest_entity_wins() {
        let extractor = EntityExtractor::default();
        let mapping = vec![
            ("acme".to_string(), "zen".to_string()),
            ("info@acme.com".to_string(), "hello@zen.io".to_string()),
        ];

        let result = extractor
            .replace_entities("Write to info@acme.com, acme team", &mapping)
            .unwrap();
        assert_eq!(result.text, "Write to hello@zen.io, zen team");
        assert_eq!(result.count, 2);
    }

    #[test]
    fn test_mapping_for_term() {
        let extractor = EntityExtractor::default();
        let mapping = extractor
            .mapping_for_term("Contact help@oldbrandsupport.com", "OldBrand", "NewBrand")
            .unwrap();

        assert_eq!(
            mapping,
            vec![(
                "help@oldbrandsupport.com".to_string(),
                "help@newbrandsupport.com".to_string()
            )]
        );
    }
}
