use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Edition words that may trail a versioned product name.
pub const EDITION_WORDS: &[&str] = &["pro", "plus", "premium", "enterprise"];

/// Substrings that mark a term as a company or legal entity.
pub const COMPANY_INDICATORS: &[&str] = &["inc", "corp", "ltd", "llc", "company", "corporation"];

/// Which substitution strategy a find term calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermClass {
    Generic,
    VersionedProduct,
    CompanyName,
}

impl std::fmt::Display for TermClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TermClass::Generic => "generic text",
            TermClass::VersionedProduct => "versioned product",
            TermClass::CompanyName => "company name",
        };
        f.write_str(label)
    }
}

/// Version number and edition word carried by a versioned product term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionParts {
    pub name: String,
    pub version: String,
    pub edition: Option<String>,
}

fn versioned_product_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?P<name>.*\S)\s+(?P<version>\d+(?:\.\d+)*)(?:\s*(?P<edition>pro|plus|premium|enterprise))?$",
        )
        .expect("versioned product pattern is valid")
    })
}

/// Split a `<name> <number>[.<number>...] [edition]` term into its parts.
pub fn version_parts(term: &str) -> Option<VersionParts> {
    let caps = versioned_product_pattern().captures(term.trim())?;
    Some(VersionParts {
        name: caps["name"].to_string(),
        version: caps["version"].to_string(),
        edition: caps.name("edition").map(|m| m.as_str().to_string()),
    })
}

/// Classify a find term. Versioned products take precedence over company names.
pub fn classify(term: &str) -> TermClass {
    if version_parts(term).is_some() {
        return TermClass::VersionedProduct;
    }

    let lowered = term.to_lowercase();
    if COMPANY_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
    {
        return TermClass::CompanyName;
    }

    TermClass::Generic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_product_with_edition() {
        assert_eq!(classify("Gemini 2.5 Pro"), TermClass::VersionedProduct);
        assert_eq!(classify("Suite 10 ENTERPRISE"), TermClass::VersionedProduct);

        let parts = version_parts("Gemini 2.5 Pro").unwrap();
        assert_eq!(parts.name, "Gemini");
        assert_eq!(parts.version, "2.5");
        assert_eq!(parts.edition.as_deref(), Some("Pro"));
    }

    #[test]
    fn test_versioned_product_without_edition() {
        assert_eq!(classify("Office 2019"), TermClass::VersionedProduct);
        let parts = version_parts("Office 2019").unwrap();
        assert_eq!(parts.version, "2019");
        assert_eq!(parts.edition, None);
    }

    #[test]
    fn test_version_number_required() {
        assert_eq!(classify("Gemini Pro"), TermClass::Generic);
        assert!(version_parts("2.5").is_none());
    }

    #[test]
    fn test_company_name() {
        assert_eq!(classify("Acme Inc"), TermClass::CompanyName);
        assert_eq!(classify("Globex Corporation"), TermClass::CompanyName);
        assert_eq!(classify("initech llc"), TermClass::CompanyName);
    }

    #[test]
    fn test_versioned_checked_before_company() {
        assert_eq!(classify("Acme Corp 3"), TermClass::VersionedProduct);
    }

    #[test]
    fn test_generic() {
        assert_eq!(classify("OldBrand"), TermClass::Generic);
    }
}
