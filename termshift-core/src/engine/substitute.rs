use regex::{NoExpand, Regex};

use super::classifier::{classify, version_parts, TermClass};
use crate::error::{Result, SweepError};

/// Output of a single rewrite: the new text and how many spans were replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub count: usize,
}

impl Substitution {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            count: 0,
        }
    }
}

fn ensure_term(term: &str) -> Result<()> {
    if term.trim().is_empty() {
        return Err(SweepError::InvalidTerm(
            "find term must not be empty or whitespace".to_string(),
        ));
    }
    Ok(())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive whole-word pattern for a literal term.
///
/// Only edges that end in a word character get a `\b`; a term ending in
/// punctuation ("Acme Inc.") is already delimited on that side.
pub fn whole_word_pattern(term: &str) -> Result<Regex> {
    ensure_term(term)?;
    let boundary = |edge: Option<char>| if edge.is_some_and(is_word_char) { r"\b" } else { "" };
    let pattern = format!(
        "(?i){}{}{}",
        boundary(term.chars().next()),
        regex::escape(term),
        boundary(term.chars().next_back())
    );
    Regex::new(&pattern).map_err(|e| SweepError::InvalidTerm(format!("{}: {}", term, e)))
}

/// Case-insensitive pattern for a literal term with no boundary requirement.
pub fn infix_pattern(term: &str) -> Result<Regex> {
    ensure_term(term)?;
    Regex::new(&format!("(?i){}", regex::escape(term)))
        .map_err(|e| SweepError::InvalidTerm(format!("{}: {}", term, e)))
}

/// The text emitted for each match under a given strategy.
///
/// Versioned products keep the version and edition of the find term:
/// renaming "Gemini 2.5 Pro" to "Aurora" yields "Aurora 2.5 Pro".
pub fn replacement_for(find_term: &str, replace_term: &str, strategy: TermClass) -> String {
    match strategy {
        // Company names swap like generic text; a trailing "Inc." or "Ltd."
        // still matches because punctuation edges carry no word boundary.
        TermClass::Generic | TermClass::CompanyName => replace_term.to_string(),
        TermClass::VersionedProduct => match version_parts(find_term) {
            Some(parts) => {
                let mut out = format!("{} {}", replace_term, parts.version);
                if let Some(edition) = parts.edition {
                    out.push(' ');
                    out.push_str(&edition);
                }
                out
            }
            None => replace_term.to_string(),
        },
    }
}

/// A compiled whole-word rewrite, built once and applied to many leaves.
#[derive(Debug, Clone)]
pub struct Substituter {
    pattern: Regex,
    replacement: String,
    strategy: TermClass,
}

impl Substituter {
    pub fn new(find_term: &str, replace_term: &str, strategy: TermClass) -> Result<Self> {
        Ok(Self {
            pattern: whole_word_pattern(find_term)?,
            replacement: replacement_for(find_term, replace_term, strategy),
            strategy,
        })
    }

    /// Pick the strategy from the find term itself.
    pub fn context_aware(find_term: &str, replace_term: &str) -> Result<Self> {
        Self::new(find_term, replace_term, classify(find_term))
    }

    pub fn strategy(&self) -> TermClass {
        self.strategy
    }

    pub fn apply(&self, text: &str) -> Substitution {
        let count = self.pattern.find_iter(text).count();
        if count == 0 {
            return Substitution::unchanged(text);
        }

        Substitution {
            text: self
                .pattern
                .replace_all(text, NoExpand(&self.replacement))
                .into_owned(),
            count,
        }
    }
}

/// Rewrite every whole-word occurrence of `find_term` in `text`.
pub fn substitute(
    text: &str,
    find_term: &str,
    replace_term: &str,
    strategy: TermClass,
) -> Result<Substitution> {
    Ok(Substituter::new(find_term, replace_term, strategy)?.apply(text))
}

/// Rewrites a term wherever it appears inside a token, such as a URL or
/// an email address, matching the case of each matched span.
#[derive(Debug, Clone)]
pub struct InfixReplacer {
    pattern: Regex,
    replacement: String,
}

impl InfixReplacer {
    pub fn new(find_term: &str, replace_term: &str) -> Result<Self> {
        Ok(Self {
            pattern: infix_pattern(find_term)?,
            replacement: replace_term.to_string(),
        })
    }

    pub fn contains(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn apply(&self, text: &str) -> Substitution {
        let count = self.pattern.find_iter(text).count();
        if count == 0 {
            return Substitution::unchanged(text);
        }

        let replaced = self
            .pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                match_case(&caps[0], &self.replacement)
            })
            .into_owned();

        Substitution {
            text: replaced,
            count,
        }
    }
}

fn match_case(matched: &str, replacement: &str) -> String {
    let has_letters = matched.chars().any(char::is_alphabetic);
    if has_letters && !matched.chars().any(char::is_uppercase) {
        replacement.to_lowercase()
    } else if has_letters && !matched.chars().any(char::is_lowercase) {
        replacement.to_uppercase()
    } else {
        replacement.to_string()
    }
}
