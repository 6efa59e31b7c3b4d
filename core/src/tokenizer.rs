//! Query and document text normalization.
//!
//! One pipeline for both sides of the index: NFKC fold, lowercase, regex
//! word extraction (which strips punctuation and drops empty tokens),
//! stopword removal, and English Snowball stemming. Pure and
//! deterministic; identical input always yields identical terms.

use crate::error::{Result, SearchError};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Normalize text into index terms. Empty input yields an empty sequence.
pub fn normalize(text: &str) -> Vec<String> {
    let folded = text.nfkc().collect::<String>().to_lowercase();
    let mut terms = Vec::new();
    for mat in WORD_RE.find_iter(&folded) {
        let token = mat.as_str();
        if is_stopword(token) {
            continue;
        }
        terms.push(STEMMER.stem(token).to_string());
    }
    terms
}

/// Normalize a string expected to hold exactly one term.
///
/// More than one resulting token is a usage error. Zero tokens (a
/// stopword, or pure punctuation) yields `None`: such a term cannot exist
/// in the index, and absence is not an error.
pub fn normalize_term(term: &str) -> Result<Option<String>> {
    let mut tokens = normalize(term);
    match tokens.len() {
        0 => Ok(None),
        1 => Ok(Some(tokens.remove(0))),
        n => Err(SearchError::MultiTokenTerm {
            term: term.to_string(),
            tokens: n,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_and_drops_stopwords() {
        let terms = normalize("The runner was running a run!");
        assert_eq!(terms, vec!["runner", "run", "run"]);
    }

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(normalize("BEAR, attack."), vec!["bear", "attack"]);
    }

    #[test]
    fn empty_input_yields_no_terms() {
        assert!(normalize("").is_empty());
        assert!(normalize("   \t\n").is_empty());
    }

    #[test]
    fn deterministic() {
        let text = "Space war: the final frontier";
        assert_eq!(normalize(text), normalize(text));
    }

    #[test]
    fn single_token_rule() {
        assert_eq!(normalize_term("Bears").unwrap(), Some("bear".to_string()));
        // A stopword normalizes away entirely.
        assert_eq!(normalize_term("the").unwrap(), None);
        assert!(matches!(
            normalize_term("bear attack"),
            Err(SearchError::MultiTokenTerm { tokens: 2, .. })
        ));
    }
}
