//! Ordered validation pipeline for submitted phrases.
//!
//! Cheap synchronous checks (structure, chain link, repetition) run first and
//! short-circuit; the meaning check consults the dictionary cache and may
//! suspend on a remote lookup, so it is only reached by otherwise-legal input.

use std::{collections::HashSet, fmt, sync::Arc};

use serde::Serialize;

use crate::{
    config::{ChainMode, GameConfig},
    services::dictionary::DictionaryCache,
};

/// Vowels (with Vietnamese diacritics) used to locate the rhyme of a syllable.
const VOWELS: &str = "aàáảãạăằắẳẵặâầấẩẫậeèéẻẽẹêềếểễệiìíỉĩịoòóỏõọôồốổỗộơờớởỡợuùúủũụưừứửữựyỳýỷỹỵ";

/// Reason a phrase was refused. These drive elimination, never crashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Wrong token count, a token too short, or non-alphabetic characters.
    FormatInvalid,
    /// The leading token does not link to the previous phrase.
    ChainMismatch,
    /// The phrase was already played in this match.
    AlreadyUsed,
    /// Neither the local dictionary nor the remote lookup knows the phrase.
    NotMeaningful,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rejection::FormatInvalid => "format",
            Rejection::ChainMismatch => "chain",
            Rejection::AlreadyUsed => "repeat",
            Rejection::NotMeaningful => "meaning",
        };
        f.write_str(label)
    }
}

/// A tokenized, normalized phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    normalized: String,
    tokens: Vec<String>,
}

impl Phrase {
    /// Tokenize on whitespace and lowercase every token.
    pub fn parse(text: &str) -> Self {
        let tokens: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        Self {
            normalized: tokens.join(" "),
            tokens,
        }
    }

    /// Lowercased tokens joined by single spaces.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Lowercased tokens.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Leading token, if any.
    pub fn first_token(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Trailing token, if any.
    pub fn last_token(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// Consume the phrase, keeping its normalized form.
    pub fn into_normalized(self) -> String {
        self.normalized
    }
}

/// Normalize free text the way the pipeline and dictionary compare phrases.
pub fn normalize(text: &str) -> String {
    Phrase::parse(text).into_normalized()
}

fn is_vowel(c: char) -> bool {
    VOWELS.contains(c)
}

/// Strip the initial consonant cluster of a syllable, keeping the rhyme.
///
/// `qu` and `gi` count as initials when another vowel follows them. A token
/// without vowels is its own rhyme key.
pub fn rhyme_key(token: &str) -> String {
    let lower = token.to_lowercase();
    for initial in ["qu", "gi"] {
        if let Some(rest) = lower.strip_prefix(initial) {
            if rest.chars().next().is_some_and(is_vowel) {
                return rest.to_string();
            }
        }
    }
    match lower.char_indices().find(|(_, c)| is_vowel(*c)) {
        Some((index, _)) => lower[index..].to_string(),
        None => lower,
    }
}

/// Value a token contributes to the chain-link comparison under `mode`.
pub fn link_key(mode: ChainMode, token: &str) -> String {
    match mode {
        ChainMode::PrefixSuffix => token.to_lowercase(),
        ChainMode::RhymeKey => rhyme_key(token),
    }
}

/// Match-local facts the synchronous checks need.
#[derive(Debug, Clone, Copy)]
pub struct ChainContext<'a> {
    /// Last accepted phrase (normalized), `None` before the opening move.
    pub previous: Option<&'a str>,
    /// Phrases already accepted in the match.
    pub used: &'a HashSet<String>,
}

/// Rules shared by every stage, derived from [`GameConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    /// Exact number of tokens.
    pub word_count: usize,
    /// Minimum characters per token.
    pub min_token_len: usize,
    /// Chaining rule between phrases.
    pub chain_mode: ChainMode,
}

impl ValidationRules {
    /// Link value the next phrase must produce, if a previous phrase exists.
    pub fn required_link(&self, previous: Option<&str>) -> Option<String> {
        previous
            .and_then(|p| p.split_whitespace().last())
            .map(|token| link_key(self.chain_mode, token))
    }
}

impl From<&GameConfig> for ValidationRules {
    fn from(config: &GameConfig) -> Self {
        Self {
            word_count: config.word_count,
            min_token_len: config.min_token_len,
            chain_mode: config.chain_mode,
        }
    }
}

/// One synchronous stage of the pipeline.
pub trait Check: Send + Sync {
    /// Accept the phrase or name why it is refused.
    fn check(
        &self,
        rules: &ValidationRules,
        phrase: &Phrase,
        ctx: &ChainContext<'_>,
    ) -> Result<(), Rejection>;
}

/// Exact token count, minimum token length, alphabetic tokens.
pub struct StructuralCheck;

impl Check for StructuralCheck {
    fn check(
        &self,
        rules: &ValidationRules,
        phrase: &Phrase,
        _ctx: &ChainContext<'_>,
    ) -> Result<(), Rejection> {
        if phrase.tokens().len() != rules.word_count {
            return Err(Rejection::FormatInvalid);
        }
        let well_formed = phrase.tokens().iter().all(|token| {
            token.chars().count() >= rules.min_token_len && token.chars().all(char::is_alphabetic)
        });
        if well_formed {
            Ok(())
        } else {
            Err(Rejection::FormatInvalid)
        }
    }
}

/// Leading token must link to the previous phrase's trailing token.
pub struct LinkageCheck;

impl Check for LinkageCheck {
    fn check(
        &self,
        rules: &ValidationRules,
        phrase: &Phrase,
        ctx: &ChainContext<'_>,
    ) -> Result<(), Rejection> {
        let Some(required) = rules.required_link(ctx.previous) else {
            return Ok(());
        };
        let offered = phrase
            .first_token()
            .map(|token| link_key(rules.chain_mode, token));
        if offered.as_deref() == Some(required.as_str()) {
            Ok(())
        } else {
            Err(Rejection::ChainMismatch)
        }
    }
}

/// A phrase may only be played once per match.
pub struct RepetitionCheck;

impl Check for RepetitionCheck {
    fn check(
        &self,
        _rules: &ValidationRules,
        phrase: &Phrase,
        ctx: &ChainContext<'_>,
    ) -> Result<(), Rejection> {
        if ctx.used.contains(phrase.normalized()) {
            Err(Rejection::AlreadyUsed)
        } else {
            Ok(())
        }
    }
}

/// The full pipeline: ordered synchronous checks plus the dictionary meaning check.
pub struct ValidationPipeline {
    rules: ValidationRules,
    checks: Vec<Box<dyn Check>>,
    dictionary: Arc<DictionaryCache>,
}

impl ValidationPipeline {
    /// Standard ordering: structure, linkage, repetition, then meaning.
    pub fn new(rules: ValidationRules, dictionary: Arc<DictionaryCache>) -> Self {
        Self {
            rules,
            checks: vec![
                Box::new(StructuralCheck),
                Box::new(LinkageCheck),
                Box::new(RepetitionCheck),
            ],
            dictionary,
        }
    }

    /// Rules every check applies.
    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Dictionary consulted by the meaning check.
    pub fn dictionary(&self) -> &Arc<DictionaryCache> {
        &self.dictionary
    }

    /// Run the synchronous stages, returning the parsed phrase on success.
    pub fn precheck(&self, text: &str, ctx: &ChainContext<'_>) -> Result<Phrase, Rejection> {
        let phrase = Phrase::parse(text);
        for check in &self.checks {
            check.check(&self.rules, &phrase, ctx)?;
        }
        Ok(phrase)
    }

    /// Run every stage, awaiting the dictionary for the meaning check.
    pub async fn validate(&self, text: &str, ctx: &ChainContext<'_>) -> Result<Phrase, Rejection> {
        let phrase = self.precheck(text, ctx)?;
        if self.dictionary.verify(phrase.normalized()).await {
            Ok(phrase)
        } else {
            Err(Rejection::NotMeaningful)
        }
    }
}
