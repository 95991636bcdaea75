//! Opponent for single-player matches.

use std::sync::Arc;

use rand::{Rng, seq::IndexedRandom};

use crate::services::validation::{ChainContext, ValidationPipeline};

/// Picks a legal continuation from the known-valid phrases.
///
/// Only dictionary entries are considered, so the meaning check is implied
/// and the bot never waits on the remote lookup.
pub struct BotMoveGenerator {
    pipeline: Arc<ValidationPipeline>,
}

impl BotMoveGenerator {
    /// Bot drawing its moves from the pipeline dictionary.
    pub fn new(pipeline: Arc<ValidationPipeline>) -> Self {
        Self { pipeline }
    }

    /// Every phrase that would pass structure, linkage and repetition right now.
    pub fn candidates(&self, ctx: &ChainContext<'_>) -> Vec<String> {
        self.pipeline
            .dictionary()
            .phrases_matching(|phrase| self.pipeline.precheck(phrase, ctx).is_ok())
    }

    /// Uniformly random candidate, or `None` when the bot is out of moves.
    pub fn pick<R: Rng + ?Sized>(&self, ctx: &ChainContext<'_>, rng: &mut R) -> Option<String> {
        self.candidates(ctx).choose(rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, time::Duration};

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        config::ChainMode,
        services::{
            dictionary::tests::{StaticLookup, dictionary_with},
            validation::ValidationRules,
        },
    };

    fn bot(known: &[&str]) -> BotMoveGenerator {
        let dictionary = dictionary_with(known, StaticLookup::accepting(&[]), Duration::from_secs(1));
        let rules = ValidationRules {
            word_count: 2,
            min_token_len: 2,
            chain_mode: ChainMode::PrefixSuffix,
        };
        BotMoveGenerator::new(Arc::new(ValidationPipeline::new(rules, dictionary)))
    }

    #[test]
    fn only_linked_unused_phrases_are_candidates() {
        let bot = bot(&["con mèo", "mèo mướp", "mèo con", "chó mực", "mèo"]);
        let used: HashSet<String> = ["con mèo".to_string()].into_iter().collect();
        let ctx = ChainContext {
            previous: Some("con mèo"),
            used: &used,
        };
        let mut found = bot.candidates(&ctx);
        found.sort();
        assert_eq!(found, vec!["mèo con".to_string(), "mèo mướp".to_string()]);
    }

    #[test]
    fn pick_skips_used_phrases() {
        let bot = bot(&["con mèo", "mèo mướp", "mèo con"]);
        let used: HashSet<String> = ["con mèo", "mèo mướp"].iter().map(|p| p.to_string()).collect();
        let ctx = ChainContext {
            previous: Some("con mèo"),
            used: &used,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(bot.pick(&ctx, &mut rng).as_deref(), Some("mèo con"));
    }

    #[test]
    fn no_candidate_yields_none() {
        let bot = bot(&["con mèo", "chó mực"]);
        let used = HashSet::new();
        let ctx = ChainContext {
            previous: Some("bánh xèo"),
            used: &used,
        };
        assert_eq!(bot.pick(&ctx, &mut StdRng::seed_from_u64(1)), None);
    }
}
