//! Knowledge resolver — decides whether a question is already known
//!
//! Pure keyword/synonym scoring over the current knowledge snapshot; no side
//! effects. Scoring weights, in order of dominance:
//!
//! - +100 full-string substring match (either direction) between the
//!   normalized query and the normalized entry question
//! - +50  any expanded query token is a substring of the entry's category
//! - +20  per expanded query token exactly equal to an entry-question token
//! - +5   per expanded query token in a substring relation (either direction)
//!   with an entry-question token, excluding ones already counted exact
//! - +10  flat bonus for learned entries, preferring supervisor-provided
//!   answers over generic seed answers when scores are close
//!
//! Only entries scoring above zero are candidates; the strict maximum wins and
//! ties go to the first entry in storage order. That tie-break is part of the
//! contract (reproducibility), not an accident.

use std::collections::BTreeSet;

use frontdesk_common::Result;
use sqlx::SqlitePool;

use crate::db;
use crate::models::{KnowledgeEntry, KnowledgeSource};

/// Tokens this short never participate in keyword scoring
const MIN_TOKEN_LEN: usize = 4;

/// Words carrying no signal for matching: articles, pronouns, question
/// scaffolding, and the domain's own name words.
const STOP_WORDS: &[&str] = &[
    "about", "could", "does", "have", "many", "much", "salon", "shop", "some",
    "that", "there", "these", "this", "those", "what", "when", "where", "which",
    "will", "with", "would", "your", "yours",
];

/// Bidirectional synonym groups: any member of a group expands to all members.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["price", "cost", "costs", "pricing", "fee", "charge", "rate"],
    &["hours", "open", "opening", "closed", "closing", "schedule"],
    &["location", "located", "address", "directions"],
    &["appointment", "appointments", "booking", "reservation", "reserve"],
    &["color", "colour", "coloring", "colouring", "highlights", "tint"],
    &["haircut", "haircuts", "trim"],
];

/// Resolver configuration: matching toggle plus the token tables, fixed at
/// construction (plain injected data, no global state)
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Apply the raw full-string substring test even when the token filter
    /// would discard the whole query. Broad-recall behavior; can be switched
    /// off for strictly token-based matching.
    pub raw_substring_match: bool,
    stop_words: Vec<String>,
    synonym_groups: Vec<Vec<String>>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ResolverConfig {
    pub fn new(raw_substring_match: bool) -> Self {
        Self {
            raw_substring_match,
            stop_words: STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            synonym_groups: SYNONYM_GROUPS
                .iter()
                .map(|group| group.iter().map(|w| w.to_string()).collect())
                .collect(),
        }
    }

    /// Lowercase and trim
    fn normalize(query: &str) -> String {
        query.trim().to_lowercase()
    }

    /// Split normalized text into scoring tokens: alphanumeric runs longer
    /// than three characters, minus stop words
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.len() >= MIN_TOKEN_LEN)
            .filter(|word| !self.stop_words.iter().any(|s| s == word))
            .map(str::to_string)
            .collect()
    }

    /// Expand a token set through the synonym groups (set union)
    fn expand(&self, tokens: &[String]) -> BTreeSet<String> {
        let mut expanded: BTreeSet<String> = tokens.iter().cloned().collect();
        for token in tokens {
            for group in &self.synonym_groups {
                if group.iter().any(|member| member == token) {
                    expanded.extend(group.iter().cloned());
                }
            }
        }
        expanded
    }

    /// Score one entry against a prepared query
    fn score_entry(
        &self,
        entry: &KnowledgeEntry,
        normalized_query: &str,
        expanded: &BTreeSet<String>,
    ) -> i64 {
        let mut score = 0i64;
        let normalized_question = Self::normalize(&entry.question);

        // Full-string substring match, either direction. Empty strings are
        // excluded: `contains("")` is trivially true and would match every
        // entry against a blank query.
        if self.raw_substring_match
            && !normalized_query.is_empty()
            && !normalized_question.is_empty()
            && (normalized_question.contains(normalized_query)
                || normalized_query.contains(&normalized_question))
        {
            score += 100;
        }

        // Category hit: any expanded token appearing inside the category
        if let Some(category) = &entry.category {
            let category = Self::normalize(category);
            if expanded.iter().any(|token| category.contains(token.as_str())) {
                score += 50;
            }
        }

        // Keyword overlap with the entry's question, filtered the same way
        // as the query (entry tokens are NOT synonym-expanded)
        let question_tokens = self.tokenize(&normalized_question);
        for token in expanded {
            if question_tokens.iter().any(|qt| qt == token) {
                score += 20;
            } else if question_tokens
                .iter()
                .any(|qt| qt.contains(token.as_str()) || token.contains(qt.as_str()))
            {
                score += 5;
            }
        }

        // Prefer supervisor-provided answers over generic seeds on near-ties
        if entry.source == KnowledgeSource::Learned {
            score += 10;
        }

        score
    }

    /// Best-matching entry for a free-text query, or None when nothing
    /// scores above zero
    ///
    /// Ties break toward the first entry in storage order.
    pub fn resolve<'a>(
        &self,
        entries: &'a [KnowledgeEntry],
        query: &str,
    ) -> Option<&'a KnowledgeEntry> {
        let normalized_query = Self::normalize(query);
        let expanded = self.expand(&self.tokenize(&normalized_query));

        let mut best: Option<(&KnowledgeEntry, i64)> = None;
        for entry in entries {
            let score = self.score_entry(entry, &normalized_query, &expanded);
            if score <= 0 {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((entry, score)),
            }
        }

        best.map(|(entry, _)| entry)
    }
}

/// Resolve a query against the stored knowledge snapshot
pub async fn resolve_query(
    pool: &SqlitePool,
    config: &ResolverConfig,
    query: &str,
) -> Result<Option<KnowledgeEntry>> {
    let entries = db::knowledge::list_entries(pool).await?;
    Ok(config.resolve(&entries, query).cloned())
}
