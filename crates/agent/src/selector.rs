//! Tool selection — scores candidate tools against a query.
//!
//! Each tool gets three component scores, all in [0, 1]:
//!
//! | Component | Signal |
//! |-----------|--------|
//! | lexical   | share of the tool-name words that appear in the query |
//! | topical   | query words found in the built-in topic vocabulary of the tool-name words |
//! | metadata  | query words found in the tool's registered description/keywords |
//!
//! Components with no signal source for a tool (no topic vocabulary, no
//! registered metadata) are left out and the remaining weights renormalized.
//! The weighted sum is lifted onto `[baseline, 1]`, so a tool that matches
//! nothing still scores a small non-zero baseline and can serve as fallback.
//!
//! # Determinism
//!
//! Scoring reads only the query, the tool names and registered metadata.
//! No clock or randomness is involved; identical inputs give identical scores.

use std::collections::{HashMap, HashSet};

use parley_config::WeightsConfig;
use parley_core::tool::ToolMetadata;
use serde::{Deserialize, Serialize};

/// Tunable weighting between the scoring components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectorWeights {
    pub lexical: f32,
    pub topical: f32,
    pub metadata: f32,
    /// Score of a tool with no matching signal.
    pub baseline: f32,
}

impl Default for SelectorWeights {
    fn default() -> Self {
        Self::from(&WeightsConfig::default())
    }
}

impl From<&WeightsConfig> for SelectorWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            lexical: config.lexical.max(0.0),
            topical: config.topical.max(0.0),
            metadata: config.metadata.max(0.0),
            baseline: config.baseline.clamp(0.0, 0.99),
        }
    }
}

/// The score of one tool for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolScore {
    pub tool_name: String,
    pub final_score: f32,
    pub lexical: f32,
    pub topical: f32,
    pub metadata: f32,
}

/// Topic vocabulary keyed by tool-name word.
const TOPIC_LEXICON: &[(&str, &[&str])] = &[
    ("web", &["web", "online", "internet", "website", "browse", "url", "site"]),
    (
        "search",
        &["search", "find", "lookup", "information", "latest", "news", "online", "google"],
    ),
    ("database", &["database", "db", "sql", "table", "record", "row", "column", "data"]),
    ("db", &["database", "db", "sql", "table", "record", "row"]),
    ("query", &["query", "select", "filter", "count", "records"]),
    ("sql", &["sql", "select", "table", "join", "database"]),
    ("file", &["file", "document", "pdf", "csv", "upload", "attachment", "folder"]),
    ("analysis", &["analyze", "analysis", "parse", "summarize", "inspect", "content"]),
    ("knowledge", &["knowledge", "fact", "explain", "definition", "documentation", "concept"]),
    ("kb", &["knowledge", "fact", "documentation", "article"]),
    ("weather", &["weather", "forecast", "temperature", "rain", "sunny"]),
    ("calculator", &["calculate", "math", "sum", "multiply", "divide", "compute"]),
];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "for", "from", "how", "i", "in",
    "is", "it", "me", "my", "of", "on", "or", "please", "some", "the", "this", "to", "with", "you",
];

/// How many matching query words count as a full-strength signal.
const SATURATION: usize = 3;

/// Scores tools against queries.
#[derive(Debug, Clone, Default)]
pub struct ToolSelector {
    weights: SelectorWeights,
    tool_metadata: HashMap<String, ToolMetadata>,
}

impl ToolSelector {
    pub fn new(weights: SelectorWeights) -> Self {
        Self {
            weights,
            tool_metadata: HashMap::new(),
        }
    }

    pub fn weights(&self) -> SelectorWeights {
        self.weights
    }

    /// Record capability metadata for a tool. Empty metadata is ignored.
    pub fn register_metadata(&mut self, tool_name: impl Into<String>, metadata: ToolMetadata) {
        if !metadata.is_empty() {
            self.tool_metadata.insert(tool_name.into(), metadata);
        }
    }

    pub fn metadata(&self, tool_name: &str) -> Option<&ToolMetadata> {
        self.tool_metadata.get(tool_name)
    }

    /// Score every tool, in input order.
    pub fn score_tools<S: AsRef<str>>(&self, query: &str, available_tools: &[S]) -> Vec<ToolScore> {
        let query_terms = terms(query);
        available_tools
            .iter()
            .map(|name| self.score_one(&query_terms, name.as_ref()))
            .collect()
    }

    /// Score every tool, best first. Ties are broken by tool name.
    pub fn rank<S: AsRef<str>>(&self, query: &str, available_tools: &[S]) -> Vec<ToolScore> {
        let mut scores = self.score_tools(query, available_tools);
        scores.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.tool_name.cmp(&b.tool_name))
        });
        scores
    }

    fn score_one(&self, query_terms: &HashSet<String>, tool_name: &str) -> ToolScore {
        let name_terms: HashSet<String> = name_words(tool_name).map(stem).collect();

        let lexical = if name_terms.is_empty() {
            0.0
        } else {
            let hits = name_terms.iter().filter(|t| query_terms.contains(*t)).count();
            hits as f32 / name_terms.len() as f32
        };

        let topic_vocab: HashSet<String> = name_words(tool_name)
            .filter_map(|word| {
                TOPIC_LEXICON
                    .iter()
                    .find(|(key, _)| *key == word)
                    .map(|(_, vocab)| *vocab)
            })
            .flatten()
            .map(|w| stem(w.to_string()))
            .collect();
        let topical = overlap(query_terms, &topic_vocab);

        let meta_vocab: Option<HashSet<String>> = self.tool_metadata.get(tool_name).map(|m| {
            let mut vocab = terms(&m.description);
            vocab.extend(m.keywords.iter().flat_map(|k| terms(k)));
            vocab
        });
        let metadata = meta_vocab
            .as_ref()
            .map_or(0.0, |vocab| overlap(query_terms, vocab));

        let mut weighted = self.weights.lexical * lexical;
        let mut total_weight = self.weights.lexical;
        if !topic_vocab.is_empty() {
            weighted += self.weights.topical * topical;
            total_weight += self.weights.topical;
        }
        if meta_vocab.is_some() {
            weighted += self.weights.metadata * metadata;
            total_weight += self.weights.metadata;
        }
        let combined = if total_weight > 0.0 {
            (weighted / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let baseline = self.weights.baseline;
        ToolScore {
            tool_name: tool_name.to_string(),
            final_score: (baseline + (1.0 - baseline) * combined).clamp(0.0, 1.0),
            lexical,
            topical,
            metadata,
        }
    }
}

/// Share of query terms found in `vocab`, saturating at [`SATURATION`] hits.
fn overlap(query_terms: &HashSet<String>, vocab: &HashSet<String>) -> f32 {
    if query_terms.is_empty() || vocab.is_empty() {
        return 0.0;
    }
    let hits = query_terms.iter().filter(|t| vocab.contains(*t)).count();
    let denom = query_terms.len().min(SATURATION);
    (hits as f32 / denom as f32).min(1.0)
}

fn name_words(tool_name: &str) -> impl Iterator<Item = String> + '_ {
    tool_name
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Lowercased, stemmed, stopword-free words of a text.
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(&w.as_str()))
        .map(stem)
        .collect()
}

/// Light suffix stripping so "searching"/"searches"/"search" meet.
fn stem(word: String) -> String {
    let n = word.len();
    if n > 5 && word.ends_with("ing") {
        return word[..n - 3].to_string();
    }
    if n > 4 && (word.ends_with("ches") || word.ends_with("shes") || word.ends_with("xes")) {
        return word[..n - 2].to_string();
    }
    if n > 3 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..n - 1].to_string();
    }
    word
}
