use serde::Serialize;

use crate::router::dictionary::KeywordCategory;

const BASE_TOKENS: f64 = 100.0;
const TOKENS_PER_UNIT: f64 = 5.0;
const TOKENS_PER_MATCH: f64 = 20.0;
const TOKENS_PER_COMPLEXITY: f64 = 500.0;

const ANALYSIS_INDICATORS: [&str; 3] = ["分析", "报告", "建议"];
const COMPARISON_INDICATORS: [&str; 3] = ["比较", "对比", "趋势"];
const REASONING_INDICATORS: [&str; 3] = ["为什么", "如何", "怎么"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordMatch {
    pub group: &'static str,
    pub keyword: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityAnalysis {
    pub actions: Vec<KeywordMatch>,
    pub entities: Vec<KeywordMatch>,
    pub modifiers: Vec<KeywordMatch>,
    pub complexity: f64,
    pub estimated_tokens: u32,
}

impl ComplexityAnalysis {
    pub fn matched(&self) -> usize {
        self.actions.len() + self.entities.len() + self.modifiers.len()
    }
}

/// Text length in scoring units. CJK queries rarely contain spaces, so four
/// characters count as one unit when that exceeds the word count.
fn length_units(query: &str, words: usize) -> usize {
    words.max(query.chars().count() / 4)
}

/// First keyword group of `category` matched by each word, one per group per word.
fn match_category(words: &[&str], category: KeywordCategory) -> Vec<KeywordMatch> {
    let mut matches = Vec::new();
    for word in words {
        let hit = category.groups().iter().find_map(|(group, keywords)| {
            keywords
                .iter()
                .find(|k| word.contains(**k) || k.contains(*word))
                .map(|keyword| KeywordMatch {
                    group: *group,
                    keyword: *keyword,
                })
        });
        if let Some(hit) = hit {
            matches.push(hit);
        }
    }
    matches
}

pub fn analyze_complexity(query: &str) -> ComplexityAnalysis {
    let query = query.to_lowercase();
    let query = query.as_str();
    let words: Vec<&str> = query.split_whitespace().collect();
    let units = length_units(query, words.len());

    let actions = match_category(&words, KeywordCategory::Action);
    let entities = match_category(&words, KeywordCategory::Entity);
    let modifiers = match_category(&words, KeywordCategory::Modifier);

    let mut complexity = (units as f64 / 20.0).min(0.3);

    match actions.len() {
        0 => complexity += 0.3,
        1 => {}
        _ => complexity += 0.2,
    }
    match entities.len() {
        0 => complexity += 0.2,
        1 | 2 => {}
        _ => complexity += 0.2,
    }
    if modifiers.len() > 2 {
        complexity += 0.1;
    }

    let contains_any = |indicators: &[&str]| indicators.iter().any(|i| query.contains(i));
    if contains_any(&ANALYSIS_INDICATORS) {
        complexity += 0.4;
    }
    if contains_any(&COMPARISON_INDICATORS) {
        complexity += 0.3;
    }
    if contains_any(&REASONING_INDICATORS) {
        complexity += 0.2;
    }

    // Tokens scale with the raw score; only the reported complexity is capped.
    let matched = actions.len() + entities.len() + modifiers.len();
    let estimated_tokens = (BASE_TOKENS
        + TOKENS_PER_UNIT * units as f64
        + TOKENS_PER_MATCH * matched as f64
        + TOKENS_PER_COMPLEXITY * complexity)
        .round() as u32;
    let complexity = complexity.min(1.0);

    ComplexityAnalysis {
        actions,
        entities,
        modifiers,
        complexity,
        estimated_tokens,
    }
}
