pub mod complexity;
pub mod dictionary;
pub mod execute;

pub use complexity::*;
pub use dictionary::*;
pub use execute::*;

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

pub const COMPLEXITY_THRESHOLD: f64 = 0.5;
pub const COMPLEX_TIER_TOKENS: u32 = 2000;
const SMART_MATCH_TOKENS: u32 = 20;

/// Phrases asking for a rendered table or chart; these always go past the phrase table.
const UI_RENDER_PHRASES: [&str; 9] = [
    "用表格", "用图表", "用柱状图", "用折线图", "用饼图", "用卡片", "表格显示", "图表显示", "卡片显示",
];
const QUERY_VERBS: [&str; 5] = ["查询", "查看", "获取", "统计", "分析"];
const DATA_ENTITIES: [&str; 8] = ["班级", "学生", "教师", "家长", "活动", "招生", "考勤", "费用"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Direct,
    Semantic,
    Complex,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Direct => "direct",
            Tier::Semantic => "semantic",
            Tier::Complex => "complex",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountTarget {
    Students,
    Teachers,
    Parents,
    Classes,
    Users,
}

impl CountTarget {
    pub fn table(&self) -> &'static str {
        match self {
            CountTarget::Students => "students",
            CountTarget::Teachers => "teachers",
            CountTarget::Parents => "parents",
            CountTarget::Classes => "classes",
            CountTarget::Users => "users",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleAction {
    CountRows(CountTarget),
    ExecuteSql(String),
    Tool(String),
}

impl RuleAction {
    pub fn name(&self) -> String {
        match self {
            RuleAction::CountRows(target) => format!("count_{}", target.table()),
            RuleAction::ExecuteSql(_) => "execute_sql_query".to_string(),
            RuleAction::Tool(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectRule {
    /// Lower-cased, trimmed trigger phrase.
    pub phrase: String,
    pub response: String,
    pub action: RuleAction,
    pub tokens: u32,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Substring,
    Smart,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteDecision {
    pub query: String,
    pub tier: Tier,
    pub match_kind: Option<MatchKind>,
    pub rule: Option<DirectRule>,
    pub analysis: Option<ComplexityAnalysis>,
    pub estimated_tokens: u32,
    pub confidence: f64,
}

impl RouteDecision {
    pub fn action(&self) -> Option<&RuleAction> {
        self.rule.as_ref().map(|r| &r.action)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterStats {
    pub direct_match_count: usize,
    pub keyword_count: usize,
    pub complexity_threshold: f64,
}

/// Three-tier query router: phrase table, keyword complexity scoring, then
/// the full model for anything left over.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    rules: Vec<DirectRule>,
    threshold: f64,
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryRouter {
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
            threshold: COMPLEXITY_THRESHOLD,
        }
    }

    /// Built-in phrases plus whatever the dictionary directory provides.
    pub fn with_dictionary(dir: &Path) -> Self {
        let mut router = Self::new();
        router.add_rules(load_dictionary_rules(dir));
        info!(
            rules = router.rules.len(),
            "Query router loaded dictionary {}",
            dir.display()
        );
        router
    }

    /// Adds rules in order; a rule for an existing phrase replaces it in place.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = DirectRule>) {
        for rule in rules {
            match self.rules.iter_mut().find(|r| r.phrase == rule.phrase) {
                Some(existing) => *existing = rule,
                None => self.rules.push(rule),
            }
        }
    }

    pub fn rules(&self) -> &[DirectRule] {
        &self.rules
    }

    pub fn route(&self, query: &str) -> RouteDecision {
        let normalized = query.trim().to_lowercase();

        if let Some((kind, rule)) = self.direct_match(&normalized) {
            debug!(phrase = %rule.phrase, ?kind, "Direct match");
            return RouteDecision {
                query: query.to_string(),
                tier: Tier::Direct,
                match_kind: Some(kind),
                estimated_tokens: rule.tokens,
                rule: Some(rule),
                analysis: None,
                confidence: 1.0,
            };
        }

        let analysis = analyze_complexity(&normalized);
        let (tier, estimated_tokens, confidence) = if analysis.complexity < self.threshold {
            (Tier::Semantic, analysis.estimated_tokens, 1.0 - analysis.complexity)
        } else {
            (Tier::Complex, COMPLEX_TIER_TOKENS, analysis.complexity)
        };
        debug!(complexity = analysis.complexity, tier = tier.as_str(), "Scored query");

        RouteDecision {
            query: query.to_string(),
            tier,
            match_kind: None,
            rule: None,
            analysis: Some(analysis),
            estimated_tokens,
            confidence,
        }
    }

    /// Phrase lookup on an already normalized query.
    pub fn direct_match(&self, normalized: &str) -> Option<(MatchKind, DirectRule)> {
        if contains_any(normalized, &UI_RENDER_PHRASES) {
            return None;
        }
        if contains_any(normalized, &QUERY_VERBS) && contains_any(normalized, &DATA_ENTITIES) {
            return None;
        }

        if let Some(rule) = self.rules.iter().find(|r| r.phrase == normalized) {
            return Some((MatchKind::Exact, rule.clone()));
        }

        // A one-character query would otherwise match every phrase containing it.
        let reverse_allowed = normalized.chars().count() >= 2;
        if let Some(rule) = self.rules.iter().find(|r| {
            normalized.contains(r.phrase.as_str())
                || (reverse_allowed && r.phrase.contains(normalized))
        }) {
            return Some((MatchKind::Substring, rule.clone()));
        }

        smart_match(normalized).map(|rule| (MatchKind::Smart, rule))
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            direct_match_count: self.rules.len(),
            keyword_count: keyword_count(),
            complexity_threshold: self.threshold,
        }
    }
}

fn contains_any(query: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| query.contains(n))
}

/// Domain keyword pairs that identify common statistics questions.
fn smart_match(query: &str) -> Option<DirectRule> {
    const STATS_WORDS: [&str; 7] = ["查询", "查看", "统计", "数据", "情况", "人数", "多少"];

    let (response, action) = if query.contains("招生") && contains_any(query, &STATS_WORDS) {
        ("Summarising enrollment...", "get_enrollment_stats")
    } else if query.contains("学生")
        && (contains_any(query, &STATS_WORDS) || query.contains("总数"))
    {
        ("Summarising students...", "get_student_stats")
    } else if query.contains("活动")
        && contains_any(query, &["查询", "查看", "统计", "数据", "情况", "列表"])
    {
        ("Summarising activities...", "get_activity_stats")
    } else {
        return None;
    };

    Some(DirectRule {
        phrase: query.to_string(),
        response: response.to_string(),
        action: RuleAction::Tool(action.to_string()),
        tokens: SMART_MATCH_TOKENS,
        source: "smart".to_string(),
    })
}
