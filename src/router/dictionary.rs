use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::AppError;
use crate::router::{CountTarget, DirectRule, RuleAction};

/// Dictionary files that contribute phrase rules, in load order.
pub const DIRECT_MATCH_FILES: [&str; 2] = ["01-basic-queries.json", "02-activity-attendance.json"];
pub const QUERY_TEMPLATE_FILE: &str = "05-query-templates.json";

const DEFAULT_TEMPLATE_TOKENS: u32 = 20;
const DEFAULT_TEMPLATE_ACTION: &str = "execute_sql_query";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCategory {
    Action,
    Entity,
    Modifier,
}

pub type KeywordGroup = (&'static str, &'static [&'static str]);

pub const ACTION_KEYWORDS: &[KeywordGroup] = &[
    ("create", &["添加", "新增", "创建", "新建", "录入", "注册", "create", "add"]),
    ("read", &["查询", "查看", "显示", "列表", "查找", "搜索", "获取", "show", "list", "find"]),
    ("update", &["修改", "更新", "编辑", "变更", "调整", "update", "edit"]),
    ("delete", &["删除", "移除", "清除", "取消", "delete", "remove"]),
    ("count", &["统计", "总数", "数量", "多少", "计算", "汇总", "count", "total", "how many"]),
    ("analyze", &["分析", "评估", "报告", "趋势", "预测", "analyze", "report", "trend"]),
    ("navigate", &["跳转", "打开", "进入", "访问", "导航", "open", "goto"]),
];

pub const ENTITY_KEYWORDS: &[KeywordGroup] = &[
    ("student", &["学生", "小朋友", "孩子", "幼儿", "儿童", "student", "child"]),
    ("teacher", &["教师", "老师", "班主任", "教职工", "员工", "teacher", "staff"]),
    ("class", &["班级", "班", "年级", "小班", "中班", "大班", "class", "grade"]),
    ("activity", &["活动", "课程", "游戏", "项目", "课堂", "activity", "course"]),
    ("parent", &["家长", "父母", "监护人", "parent", "guardian"]),
    ("attendance", &["考勤", "出勤", "签到", "到校", "attendance"]),
    ("fee", &["费用", "学费", "收费", "缴费", "账单", "fee", "tuition"]),
    ("schedule", &["课表", "时间表", "安排", "计划", "schedule", "plan"]),
    ("health", &["健康", "体检", "疫苗", "身高", "体重", "health"]),
    ("enrollment", &["招生", "报名", "入学", "注册", "enrollment", "admission"]),
];

pub const MODIFIER_KEYWORDS: &[KeywordGroup] = &[
    ("time", &["今天", "昨天", "明天", "本周", "本月", "今年", "today", "yesterday", "week", "month"]),
    ("status", &["已完成", "进行中", "未开始", "已取消", "completed", "pending"]),
    ("age", &["3岁", "4岁", "5岁", "6岁"]),
    ("gender", &["男", "女", "男孩", "女孩", "boy", "girl"]),
];

impl KeywordCategory {
    pub const ALL: [KeywordCategory; 3] = [
        KeywordCategory::Action,
        KeywordCategory::Entity,
        KeywordCategory::Modifier,
    ];

    pub fn groups(&self) -> &'static [KeywordGroup] {
        match self {
            KeywordCategory::Action => ACTION_KEYWORDS,
            KeywordCategory::Entity => ENTITY_KEYWORDS,
            KeywordCategory::Modifier => MODIFIER_KEYWORDS,
        }
    }
}

pub fn keyword_count() -> usize {
    KeywordCategory::ALL
        .iter()
        .flat_map(|c| c.groups().iter())
        .map(|(_, words)| words.len())
        .sum()
}

/// (phrase, response, action, tokens)
const BUILTIN_PHRASES: &[(&str, &str, &str, u32)] = &[
    ("学生总数", "Counting students...", "count_students", 10),
    ("多少学生", "Counting students...", "count_students", 10),
    ("学生数量", "Counting students...", "count_students", 10),
    ("当前学生", "Counting students...", "count_students", 10),
    ("在校学生", "Counting students...", "count_students", 10),
    ("今天有多少学生", "Checking today's attendance...", "get_attendance_stats", 15),
    ("教师总数", "Counting teachers...", "count_teachers", 10),
    ("家长总数", "Counting parents...", "count_parents", 10),
    ("班级总数", "Counting classes...", "count_classes", 10),
    ("用户总数", "Counting users...", "count_users", 10),
    ("今日活动", "Listing today's activities...", "get_today_activities", 15),
    ("活动列表", "Listing activities...", "get_activity_list", 15),
    ("考勤统计", "Summarising attendance...", "get_attendance_stats", 20),
    ("招生统计", "Summarising enrollment...", "get_enrollment_stats", 20),
    ("待审核招生", "Listing pending applications...", "get_pending_enrollment_data", 15),
    ("任务统计", "Summarising tasks...", "get_task_stats", 20),
    ("费用统计", "Summarising fees...", "get_fee_stats", 20),
    ("策划一个活动", "Starting the activity creation workflow...", "create_activity_workflow", 50),
    ("创建活动", "Starting the activity creation workflow...", "create_activity_workflow", 50),
    ("新建活动", "Starting the activity creation workflow...", "create_activity_workflow", 50),
    ("活动策划", "Starting the activity creation workflow...", "create_activity_workflow", 50),
];

pub fn builtin_rules() -> Vec<DirectRule> {
    BUILTIN_PHRASES
        .iter()
        .map(|(phrase, response, action, tokens)| DirectRule {
            phrase: phrase.to_lowercase(),
            response: response.to_string(),
            action: RuleAction::from_name(action, None),
            tokens: *tokens,
            source: "builtin".to_string(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    response: Option<String>,
    action: Option<String>,
    tokens: Option<u32>,
    sql: Option<String>,
}

/// Parses a `{ phrase: { response, action, tokens, sql } }` object. Keys
/// starting with `//` are comments; malformed entries are skipped.
fn parse_rules(section: &Map<String, Value>, source: &str, default_tokens: u32) -> Vec<DirectRule> {
    section
        .iter()
        .filter(|(phrase, _)| !phrase.starts_with("//"))
        .filter_map(|(phrase, value)| {
            let entry: RuleEntry = match serde_json::from_value(value.clone()) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping entry {} in {}: {}", phrase, source, e);
                    return None;
                }
            };
            let action_name = entry.action.as_deref().unwrap_or(DEFAULT_TEMPLATE_ACTION);

            Some(DirectRule {
                phrase: phrase.trim().to_lowercase(),
                response: entry
                    .response
                    .unwrap_or_else(|| format!("Running {}...", action_name)),
                action: RuleAction::from_name(action_name, entry.sql),
                tokens: entry.tokens.unwrap_or(default_tokens),
                source: source.to_string(),
            })
        })
        .filter(|rule| !rule.phrase.is_empty())
        .collect()
}

fn read_section(path: &Path, key: &str) -> Result<Option<Map<String, Value>>, AppError> {
    if !path.is_file() {
        debug!("Dictionary file {} not present", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let mut document: Value = serde_json::from_str(&content)?;
    Ok(match document.get_mut(key).map(Value::take) {
        Some(Value::Object(section)) => Some(section),
        _ => None,
    })
}

/// Loads phrase rules and query templates from the dictionary directory.
/// Missing files contribute nothing; unreadable JSON is logged and skipped.
#[instrument]
pub fn load_dictionary_rules(dir: &Path) -> Vec<DirectRule> {
    let mut rules = Vec::new();

    let sources = DIRECT_MATCH_FILES
        .iter()
        .map(|f| (*f, "directMatches", DEFAULT_TEMPLATE_TOKENS))
        .chain([(QUERY_TEMPLATE_FILE, "queryTemplates", DEFAULT_TEMPLATE_TOKENS)]);

    for (file, key, default_tokens) in sources {
        match read_section(&dir.join(file), key) {
            Ok(Some(section)) => {
                let loaded = parse_rules(&section, file, default_tokens);
                info!("Loaded {} rules from {}", loaded.len(), file);
                rules.extend(loaded);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to load dictionary {}: {}", file, e),
        }
    }

    rules
}

impl RuleAction {
    /// Maps an action name (and optional SQL) from a rule entry to a typed action.
    pub fn from_name(action: &str, sql: Option<String>) -> Self {
        if let Some(sql) = sql.filter(|s| !s.trim().is_empty()) {
            return RuleAction::ExecuteSql(sql);
        }

        match action {
            "count_students" => RuleAction::CountRows(CountTarget::Students),
            "count_teachers" => RuleAction::CountRows(CountTarget::Teachers),
            "count_parents" => RuleAction::CountRows(CountTarget::Parents),
            "count_classes" => RuleAction::CountRows(CountTarget::Classes),
            "count_users" => RuleAction::CountRows(CountTarget::Users),
            other => RuleAction::Tool(other.to_string()),
        }
    }
}
