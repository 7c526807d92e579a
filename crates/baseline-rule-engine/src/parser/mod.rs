//! 自然语言规则解析器
//!
//! 基于有序模式表从规则文本中提取字段、操作符、取值、单位和动作，不依赖任何标准原文。
//!
//! 解析流程：
//! 1. 按分隔词（then / set / apply / use）把文本拆成条件段和动作段
//! 2. 条件段含 and/or 时生成逻辑组，否则生成单个条件
//! 3. 动作段提取目标属性和取值；没有动作段时使用默认的合规检查动作

pub mod patterns;

use baseline_shared::config::ParserConfig;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{Result, RuleError};
use crate::models::{Action, ActionKind, Condition, ConditionGroup, Rule, RuleNode, RuleSchema};
use crate::operators::{ComparisonOperator, LogicalOperator};

use patterns::{
    ACTION_SEPARATORS, AND_REGEX, METHOD_REGEX, NUMBER_REGEX, OPERATOR_PATTERNS, OR_REGEX,
    PROPERTY_PATTERNS, QUOTED_REGEX, TABLE_REGEX, UNIT_PATTERNS, VALUE_KEYWORDS, ZONE_REGEX,
};

/// 未识别字段/目标时使用的占位名
const DEFAULT_PROPERTY: &str = "property";

/// 规则名称最多取的单词数
const NAME_WORD_LIMIT: usize = 6;

/// 规则文本解析器
///
/// 自动生成的规则 ID 在单个解析器实例内递增（`rule_001`、`rule_002`...），
/// 同一实例不要在多个线程间共享。
#[derive(Debug, Clone)]
pub struct RuleParser {
    rule_counter: u32,
    default_category: String,
}

impl RuleParser {
    pub fn new() -> Self {
        Self {
            rule_counter: 0,
            default_category: ParserConfig::default().default_category,
        }
    }

    pub fn with_config(config: &ParserConfig) -> Self {
        Self {
            rule_counter: 0,
            default_category: config.default_category.clone(),
        }
    }

    /// 从指定计数继续编号，下一条自动 ID 为 `start + 1`
    pub fn with_counter(mut self, start: u32) -> Self {
        self.rule_counter = start;
        self
    }

    pub fn rule_counter(&self) -> u32 {
        self.rule_counter
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// 将单条规则文本解析为 Rule
    ///
    /// 未提供 `rule_id` 时自动生成。
    ///
    /// 与"任意文本都产出一条规则"的约定不同：文本为空或不含任何字母数字（如 `-----`）
    /// 时返回 `ParseMiss`，计数器不递增，不会生成字段全部为占位值的空规则。
    /// 批量解析依赖这一点跳过分隔线。
    pub fn parse_rule_text(
        &mut self,
        text: &str,
        rule_id: Option<&str>,
        category: &str,
    ) -> Result<Rule> {
        let description = text.trim();
        if !description.chars().any(char::is_alphanumeric) {
            return Err(RuleError::ParseMiss(format!(
                "规则文本不包含可识别的内容: '{}'",
                description
            )));
        }

        let id = match rule_id {
            Some(id) => id.to_string(),
            None => self.next_rule_id(),
        };

        let (condition_text, action_text) = split_segments(description);
        let conditions = extract_conditions(condition_text);
        let actions = match action_text {
            Some(action_text) => vec![extract_action(action_text)],
            None => vec![Action::compliance_check()],
        };

        Ok(Rule {
            id,
            name: generate_rule_name(description),
            description: description.to_string(),
            category: category.to_string(),
            conditions,
            actions,
            priority: 0,
            metadata: Map::new(),
        })
    }

    /// 按解析器默认分类解析单条规则
    pub fn parse(&mut self, text: &str) -> Result<Rule> {
        let category = self.default_category.clone();
        self.parse_rule_text(text, None, &category)
    }

    /// 解析多条规则（每段或每行一条）
    ///
    /// 先按空行分段；只有一段时改为按行拆分。以 `#` 开头的行为注释。
    /// 无法解析的条目被跳过，不影响其余条目。
    pub fn parse_rules_from_text(&mut self, text: &str, category: &str) -> Vec<Rule> {
        let trimmed = text.trim();
        let mut chunks: Vec<&str> = trimmed.split("\n\n").collect();
        if chunks.len() == 1 {
            chunks = trimmed.split('\n').collect();
        }

        let mut rules = Vec::new();
        for chunk in chunks {
            let body = chunk
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .collect::<Vec<_>>()
                .join("\n");

            if body.is_empty() {
                continue;
            }

            match self.parse_rule_text(&body, None, category) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    debug!(error = %e, text = %body, "跳过无法解析的规则文本");
                }
            }
        }

        rules
    }

    /// 解析多条规则并组装成规则集
    pub fn parse_schema(&mut self, text: &str, category: &str) -> RuleSchema {
        let rules = self.parse_rules_from_text(text, category);
        RuleSchema::new("1.0", rules).with_metadata("source", "text")
    }

    fn next_rule_id(&mut self) -> String {
        self.rule_counter += 1;
        format!("rule_{:03}", self.rule_counter)
    }
}

impl Default for RuleParser {
    fn default() -> Self {
        Self::new()
    }
}

/// 按第一个出现的分隔词拆分条件段和动作段
///
/// 分隔词按 `ACTION_SEPARATORS` 顺序尝试，在其首次出现处拆分。
fn split_segments(text: &str) -> (&str, Option<&str>) {
    // ASCII 小写不改变字节偏移，可直接回切原文
    let lower = text.to_ascii_lowercase();

    for separator in ACTION_SEPARATORS {
        if let Some(pos) = lower.find(separator) {
            return (&text[..pos], Some(&text[pos + separator.len()..]));
        }
    }

    (text, None)
}

fn extract_conditions(text: &str) -> RuleNode {
    if AND_REGEX.is_match(text) || OR_REGEX.is_match(text) {
        RuleNode::Group(parse_condition_group(text))
    } else {
        RuleNode::Condition(parse_single_condition(text))
    }
}

/// 解析逻辑组
///
/// 出现 " or " 时整段按 OR 拆分，否则按 AND 拆分；不会生成混合嵌套。
fn parse_condition_group(text: &str) -> ConditionGroup {
    let lower = text.to_ascii_lowercase();
    let (operator, separator) = if lower.contains(" or ") {
        (LogicalOperator::Or, " or ")
    } else {
        (LogicalOperator::And, " and ")
    };

    let mut conditions = Vec::new();
    let mut start = 0;
    for (pos, _) in lower.match_indices(separator) {
        conditions.push(RuleNode::Condition(parse_single_condition(&text[start..pos])));
        start = pos + separator.len();
    }
    conditions.push(RuleNode::Condition(parse_single_condition(&text[start..])));

    ConditionGroup::new(operator, conditions)
}

fn parse_single_condition(text: &str) -> Condition {
    let field = PROPERTY_PATTERNS
        .first_match(text)
        .unwrap_or(DEFAULT_PROPERTY);

    let operator = OPERATOR_PATTERNS
        .first_match(text)
        .unwrap_or(ComparisonOperator::Equals);

    Condition {
        field: field.to_string(),
        operator,
        value: extract_condition_value(text),
        unit: UNIT_PATTERNS.first_match(text).map(str::to_string),
    }
}

/// 取值优先级：数值 > 引号内文本 > 关键词 > "zone <编号>" > 空字符串
fn extract_condition_value(text: &str) -> Value {
    if let Some(number) = extract_number(text) {
        return number;
    }

    if let Some(caps) = QUOTED_REGEX.captures(text) {
        return Value::String(caps[1].to_string());
    }

    let lower = text.to_lowercase();
    if let Some(keyword) = VALUE_KEYWORDS.iter().find(|kw| lower.contains(*kw)) {
        return Value::String(keyword.to_string());
    }

    if let Some(caps) = ZONE_REGEX.captures(&lower) {
        return Value::String(caps[1].to_string());
    }

    Value::String(String::new())
}

fn extract_action(text: &str) -> Action {
    let lower = text.to_lowercase();
    let target = PROPERTY_PATTERNS
        .first_match(&lower)
        .unwrap_or(DEFAULT_PROPERTY);

    if let Some(number) = extract_number(&lower) {
        return Action::set_value(target, number);
    }

    if lower.contains("method") || lower.contains("procedure") {
        let value = METHOD_REGEX
            .captures(&lower)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();
        return Action::new(ActionKind::ApplyMethod, target, value);
    }

    if lower.contains("table") {
        let value = TABLE_REGEX
            .captures(&lower)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();
        return Action::new(ActionKind::ReferenceTable, target, value);
    }

    Action::set_value(target, "")
}

/// 提取第一个整数或小数；含小数点时为浮点数，否则为整数
fn extract_number(text: &str) -> Option<Value> {
    let literal = NUMBER_REGEX.captures(text)?.get(1)?.as_str();

    if !literal.contains('.') {
        if let Ok(int) = literal.parse::<i64>() {
            return Some(Value::from(int));
        }
    }

    literal
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// 取前若干个单词作为规则名称，超出部分用 "..." 表示
fn generate_rule_name(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut name = words
        .iter()
        .take(NAME_WORD_LIMIT)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > NAME_WORD_LIMIT {
        name.push_str("...");
    }
    name
}
