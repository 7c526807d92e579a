//! 基线规则引擎
//!
//! 按优先级评估规则集中的每条规则，对命中规则执行动作，生成基线文档。
//!
//! 规则按优先级从高到低迭代（同优先级保持原始顺序），动作写入同一个基线属性表，
//! 因此多条命中规则写同一目标时，最后执行的规则（优先级最低者）决定最终取值。

use std::sync::Arc;

use baseline_shared::config::{EngineConfig, OutputFormat};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::evaluator::ConditionEvaluator;
use crate::models::{
    Action, ActionKind, BaselineDocument, BuildingSpec, Condition, ConditionGroup,
    EvaluationLogEntry, EvaluationStatus, MatchedRule, Rule, RuleNode, RuleSchema,
    ValidationReport,
};
use crate::operators::LogicalOperator;

/// `generate_baseline` 的输出
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineOutput {
    /// 结构化文档，由调用方自行序列化
    Document(BaselineDocument),
    /// 已渲染为 YAML 文本
    Text(String),
}

/// 单条规则的评估追踪
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTrace {
    pub rule_id: String,
    pub matched: bool,
    pub trace: Vec<String>,
}

/// 基线规则引擎
///
/// 只读持有外部规则集；每次评估都新建基线属性表，调用之间不共享状态。
#[derive(Debug, Clone, Default)]
pub struct BaselineEngine {
    schema: Option<Arc<RuleSchema>>,
    /// 是否记录详细评估追踪
    trace_enabled: bool,
    output_format: OutputFormat,
}

impl BaselineEngine {
    /// 创建引擎；未提供规则集时按空规则集处理
    pub fn new(schema: Option<Arc<RuleSchema>>) -> Self {
        Self {
            schema,
            ..Default::default()
        }
    }

    pub fn with_schema(schema: impl Into<Arc<RuleSchema>>) -> Self {
        Self::new(Some(schema.into()))
    }

    pub fn with_config(schema: Option<Arc<RuleSchema>>, config: &EngineConfig) -> Self {
        Self {
            schema,
            trace_enabled: config.trace_enabled,
            output_format: config.output_format,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 替换当前规则集
    pub fn load_rules(&mut self, schema: impl Into<Arc<RuleSchema>>) {
        let schema = schema.into();
        info!(version = %schema.version, rules = schema.len(), "规则集已加载");
        self.schema = Some(schema);
    }

    pub fn schema(&self) -> Option<&RuleSchema> {
        self.schema.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        self.schema
            .as_deref()
            .map(|schema| schema.rules.as_slice())
            .unwrap_or_default()
    }

    pub fn rule_count(&self) -> usize {
        self.rules().len()
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// 按优先级降序排列的规则，同优先级保持原始顺序
    pub fn rules_by_priority(&self) -> Vec<&Rule> {
        let mut sorted: Vec<&Rule> = self.rules().iter().collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        sorted
    }

    /// 评估建筑规格并生成基线文档
    #[instrument(skip(self, spec), fields(rules = self.rule_count()))]
    pub fn evaluate(&self, spec: &BuildingSpec) -> BaselineDocument {
        let mut baseline = BaselineDocument::new(spec.clone());

        for rule in self.rules_by_priority() {
            let matched = if self.trace_enabled {
                let explained = self.explain(rule, spec);
                debug!(rule_id = %rule.id, trace = ?explained.trace, "规则评估追踪");
                explained.matched
            } else {
                self.evaluate_rule(rule, spec)
            };

            if matched {
                baseline.matched_rules.push(MatchedRule {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    category: rule.category.clone(),
                });

                Self::apply_actions(&rule.actions, &mut baseline.baseline_properties);

                baseline.evaluation_log.push(EvaluationLogEntry {
                    rule_id: rule.id.clone(),
                    status: EvaluationStatus::Matched,
                    message: format!("Rule '{}' matched and applied", rule.name),
                });
            } else {
                baseline.evaluation_log.push(EvaluationLogEntry {
                    rule_id: rule.id.clone(),
                    status: EvaluationStatus::NotMatched,
                    message: format!("Rule '{}' conditions not met", rule.name),
                });
            }

            debug!(rule_id = %rule.id, priority = rule.priority, matched, "规则已评估");
        }

        info!(
            matched = baseline.matched_rules.len(),
            total = baseline.evaluation_log.len(),
            "基线评估完成"
        );

        baseline
    }

    /// 判断规则条件树是否与建筑规格匹配
    pub fn evaluate_rule(&self, rule: &Rule, spec: &BuildingSpec) -> bool {
        Self::evaluate_node(&rule.conditions, spec)
    }

    /// 递归评估规则节点
    pub fn evaluate_node(node: &RuleNode, spec: &BuildingSpec) -> bool {
        Self::evaluate_node_traced(node, spec, None, "root")
    }

    /// 评估单个条件；字段缺失时返回 false
    pub fn evaluate_condition(condition: &Condition, spec: &BuildingSpec) -> bool {
        ConditionEvaluator::evaluate(
            spec.get_field(&condition.field),
            condition.operator,
            &condition.value,
        )
    }

    /// 评估逻辑组：AND 全部成立（空组为真），OR 任一成立（空组为假），NOT 全部不成立
    pub fn evaluate_group(group: &ConditionGroup, spec: &BuildingSpec) -> bool {
        Self::evaluate_group_traced(group, spec, None, "root")
    }

    /// 评估规则并记录每个节点的判定过程
    pub fn explain(&self, rule: &Rule, spec: &BuildingSpec) -> RuleTrace {
        let mut trace = Vec::new();
        let matched = Self::evaluate_node_traced(&rule.conditions, spec, Some(&mut trace), "root");
        RuleTrace {
            rule_id: rule.id.clone(),
            matched,
            trace,
        }
    }

    fn evaluate_node_traced(
        node: &RuleNode,
        spec: &BuildingSpec,
        trace: Option<&mut Vec<String>>,
        path: &str,
    ) -> bool {
        match node {
            RuleNode::Condition(cond) => {
                let matched = Self::evaluate_condition(cond, spec);
                if let Some(trace) = trace {
                    trace.push(format!(
                        "{}: {} {} {} => {}",
                        path,
                        cond.field,
                        cond.operator,
                        cond.value,
                        if matched { "MATCHED" } else { "NOT_MATCHED" }
                    ));
                }
                matched
            }
            RuleNode::Group(group) => Self::evaluate_group_traced(group, spec, trace, path),
        }
    }

    fn evaluate_group_traced(
        group: &ConditionGroup,
        spec: &BuildingSpec,
        mut trace: Option<&mut Vec<String>>,
        path: &str,
    ) -> bool {
        if let Some(trace) = trace.as_deref_mut() {
            trace.push(format!(
                "{}: 开始评估 {} 组 (共 {} 个子节点)",
                path,
                group.operator,
                group.conditions.len()
            ));
        }

        // AND 遇到 false 即停止，OR/NOT 遇到 true 即停止
        let stop_on = !matches!(group.operator, LogicalOperator::And);
        let mut short_circuited = false;

        for (i, child) in group.conditions.iter().enumerate() {
            let child_path = format!("{}.conditions[{}]", path, i);
            let child_matched =
                Self::evaluate_node_traced(child, spec, trace.as_deref_mut(), &child_path);

            if child_matched == stop_on {
                if let Some(trace) = trace.as_deref_mut() {
                    trace.push(format!("{}: {} 短路 - 子节点 {}", path, group.operator, i));
                }
                short_circuited = true;
                break;
            }
        }

        match group.operator {
            LogicalOperator::And => !short_circuited,
            LogicalOperator::Or => short_circuited,
            LogicalOperator::Not => !short_circuited,
        }
    }

    /// 将动作写入基线属性表（覆盖已有值）
    pub fn apply_actions(actions: &[Action], baseline_properties: &mut Map<String, Value>) {
        for action in actions {
            let value = match &action.action_type {
                ActionKind::SetValue | ActionKind::Evaluate => action.value.clone(),
                ActionKind::ApplyMethod => json!({
                    "method": action.value,
                    "parameters": action.parameters,
                }),
                ActionKind::ReferenceTable => json!({
                    "table": action.value,
                    "parameters": action.parameters,
                }),
                ActionKind::Other(raw) => json!({
                    "action_type": raw,
                    "value": action.value,
                    "parameters": action.parameters,
                }),
            };

            baseline_properties.insert(action.target.clone(), value);
        }
    }

    /// 生成基线，按请求的格式返回
    pub fn generate_baseline(&self, spec: &BuildingSpec, format: OutputFormat) -> Result<BaselineOutput> {
        let baseline = self.evaluate(spec);

        match format {
            OutputFormat::Json => Ok(BaselineOutput::Document(baseline)),
            OutputFormat::Yaml => Ok(BaselineOutput::Text(baseline.to_yaml()?)),
        }
    }

    /// 按引擎配置的默认格式生成基线
    pub fn generate_default_baseline(&self, spec: &BuildingSpec) -> Result<BaselineOutput> {
        self.generate_baseline(spec, self.output_format)
    }

    /// 返回条件匹配的规则（原始顺序），不执行动作
    pub fn get_applicable_rules(&self, spec: &BuildingSpec) -> Vec<&Rule> {
        self.rules()
            .iter()
            .filter(|rule| self.evaluate_rule(rule, spec))
            .collect()
    }

    /// 检查建筑规格是否包含规则引用的全部字段；只产生警告，不会判为无效
    pub fn validate_building_spec(&self, spec: &BuildingSpec) -> ValidationReport {
        let mut report = ValidationReport {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        let Some(schema) = self.schema() else {
            return report;
        };

        for field in schema.referenced_fields() {
            if !spec.contains_field(&field) {
                warn!(field = %field, "建筑规格缺少规则引用的字段");
                report.warnings.push(format!("Missing field: {}", field));
            }
        }

        report
    }
}
