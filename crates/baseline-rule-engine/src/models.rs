//! 规则引擎领域模型
//!
//! 定义规则、条件树、动作及规则集，以及它们与通用 JSON 结构之间的转换。
//! 条件树没有类型标签：同时含有 `operator` 和 `conditions` 键的对象是条件组，
//! 否则按单个条件解析。

use crate::error::{Result, RuleError};
use crate::operators::{ComparisonOperator, LogicalOperator};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 规则/动作/规则集携带的附加信息
pub type Metadata = Map<String, Value>;

/// 条件节点（叶子谓词）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ComparisonOperator,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ComparisonOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<RuleNode>,
}

impl ConditionGroup {
    pub fn new(operator: LogicalOperator, conditions: Vec<RuleNode>) -> Self {
        Self {
            operator,
            conditions,
        }
    }

    pub fn and(conditions: Vec<RuleNode>) -> Self {
        Self::new(LogicalOperator::And, conditions)
    }

    pub fn or(conditions: Vec<RuleNode>) -> Self {
        Self::new(LogicalOperator::Or, conditions)
    }

    pub fn not(conditions: Vec<RuleNode>) -> Self {
        Self::new(LogicalOperator::Not, conditions)
    }
}

/// 规则节点（条件或逻辑组）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleNode {
    Condition(Condition),
    Group(ConditionGroup),
}

impl RuleNode {
    /// 从通用 JSON 结构还原条件树
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(RuleError::schema(format!(
                    "条件节点必须是对象，实际为: {}",
                    other
                )));
            }
        };

        if map.contains_key("operator") && map.contains_key("conditions") {
            let group: ConditionGroup = serde_json::from_value(Value::Object(map))
                .map_err(|e| RuleError::schema(format!("条件组无效: {}", e)))?;
            Ok(Self::Group(group))
        } else {
            let condition: Condition = serde_json::from_value(Value::Object(map))
                .map_err(|e| RuleError::schema(format!("条件无效: {}", e)))?;
            Ok(Self::Condition(condition))
        }
    }

    /// 按出现顺序收集条件树引用的全部字段（去重）
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut Vec<String>) {
        match self {
            Self::Condition(cond) => {
                if !fields.contains(&cond.field) {
                    fields.push(cond.field.clone());
                }
            }
            Self::Group(group) => {
                for child in &group.conditions {
                    child.collect_fields(fields);
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for RuleNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<Condition> for RuleNode {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}

impl From<ConditionGroup> for RuleNode {
    fn from(group: ConditionGroup) -> Self {
        Self::Group(group)
    }
}

/// 动作类型
///
/// 未识别的类型保留原始字符串，执行时按通用记录写入基线属性。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    SetValue,
    ApplyMethod,
    ReferenceTable,
    Evaluate,
    Other(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SetValue => "set_value",
            Self::ApplyMethod => "apply_method",
            Self::ReferenceTable => "reference_table",
            Self::Evaluate => "evaluate",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ActionKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "set_value" => Self::SetValue,
            "apply_method" => Self::ApplyMethod,
            "reference_table" => Self::ReferenceTable,
            "evaluate" => Self::Evaluate,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for ActionKind {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// 规则命中后对基线属性执行的动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: ActionKind,
    pub target: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Metadata,
}

impl Action {
    pub fn new(action_type: impl Into<ActionKind>, target: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            action_type: action_type.into(),
            target: target.into(),
            value: value.into(),
            parameters: Map::new(),
        }
    }

    pub fn set_value(target: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(ActionKind::SetValue, target, value)
    }

    /// 文本中没有可识别的动作时使用的默认合规检查动作
    pub fn compliance_check() -> Self {
        Self::new(ActionKind::Evaluate, "compliance", "check")
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// 规则定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub conditions: RuleNode,
    pub actions: Vec<Action>,
    /// 数值越大越先评估
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
}

impl Rule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, conditions: impl Into<RuleNode>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: "general".to_string(),
            conditions: conditions.into(),
            actions: Vec::new(),
            priority: 0,
            metadata: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// 规则集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSchema {
    pub version: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
}

impl RuleSchema {
    pub fn new(version: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            version: version.into(),
            rules,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 从通用 JSON 结构还原规则集，结构错误统一返回 `RuleError::Schema`
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| RuleError::schema(e.to_string()))
    }

    /// 从 JSON 字符串加载规则集
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == rule_id)
    }

    /// 所有规则条件树引用的字段并集，按首次出现顺序排列
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        for rule in &self.rules {
            rule.conditions.collect_fields(&mut fields);
        }
        fields
    }
}

/// 建筑规格 - 提供给规则引擎的输入属性
///
/// 字段按顶层键直接查找；值为 `null` 视为缺失。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingSpec {
    data: Map<String, Value>,
}

impl BuildingSpec {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            other => Err(RuleError::InvalidSpec(format!(
                "建筑规格必须是 JSON 对象，实际为: {}",
                other
            ))),
        }
    }

    /// 从 JSON 对象字符串创建
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn get_field(&self, field: &str) -> Option<&Value> {
        self.data.get(field).filter(|value| !value.is_null())
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(field.into(), value.into());
    }

    /// 获取底层数据
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

impl From<Map<String, Value>> for BuildingSpec {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

/// 评估状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Matched,
    NotMatched,
}

/// 命中规则摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub rule_id: String,
    pub rule_name: String,
    pub category: String,
}

/// 单条规则的评估日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationLogEntry {
    pub rule_id: String,
    pub status: EvaluationStatus,
    pub message: String,
}

/// 基线文档 - 一次评估的完整输出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineDocument {
    pub input: BuildingSpec,
    pub matched_rules: Vec<MatchedRule>,
    pub baseline_properties: Map<String, Value>,
    pub evaluation_log: Vec<EvaluationLogEntry>,
}

impl BaselineDocument {
    pub fn new(input: BuildingSpec) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// 建筑规格校验结果；只产生警告，`valid` 恒为 true
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema_json() -> Value {
        json!({
            "version": "1.0",
            "rules": [
                {
                    "id": "r001",
                    "name": "Small Office Building Baseline",
                    "description": "Baseline for small offices",
                    "category": "building_type",
                    "conditions": {
                        "operator": "and",
                        "conditions": [
                            {"field": "building_type", "operator": "equals", "value": "office"},
                            {
                                "operator": "or",
                                "conditions": [
                                    {"field": "building_area", "operator": "less_than", "value": 25000, "unit": "sqft"},
                                    {"field": "num_stories", "operator": "less_than_or_equal", "value": 3}
                                ]
                            }
                        ]
                    },
                    "actions": [
                        {
                            "action_type": "set_value",
                            "target": "lighting_power_density",
                            "value": 1.0,
                            "parameters": {"unit": "W/sqft"}
                        }
                    ],
                    "priority": 10
                }
            ],
            "metadata": {"description": "Test schema"}
        })
    }

    #[test]
    fn test_condition_to_value_omits_absent_unit() {
        let condition = Condition::new("climate_zone", ComparisonOperator::Equals, "5a");
        let value = serde_json::to_value(&condition).unwrap();
        assert_eq!(
            value,
            json!({"field": "climate_zone", "operator": "equals", "value": "5a"})
        );

        let with_unit = condition.with_unit("degF");
        assert_eq!(serde_json::to_value(&with_unit).unwrap()["unit"], json!("degF"));
    }

    #[test]
    fn test_schema_from_value_nested_tree() {
        let schema = RuleSchema::from_value(sample_schema_json()).unwrap();
        assert_eq!(schema.version, "1.0");
        assert_eq!(schema.len(), 1);

        let rule = &schema.rules[0];
        assert_eq!(rule.priority, 10);
        match &rule.conditions {
            RuleNode::Group(group) => {
                assert_eq!(group.operator, LogicalOperator::And);
                assert_eq!(group.conditions.len(), 2);
                assert!(matches!(group.conditions[1], RuleNode::Group(_)));
            }
            RuleNode::Condition(_) => panic!("expected group"),
        }
        assert_eq!(rule.actions[0].action_type, ActionKind::SetValue);
        assert_eq!(rule.actions[0].parameters["unit"], json!("W/sqft"));
    }

    #[test]
    fn test_schema_round_trip() {
        let source = sample_schema_json();
        let schema = RuleSchema::from_value(source.clone()).unwrap();
        assert_eq!(schema.to_value().unwrap(), source);

        let reparsed = RuleSchema::from_json(&schema.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reparsed, schema);
    }

    #[test]
    fn test_missing_required_key() {
        let mut doc = sample_schema_json();
        doc["rules"][0].as_object_mut().unwrap().remove("name");
        let err = RuleSchema::from_value(doc).unwrap_err();
        assert!(err.is_schema());

        let err = RuleSchema::from_value(json!({"rules": []})).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_unknown_operator_literal() {
        let mut doc = sample_schema_json();
        doc["rules"][0]["conditions"]["conditions"][0]["operator"] = json!("between");
        assert!(RuleSchema::from_value(doc).unwrap_err().is_schema());

        let mut doc = sample_schema_json();
        doc["rules"][0]["conditions"]["operator"] = json!("xor");
        assert!(RuleSchema::from_value(doc).unwrap_err().is_schema());
    }

    #[test]
    fn test_condition_missing_value_is_rejected() {
        let err = RuleNode::from_value(json!({"field": "a", "operator": "equals"})).unwrap_err();
        assert!(err.is_schema());
        assert!(RuleNode::from_value(json!("a")).is_err());
    }

    #[test]
    fn test_defaults_for_optional_keys() {
        let schema = RuleSchema::from_value(json!({
            "version": "2.0",
            "rules": [{
                "id": "r1",
                "name": "n",
                "description": "d",
                "category": "c",
                "conditions": {"field": "a", "operator": "in", "value": [1, 2]},
                "actions": [{"action_type": "custom", "target": "t", "value": {"k": 1}}]
            }]
        }))
        .unwrap();

        let rule = &schema.rules[0];
        assert_eq!(rule.priority, 0);
        assert!(rule.metadata.is_empty());
        assert!(schema.metadata.is_empty());
        assert_eq!(rule.actions[0].action_type, ActionKind::Other("custom".to_string()));
        assert_eq!(
            serde_json::to_value(&rule.actions[0]).unwrap(),
            json!({"action_type": "custom", "target": "t", "value": {"k": 1}})
        );
    }

    #[test]
    fn test_referenced_fields_are_deduplicated() {
        let schema = RuleSchema::from_value(sample_schema_json()).unwrap();
        assert_eq!(
            schema.referenced_fields(),
            vec!["building_type", "building_area", "num_stories"]
        );
    }

    #[test]
    fn test_building_spec() {
        let spec = BuildingSpec::from_json(r#"{"building_type": "office", "note": null}"#).unwrap();
        assert_eq!(spec.get_field("building_type"), Some(&json!("office")));
        assert_eq!(spec.get_field("note"), None);
        assert!(spec.contains_field("note"));
        assert_eq!(spec.get_field("nonexistent"), None);

        assert!(matches!(
            BuildingSpec::from_value(json!([1, 2])),
            Err(RuleError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_building_spec_mutation() {
        let mut spec = BuildingSpec::default();
        spec.insert("building_area", 12000);
        spec.insert("climate_zone", "4c");

        assert_eq!(spec.data().len(), 2);
        assert_eq!(spec.get_field("building_area"), Some(&json!(12000)));

        spec.insert("building_area", 13000);
        assert_eq!(
            spec.into_value(),
            json!({"building_area": 13000, "climate_zone": "4c"})
        );
    }

    #[test]
    fn test_schema_lookup_by_id() {
        let schema = RuleSchema::from_value(sample_schema_json()).unwrap();
        let first_id = schema.rules[0].id.clone();

        assert_eq!(schema.get(&first_id), Some(&schema.rules[0]));
        assert_eq!(schema.get("missing"), None);
    }
}
