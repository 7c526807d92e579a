//! 内置示例规则集
//!
//! 调用方未提供规则文档时使用。规则均为合成示例，不取自任何标准原文。

use serde_json::json;

use crate::models::{Action, Condition, ConditionGroup, Rule, RuleSchema};
use crate::operators::ComparisonOperator;

/// 构建默认规则集：小型办公建筑照明基线（优先级 10）与炎热气候制冷效率（优先级 5）
pub fn default_rule_schema() -> RuleSchema {
    let small_office = Rule::new(
        "r001",
        "Small Office Building Baseline",
        ConditionGroup::and(vec![
            Condition::new("building_type", ComparisonOperator::Equals, "office").into(),
            Condition::new("building_area", ComparisonOperator::LessThan, 25000)
                .with_unit("sqft")
                .into(),
        ]),
    )
    .with_description("Baseline specifications for small office buildings")
    .with_category("building_type")
    .with_action(Action::set_value("lighting_power_density", 1.0).with_parameter("unit", "W/sqft"))
    .with_priority(10);

    let hot_climate = Rule::new(
        "r002",
        "Hot Climate HVAC Efficiency",
        Condition::new(
            "climate_zone",
            ComparisonOperator::In,
            json!(["1a", "1b", "2a", "2b"]),
        ),
    )
    .with_description("HVAC efficiency requirements for hot climates")
    .with_category("hvac")
    .with_action(Action::set_value("cooling_cop", 3.5).with_parameter("unit", "dimensionless"))
    .with_priority(5);

    RuleSchema::new("1.0", vec![small_office, hot_climate])
        .with_metadata(
            "description",
            "Default example rules for building energy baselines",
        )
        .with_metadata(
            "note",
            "These are synthetic examples only, not based on copyrighted standards",
        )
}
