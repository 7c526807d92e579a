//! 建筑能耗基线规则引擎
//!
//! 提供：
//! - 规则/条件树/动作数据模型及其 JSON 表示
//! - 自然语言规则文本解析（基于有序模式表）
//! - 按优先级评估规则并生成基线属性

pub mod defaults;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod operators;
pub mod parser;

pub use defaults::default_rule_schema;
pub use engine::{BaselineEngine, BaselineOutput, RuleTrace};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use models::{
    Action, ActionKind, BaselineDocument, BuildingSpec, Condition, ConditionGroup,
    EvaluationLogEntry, EvaluationStatus, MatchedRule, Metadata, Rule, RuleNode, RuleSchema,
    ValidationReport,
};
pub use operators::{ComparisonOperator, LogicalOperator};
pub use parser::RuleParser;

pub use baseline_shared::config::{EngineConfig, OutputFormat, ParserConfig};
