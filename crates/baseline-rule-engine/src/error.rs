//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    /// 规则文档结构不合法（缺少必需字段、未知操作符），直接返回给调用方
    #[error("规则文档无效: {0}")]
    Schema(String),

    /// 单条自然语言规则无法解析，多行解析时会跳过该行
    #[error("规则文本解析失败: {0}")]
    ParseMiss(String),

    #[error("建筑规格无效: {0}")]
    InvalidSpec(String),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML 序列化错误: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RuleError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
