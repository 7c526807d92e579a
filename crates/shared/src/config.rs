//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 基线文档输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn is_json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// 规则文本解析配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// 未显式指定类别时赋予规则的类别
    pub default_category: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_category: "general".to_string(),
        }
    }
}

/// 评估引擎配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 为 true 时逐条记录条件树的求值过程
    pub trace_enabled: bool,
    pub output_format: OutputFormat,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: String,
    pub observability: ObservabilityConfig,
    pub parser: ParserConfig,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            observability: ObservabilityConfig::default(),
            parser: ParserConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 环境名取自 BASELINE_ENV（默认 development），配置目录取自 CONFIG_DIR（默认 config）。
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("BASELINE_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(config_dir, &env)
    }

    /// 从指定目录加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. {config_dir}/default.toml
    /// 2. {config_dir}/{environment}.toml
    /// 3. 环境变量（如 BASELINE_ENGINE__OUTPUT_FORMAT -> engine.output_format）
    pub fn load_from(config_dir: impl AsRef<Path>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        Config::builder()
            .set_default("environment", environment)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", environment))).required(false),
            )
            .add_source(
                Environment::with_prefix("BASELINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
