//! 配置管理
//!
//! 分层加载配置：内置默认值，可选配置文件，然后是 `TRIAGE__` 前缀的环境变量，
//! 例如 `TRIAGE__QUEUE__DISPATCH_ON_START=2`。

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 分诊服务完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// 服务配置
    pub service: ServiceConfig,
    /// 队列配置
    pub queue: QueueConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// 服务名称
    pub name: String,
    /// 启动时载入的种子数据（JSON）
    pub seed_path: Option<String>,
}

/// 队列配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// 启动时用存储中的待诊记录重建队列
    pub rebuild_on_start: bool,
    /// 启动后立即叫号的人数
    pub dispatch_on_start: usize,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（env-filter 指令）
    pub level: String,
    /// 输出事件的 target
    pub with_target: bool,
    /// 彩色输出
    pub ansi: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "triage-server".to_string(),
            seed_path: None,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            rebuild_on_start: true,
            dispatch_on_start: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
            ansi: true,
        }
    }
}

/// 从可选的配置文件和环境变量加载配置
pub fn load_config(config_path: Option<&str>) -> Result<TriageConfig> {
    let mut builder = Config::builder();
    if let Some(path) = config_path {
        builder = builder.add_source(File::with_name(path));
    }
    let settings = builder
        .add_source(Environment::with_prefix("TRIAGE").separator("__").try_parsing(true))
        .build()
        .context("Failed to build configuration sources")?;

    let config = finish(settings)?;
    info!(
        "Configuration loaded successfully from: {}",
        config_path.unwrap_or("<defaults + environment>")
    );
    Ok(config)
}

/// 从字符串解析配置，不读取环境变量
pub fn parse_config(contents: &str, format: FileFormat) -> Result<TriageConfig> {
    let settings = Config::builder()
        .add_source(File::from_str(contents, format))
        .build()
        .context("Failed to parse configuration")?;
    finish(settings)
}

fn finish(settings: Config) -> Result<TriageConfig> {
    let config: TriageConfig = settings
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&TriageConfig) -> Result<()>,
    /// 错误消息
    error_message: &'static str,
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "service.name",
                validator: |config| {
                    if config.service.name.trim().is_empty() {
                        Err(anyhow::anyhow!("Service name cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid service name",
            },
            ValidationRule {
                field_path: "service.seed_path",
                validator: |config| match &config.service.seed_path {
                    Some(path) if path.trim().is_empty() => Err(anyhow::anyhow!("Seed path cannot be blank")),
                    _ => Ok(()),
                },
                error_message: "Invalid seed path",
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    EnvFilter::try_new(&config.logging.level)
                        .map(|_| ())
                        .map_err(|e| anyhow::anyhow!("Unparseable filter '{}': {}", config.logging.level, e))
                },
                error_message: "Invalid log level",
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &TriageConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
