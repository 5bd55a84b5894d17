//! # 分诊管理模块
//!
//! 提供配置加载、配置验证和日志初始化等运维功能

pub mod config;
pub mod logging;

pub use config::{load_config, parse_config, ConfigValidator, LoggingConfig, QueueConfig, ServiceConfig, TriageConfig};
pub use logging::{build_filter, init_tracing};

use anyhow::Result;

/// 启动引导：加载配置并初始化日志
///
/// 配置在日志初始化之前加载，因此加载过程中的日志不会输出。
pub fn bootstrap(config_path: Option<&str>, log_level: Option<&str>) -> Result<TriageConfig> {
    let config = load_config(config_path)?;
    init_tracing(&config.logging, log_level)?;
    tracing::info!("Starting {}", config.service.name);
    Ok(config)
}
