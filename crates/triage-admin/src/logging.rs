//! 日志初始化
//!
//! 根据日志配置安装全局 tracing subscriber；`RUST_LOG` 不参与，命令行的级别优先于配置文件。

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// 构建过滤器：`override_level` 存在时覆盖配置中的级别
pub fn build_filter(config: &LoggingConfig, override_level: Option<&str>) -> Result<EnvFilter> {
    let directives = override_level.unwrap_or(&config.level);
    EnvFilter::try_new(directives).with_context(|| format!("Invalid log filter: {}", directives))
}

/// 安装全局日志订阅者，只能成功调用一次
pub fn init_tracing(config: &LoggingConfig, override_level: Option<&str>) -> Result<()> {
    let filter = build_filter(config, override_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!("Tracing initialised with level {}", override_level.unwrap_or(&config.level));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_takes_precedence() {
        let config = LoggingConfig {
            level: "triage=loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(build_filter(&config, None).is_err());
        assert!(build_filter(&config, Some("debug")).is_ok());
    }

    #[test]
    fn test_default_level_builds() {
        assert!(build_filter(&LoggingConfig::default(), None).is_ok());
        assert!(build_filter(&LoggingConfig::default(), Some("triage_engine=debug,warn")).is_ok());
    }
}
