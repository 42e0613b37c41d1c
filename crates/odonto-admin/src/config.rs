//! 配置管理
//!
//! 提供统一的配置管理功能：TOML配置文件叠加 `ODONTO__` 环境变量，加载后校验

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use tracing::{info, error, debug};
use config::{Config, Environment, File};

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<OdontoConfig>>,
    /// 配置文件路径，未指定时只使用默认值和环境变量
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 系统完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdontoConfig {
    /// 牙位图配置
    pub chart: ChartConfig,
    /// 治疗数据源配置
    pub treatments: TreatmentSourceConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 牙位图配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// 是否显示乳牙象限
    pub show_temporaries: bool,
    /// 分面区域只接受可分面的治疗
    pub strict_surface_validation: bool,
    /// 等待确认的秒数，0 表示无限等待
    pub confirm_timeout_secs: u64,
    /// 新会话使用的牙位图模板
    pub template: ChartTemplate,
}

/// 牙位图模板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartTemplate {
    Empty,
    Standard,
}

/// 治疗数据源配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatmentSourceConfig {
    /// 数据源类型
    pub source: SourceKind,
    /// REST接口地址
    pub base_url: Option<String>,
    /// 请求超时秒数
    pub request_timeout_secs: u64,
}

/// 数据源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Static,
    Rest,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或过滤指令
    pub level: String,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(SourceKind::Static),
            "rest" => Ok(SourceKind::Rest),
            other => Err(format!("unknown treatment source '{}' (expected static or rest)", other)),
        }
    }
}

impl ChartConfig {
    /// 确认等待上限
    pub fn confirm_timeout(&self) -> Option<Duration> {
        match self.confirm_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl TreatmentSourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
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
    field_path: String,
    /// 验证函数
    validator: fn(&OdontoConfig) -> Result<()>,
    /// 错误消息
    error_message: String,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 从文件和环境变量加载配置
    fn load_config(config_path: Option<&str>) -> Result<OdontoConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("ODONTO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: OdontoConfig = settings.try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded successfully from: {}", path),
            None => debug!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> OdontoConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 更新配置
    pub async fn update_config(&self, new_config: OdontoConfig) -> Result<()> {
        // 验证新配置
        self.validator.validate(&new_config)?;

        {
            let mut config = self.config.write().await;
            *config = new_config;
        }

        if self.config_path.is_some() {
            self.save_config().await?;
        }

        info!("Configuration updated successfully");
        Ok(())
    }

    /// 保存配置到文件
    pub async fn save_config(&self) -> Result<()> {
        let path = self.config_path.as_deref()
            .ok_or_else(|| anyhow::anyhow!("No configuration file to save to"))?;

        let config = self.config.read().await;
        let config_str = toml::to_string_pretty(&*config)
            .context("Failed to serialize configuration")?;

        tokio::fs::write(path, config_str).await
            .context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path);
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;
        Ok(())
    }

    /// 按点分路径获取配置值，如 `chart.show_temporaries`
    pub async fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.config.read().await;
        let value = extract_nested_value(&config, path)
            .context(format!("Configuration path not found: {}", path))?;

        serde_json::from_value(value)
            .context("Failed to deserialize configuration value")
    }

    /// 验证配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

/// 提取嵌套值
fn extract_nested_value(config: &OdontoConfig, path: &str) -> Result<serde_json::Value> {
    let config_json = serde_json::to_value(config)
        .context("Failed to serialize config to JSON")?;

    let mut current = &config_json;
    for part in path.split('.') {
        match current {
            serde_json::Value::Object(map) => {
                current = map.get(part)
                    .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
            }
            _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
        }
    }

    Ok(current.clone())
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "treatments.base_url".to_string(),
                validator: |config| {
                    if config.treatments.source != SourceKind::Rest {
                        return Ok(());
                    }
                    match config.treatments.base_url.as_deref() {
                        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
                        Some(url) => Err(anyhow::anyhow!("Unsupported URL scheme: {}", url)),
                        None => Err(anyhow::anyhow!("REST source requires a base URL")),
                    }
                },
                error_message: "Invalid treatment source URL".to_string(),
            },
            ValidationRule {
                field_path: "treatments.request_timeout_secs".to_string(),
                validator: |config| {
                    if config.treatments.request_timeout_secs == 0 {
                        Err(anyhow::anyhow!("Request timeout cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid request timeout".to_string(),
            },
            ValidationRule {
                field_path: "logging.level".to_string(),
                validator: |config| {
                    if config.logging.level.trim().is_empty() {
                        Err(anyhow::anyhow!("Log level cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid log level".to_string(),
            },
        ];

        Self {
            validation_rules,
        }
    }

    /// 验证配置
    pub fn validate(&self, config: &OdontoConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            show_temporaries: true,
            strict_surface_validation: false,
            confirm_timeout_secs: 120,
            template: ChartTemplate::Standard,
        }
    }
}

impl Default for TreatmentSourceConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Static,
            base_url: None,
            request_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
