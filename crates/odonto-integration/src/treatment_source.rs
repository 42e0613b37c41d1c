//! 治疗数据源
//!
//! 治疗目录可以来自内置静态表，也可以来自后端REST接口：
//! - `GET {base}/treatment/all`
//! - `GET {base}/treatment-condition/all`

use async_trait::async_trait;
use odonto_chart::TreatmentCatalog;
use odonto_core::utils::normalize_key;
use odonto_core::{ConditionFlag, OdontoError, Result, ToothFace, Treatment, TreatmentCondition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 治疗数据源接口
#[async_trait]
pub trait TreatmentSource: Send + Sync {
    /// 数据源名称
    fn name(&self) -> &str;

    /// 加载治疗目录
    async fn fetch_catalog(&self) -> Result<TreatmentCatalog>;
}

/// 内置静态治疗表
#[derive(Debug, Default, Clone)]
pub struct StaticTreatmentSource;

#[async_trait]
impl TreatmentSource for StaticTreatmentSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_catalog(&self) -> Result<TreatmentCatalog> {
        Ok(TreatmentCatalog::standard())
    }
}

/// 后端返回的治疗记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<ConditionRecord>,
}

/// 后端返回的治疗条件记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// REST治疗数据源
pub struct RestTreatmentSource {
    base_url: String,
    client: reqwest::Client,
}

impl RestTreatmentSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OdontoError::network("Failed to build HTTP client", e))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 传输失败和非2xx状态映射为 `Network`，响应体不合法映射为 `Serialization`
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OdontoError::network(format!("GET {}", url), e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("GET {} returned {}", url, status);
            return Err(OdontoError::network(format!("GET {}", url), status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OdontoError::network(format!("GET {}", url), e))?;

        serde_json::from_str(&body).map_err(|e| {
            warn!("Invalid JSON from {}: {}", url, e);
            OdontoError::from(e)
        })
    }
}

#[async_trait]
impl TreatmentSource for RestTreatmentSource {
    fn name(&self) -> &str {
        "rest"
    }

    async fn fetch_catalog(&self) -> Result<TreatmentCatalog> {
        let treatments: Vec<TreatmentRecord> = self.get_json("/treatment/all").await?;
        let conditions: Vec<ConditionRecord> = self.get_json("/treatment-condition/all").await?;

        info!(
            "Fetched {} treatments and {} conditions from {}",
            treatments.len(),
            conditions.len(),
            self.base_url
        );
        build_catalog(&treatments, &conditions)
    }
}

/// 由后端记录构建治疗目录
///
/// 治疗自带条件缺少颜色时，从全局条件表按ID补全。
pub fn build_catalog(
    treatments: &[TreatmentRecord],
    conditions: &[ConditionRecord],
) -> Result<TreatmentCatalog> {
    let palette: HashMap<i64, &ConditionRecord> =
        conditions.iter().map(|condition| (condition.id, condition)).collect();

    let definitions = treatments
        .iter()
        .map(|record| {
            let conditions: Vec<TreatmentCondition> = record
                .conditions
                .iter()
                .map(|condition| TreatmentCondition {
                    id: condition.id,
                    name: condition.name.clone(),
                    color: condition
                        .color
                        .clone()
                        .or_else(|| palette.get(&condition.id).and_then(|c| c.color.clone())),
                })
                .collect();

            let mut treatment = Treatment::new(record.name.as_str(), record.name.clone())
                .with_icons([normalize_key(&record.name)]);
            for condition in &conditions {
                let flags = condition_flags(&condition.name);
                if flags.is_empty() {
                    debug!("Condition {} carries no charting flag", condition.name);
                }
                treatment.flags.extend(flags);
            }
            treatment.color = conditions.iter().find_map(|c| c.color.clone());
            treatment.conditions = conditions;
            treatment
        })
        .collect();

    TreatmentCatalog::new(definitions).map_err(|e| {
        warn!("Rejected treatment catalog: {}", e);
        e
    })
}

/// 条件名称到标记的映射
fn condition_flags(name: &str) -> Vec<ConditionFlag> {
    let name = normalize_key(name);
    match name.as_str() {
        "bridge_start" => vec![ConditionFlag::BridgeStart],
        "bridge_end" => vec![ConditionFlag::BridgeEnd],
        "surface" | "faces" | "caries" | "composite" => ToothFace::ALL
            .iter()
            .map(|face| ConditionFlag::Face(*face))
            .collect(),
        other => other
            .parse::<ToothFace>()
            .map(|face| vec![ConditionFlag::Face(face)])
            .unwrap_or_default(),
    }
}
