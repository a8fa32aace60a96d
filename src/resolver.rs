//! 上游端点解析模块
//!
//! 根据模型名称中包含的关键词选择上游地址和对应的上游密钥

use crate::config::{ConfigSource, API_KEYS, MODEL_MAPPINGS};
use crate::error::{ProxyError, ProxyResult};
use serde_json::{Map, Value};

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// 上游基础地址
    pub endpoint: String,
    /// 发送给上游的密钥
    pub credential: String,
}

/// Parsed routing tables. Both keep declaration order: the first entry of
/// each is the fallback when nothing else applies.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    model_mappings: Vec<(String, String)>,
    api_keys: Vec<(String, String)>,
}

/// Parses a JSON object of string values, keeping key order.
fn parse_ordered_map(key: &str, raw: Option<String>) -> ProxyResult<Vec<(String, String)>> {
    let raw = raw.ok_or_else(|| ProxyError::Config(format!("{} is not set", key)))?;

    let map: Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
        tracing::error!("Failed to parse {}: {}", key, e);
        ProxyError::Config(format!("{} must be a JSON object", key))
    })?;

    if map.is_empty() {
        return Err(ProxyError::Config(format!("{} must not be empty", key)));
    }

    map.into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k, s)),
            _ => Err(ProxyError::Config(format!(
                "{} entry '{}' must be a string",
                key, k
            ))),
        })
        .collect()
}

impl RoutingTable {
    pub fn load(source: &dyn ConfigSource) -> ProxyResult<Self> {
        let model_mappings = parse_ordered_map(MODEL_MAPPINGS, source.get(MODEL_MAPPINGS))?;
        let api_keys = parse_ordered_map(API_KEYS, source.get(API_KEYS))?;

        tracing::debug!(
            "Available model mappings: {}",
            model_mappings
                .iter()
                .map(|(keyword, _)| keyword.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            model_mappings,
            api_keys,
        })
    }

    /// 第一个作为子串出现在模型名中的关键词胜出（大小写敏感），
    /// 没有匹配或匹配到空地址时使用第一个映射
    pub fn endpoint_for(&self, model: &str) -> &str {
        let matched = self
            .model_mappings
            .iter()
            .find(|(keyword, _)| model.contains(keyword.as_str()));

        match matched {
            Some((keyword, endpoint)) if !endpoint.is_empty() => {
                tracing::debug!("Matched keyword \"{}\" for model \"{}\"", keyword, model);
                endpoint.as_str()
            }
            _ => {
                let (_, endpoint) = &self.model_mappings[0];
                tracing::debug!("No usable keyword match for model \"{}\", using default endpoint", model);
                endpoint.as_str()
            }
        }
    }

    /// Non-empty credential registered for `endpoint`, else the first one declared.
    pub fn credential_for(&self, endpoint: &str) -> &str {
        self.api_keys
            .iter()
            .find(|(url, key)| url == endpoint && !key.is_empty())
            .unwrap_or_else(|| {
                tracing::debug!("No API key registered for {}, using default key", endpoint);
                &self.api_keys[0]
            })
            .1
            .as_str()
    }

    pub fn resolve(&self, model: &str) -> Resolution {
        let endpoint = self.endpoint_for(model);
        Resolution {
            endpoint: endpoint.to_string(),
            credential: self.credential_for(endpoint).to_string(),
        }
    }
}

/// 读取配置并解析模型对应的上游
pub fn resolve(model: &str, source: &dyn ConfigSource) -> ProxyResult<Resolution> {
    tracing::debug!("Processing request for model: {}", model);
    Ok(RoutingTable::load(source)?.resolve(model))
}
