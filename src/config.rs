use anyhow::Result;
use std::{env, path::PathBuf, sync::Arc};

/// 调用方认证密钥列表（JSON 数组）
pub const AUTH_KEYS: &str = "AUTH_KEYS";
/// 模型关键词 → 上游地址映射（JSON 对象，按声明顺序匹配）
pub const MODEL_MAPPINGS: &str = "MODEL_MAPPINGS";
/// 上游地址 → 上游密钥映射（JSON 对象）
pub const API_KEYS: &str = "API_KEYS";

/// 100 MiB，足够容纳带 base64 图片的长上下文请求
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Where routing configuration is read from. Implementations are queried on
/// every request, so a changed value takes effect without a restart.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

pub type SharedSource = Arc<dyn ConfigSource>;

/// 从进程环境变量读取（含启动时由 .env 加载的值）
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// In-memory source used by tests instead of mutating the process environment.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct StaticSource(pub std::collections::HashMap<String, String>);

#[cfg(test)]
impl StaticSource {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
impl ConfigSource for StaticSource {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    // 上游客户端，未设置时不限制总时长（流式响应可以持续任意时间）
    pub upstream_timeout_secs: Option<u64>,

    // 入站请求体上限，0 表示不限制
    pub max_body_bytes: usize,

    // 日志配置
    pub debug: bool,
    pub verbose: bool,
    pub log_raw_json: bool,

    // 500 响应中是否包含错误详情和调用链
    pub expose_error_details: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upstream_timeout_secs: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            debug: false,
            verbose: false,
            log_raw_json: false,
            expose_error_details: false,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl Config {
    fn load_dotenv(custom_path: Option<PathBuf>) -> Option<PathBuf> {
        if let Some(path) = custom_path {
            if path.exists() && dotenvy::from_path(&path).is_ok() {
                return Some(path);
            }
            eprintln!("⚠️  WARNING: Custom config file not found: {}", path.display());
        }

        if let Ok(path) = dotenvy::dotenv() {
            return Some(path);
        }

        let home_config = env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".openai-router.env"));
        let candidates = home_config
            .into_iter()
            .chain(std::iter::once(PathBuf::from("/etc/openai-router/.env")));

        for path in candidates {
            if path.exists() && dotenvy::from_path(&path).is_ok() {
                return Some(path);
            }
        }

        None
    }

    pub fn from_env_with_path(custom_path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = Self::load_dotenv(custom_path) {
            eprintln!("📄 Loaded config from: {}", path.display());
        } else {
            eprintln!("ℹ️  No .env file found, using environment variables only");
        }

        let defaults = Config::default();

        let host = env::var("HOST").unwrap_or(defaults.host);

        let port = match env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid PORT value: {}", p))?,
            Err(_) => defaults.port,
        };

        let upstream_timeout_secs = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(v) => Some(
                v.parse()
                    .map_err(|_| anyhow::anyhow!("Invalid UPSTREAM_TIMEOUT_SECS value: {}", v))?,
            ),
            Err(_) => defaults.upstream_timeout_secs,
        };

        let max_body_bytes = match env::var("MAX_BODY_BYTES") {
            Ok(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid MAX_BODY_BYTES value: {}", v))?,
            Err(_) => defaults.max_body_bytes,
        };

        // 路由配置每次请求都会重新读取，这里只做提示
        for key in [AUTH_KEYS, MODEL_MAPPINGS, API_KEYS] {
            if env::var(key).is_err() {
                eprintln!("⚠️  WARNING: {} is not set, POST requests will fail", key);
            }
        }

        Ok(Config {
            host,
            port,
            upstream_timeout_secs,
            max_body_bytes,
            debug: env_flag("DEBUG"),
            verbose: env_flag("VERBOSE"),
            log_raw_json: env_flag("LOG_RAW_JSON"),
            expose_error_details: env_flag("EXPOSE_ERROR_DETAILS"),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
