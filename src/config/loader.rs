use crate::config::config::{AppConfig, CorsConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 优先级（后者覆盖前者）：
    /// 1. 环境默认值（`HOMEGROWN_ENV=production` 时为生产环境）
    /// 2. ./homegrown.toml
    /// 3. `HOMEGROWN__` 前缀环境变量（`__` 表示嵌套，如 `HOMEGROWN__LLM__MODEL`）
    /// 4. 扁平环境变量（`GEMINI_API_KEY`、`CORS_ALLOW_ORIGINS` 等）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        let environment = std::env::var("HOMEGROWN_ENV").ok();
        let defaults = AppConfig::for_environment(environment.as_deref());
        let mut config: AppConfig = Figment::from(Serialized::defaults(defaults))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("HOMEGROWN__").split("__"))
            .extract()?;

        apply_flat_env(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.database.url.trim().is_empty() {
            return Err(ConfigValidationError::MissingDatabaseUrl);
        }

        if config.uploads.dir.as_os_str().is_empty() {
            return Err(ConfigValidationError::InvalidPath("uploads.dir".into()));
        }

        if config.llm.model.trim().is_empty() {
            return Err(ConfigValidationError::MissingModel);
        }

        let prefix = &config.server.api_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ConfigValidationError::InvalidPath("server.api_prefix".into()));
        }

        if let Some(origin) = config
            .cors
            .allow_origins
            .iter()
            .find(|o| o.as_str() != "*" && !(o.starts_with("http://") || o.starts_with("https://")))
        {
            return Err(ConfigValidationError::InvalidOrigin(origin.clone()));
        }

        Ok(())
    }
}

/// 应用扁平命名的环境变量
///
/// `lookup` 返回 `None` 表示变量未设置。
pub fn apply_flat_env<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("HOMEGROWN_DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(origins) = lookup("CORS_ALLOW_ORIGINS") {
        config.cors.allow_origins = CorsConfig::parse_origins(&origins);
    }
    if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
        config.llm.api_key = Some(key);
    }
    if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
        config.llm.model = model;
    }
    if let Some(flag) = lookup("HOMEGROWN_DEV_FALLBACK") {
        config.llm.offline_fallback = parse_flag(&flag);
    }
    if let Some(dir) = lookup("HOMEGROWN_UPLOADS_DIR").filter(|d| !d.trim().is_empty()) {
        config.uploads.dir = PathBuf::from(dir);
    }
}

/// 解析开关类环境变量，只有 `1` / `true` / `yes` / `on` 视为开启
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("数据库连接 URL 未配置")]
    MissingDatabaseUrl,

    #[error("LLM 模型标识未配置")]
    MissingModel,

    #[error("配置路径无效: {0}")]
    InvalidPath(String),

    #[error("CORS 来源无效: {0}")]
    InvalidOrigin(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("homegrown.toml")
}
