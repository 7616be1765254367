use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 存储后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// SurrealDB（rocksdb:// / mem:// / ws:// 等）
    #[default]
    Surrealdb,
    /// 进程内存储，仅用于开发和测试
    Memory,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 存储后端
    pub backend: DatabaseBackend,
    /// SurrealDB 连接地址
    pub url: String,
    /// 命名空间
    pub namespace: String,
    /// 数据库名称
    pub database: String,
    /// 用户名（本地引擎可留空）
    pub username: Option<String>,
    /// 密码
    pub password: Option<String>,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// API 路径前缀
    pub api_prefix: String,
}

/// LLM 网关配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// API 凭证
    pub api_key: Option<String>,
    /// 模型标识
    pub model: String,
    /// 生成接口地址
    pub base_url: String,
    /// 离线模式：不发起网络请求，使用确定性回复
    pub offline_fallback: bool,
    /// 额外的 persona 定义文件（TOML），覆盖内置表
    pub persona_file: Option<PathBuf>,
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UploadsConfig {
    /// 上传文件目录
    pub dir: PathBuf,
    /// 单个请求体大小上限（字节）
    pub max_bytes: usize,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// 允许的来源，`*` 表示任意来源
    pub allow_origins: Vec<String>,
}

impl CorsConfig {
    /// 从逗号分隔的字符串解析来源列表
    pub fn parse_origins(raw: &str) -> Vec<String> {
        if raw.trim() == "*" {
            return vec!["*".to_string()];
        }
        raw.split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 是否允许任意来源
    pub fn allows_any(&self) -> bool {
        self.allow_origins.is_empty() || self.allow_origins.iter().any(|o| o == "*")
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化（JSON）日志格式
    pub structured: bool,
    /// 日志文件目录，为空时只输出到终端
    pub log_dir: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// LLM 网关配置
    pub llm: LlmConfig,
    /// 上传配置
    pub uploads: UploadsConfig,
    /// CORS 配置
    pub cors: CorsConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 启动时写入演示数据
    pub seed_demo_data: bool,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8000,
                api_prefix: "/api".into(),
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Surrealdb,
                url: "rocksdb://./data/homegrown.db".into(),
                namespace: "homegrown".into(),
                database: "tutoring".into(),
                username: None,
                password: None,
            },
            llm: LlmConfig {
                api_key: None,
                model: "gemini-pro-latest".into(),
                base_url: "https://generativelanguage.googleapis.com".into(),
                offline_fallback: false,
                persona_file: None,
            },
            uploads: UploadsConfig {
                dir: PathBuf::from("./uploads"),
                max_bytes: 25 * 1024 * 1024,
            },
            cors: CorsConfig {
                allow_origins: vec!["*".into()],
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            seed_demo_data: false,
            app_name: "homegrown".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config
    }

    /// 按环境名选择默认配置，未知名称视为开发环境
    pub fn for_environment(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(n) if n.eq_ignore_ascii_case("production") => Self::production(),
            _ => Self::development(),
        }
    }
}
