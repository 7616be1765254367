//! 存储工厂模块
//!
//! 根据配置创建相应的仓储实例。

use std::sync::Arc;
use tracing::info;

use crate::config::config::{DatabaseBackend, DatabaseConfig};
use crate::error::Result;
use crate::storage::memory::{
    MemoryCatalogRepository, MemoryChatLogRepository, MemoryChatTurnRepository,
    MemoryEnrollmentRepository,
};
use crate::storage::repository::{
    CatalogRepository, ChatLogRepository, ChatTurnRepository, EnrollmentRepository,
};
use crate::storage::surrealdb::{
    SurrealCatalogRepository, SurrealChatLogRepository, SurrealChatTurnRepository,
    SurrealEnrollmentRepository, SurrealPool,
};

/// 存储实例枚举
#[derive(Clone)]
pub enum StorageInstance {
    SurrealDB(SurrealPool),
    Memory,
}

/// 一组共享同一存储后端的仓储
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub chat_logs: Arc<dyn ChatLogRepository>,
    pub turns: Arc<dyn ChatTurnRepository>,
    pub instance: StorageInstance,
}

impl Repositories {
    /// 进程内仓储
    pub fn in_memory() -> Self {
        let enrollments = MemoryEnrollmentRepository::new();
        let chat_logs = MemoryChatLogRepository::new();
        Self {
            catalog: Arc::new(MemoryCatalogRepository::new()),
            turns: Arc::new(MemoryChatTurnRepository::new(
                enrollments.clone(),
                chat_logs.clone(),
            )),
            enrollments: Arc::new(enrollments),
            chat_logs: Arc::new(chat_logs),
            instance: StorageInstance::Memory,
        }
    }

    /// 基于 SurrealDB 连接的仓储
    pub fn surreal(pool: SurrealPool) -> Self {
        let enrollments = SurrealEnrollmentRepository::new(&pool);
        let chat_logs = SurrealChatLogRepository::new(&pool);
        Self {
            catalog: Arc::new(SurrealCatalogRepository::new(&pool)),
            turns: Arc::new(SurrealChatTurnRepository::new(
                &pool,
                enrollments.clone(),
                chat_logs.clone(),
            )),
            enrollments: Arc::new(enrollments),
            chat_logs: Arc::new(chat_logs),
            instance: StorageInstance::SurrealDB(pool),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.instance {
            StorageInstance::SurrealDB(_) => "surrealdb",
            StorageInstance::Memory => "memory",
        };
        f.debug_struct("Repositories")
            .field("backend", &backend)
            .finish()
    }
}

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建仓储
    pub async fn create(config: &DatabaseConfig) -> Result<Repositories> {
        match config.backend {
            DatabaseBackend::Surrealdb => {
                let pool = SurrealPool::new(config).await?;
                info!(url = %config.url, "SurrealDB storage ready");
                Ok(Repositories::surreal(pool))
            }
            DatabaseBackend::Memory => {
                info!("In-memory storage ready");
                Ok(Repositories::in_memory())
            }
        }
    }

    /// 检查存储是否可用
    pub async fn health_check(storage: &StorageInstance) -> Result<bool> {
        match storage {
            StorageInstance::SurrealDB(pool) => {
                pool.health().await?;
                Ok(true)
            }
            StorageInstance::Memory => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend() {
        let config = DatabaseConfig {
            backend: DatabaseBackend::Memory,
            ..Default::default()
        };
        let repos = StorageFactory::create(&config).await.unwrap();
        assert!(matches!(repos.instance, StorageInstance::Memory));
        assert!(StorageFactory::health_check(&repos.instance).await.unwrap());
        assert!(repos.enrollments.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_surreal_mem_engine_round_trip() {
        use crate::models::{ChatLog, Enrollment, Sender};
        use crate::storage::repository::ModuleAdvance;

        let config = DatabaseConfig {
            backend: DatabaseBackend::Surrealdb,
            url: "mem://".into(),
            namespace: "homegrown".into(),
            database: "test".into(),
            username: None,
            password: None,
        };
        let repos = StorageFactory::create(&config).await.unwrap();

        repos
            .enrollments
            .create(&Enrollment::new(1, 1, "html_hero"))
            .await
            .unwrap();
        let loaded = repos.enrollments.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(loaded.id, 1);
        assert_eq!(loaded.course_id.as_deref(), Some("html_hero"));

        let advance = ModuleAdvance { expected: 0, next: 1 };
        assert!(repos
            .turns
            .commit_turn(
                1,
                Some(advance),
                &[
                    ChatLog::new(1, Sender::Student, "hi"),
                    ChatLog::new(1, Sender::Agent, "hello"),
                ],
            )
            .await
            .unwrap());
        assert!(!repos.turns.commit_turn(1, Some(advance), &[]).await.unwrap());

        let recent = repos.chat_logs.recent(1, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].sender, Sender::Student);
        assert_eq!(recent[1].sender, Sender::Agent);
    }

    #[tokio::test]
    async fn test_surreal_turn_rolls_back_when_a_log_write_fails() {
        use crate::error::AppError;
        use crate::models::{ChatLog, Enrollment, Sender};
        use crate::storage::repository::ModuleAdvance;

        let config = DatabaseConfig {
            backend: DatabaseBackend::Surrealdb,
            url: "mem://".into(),
            namespace: "homegrown".into(),
            database: "rollback".into(),
            username: None,
            password: None,
        };
        let repos = StorageFactory::create(&config).await.unwrap();
        repos
            .enrollments
            .create(&Enrollment::new(1, 1, "html_hero"))
            .await
            .unwrap();

        let existing = ChatLog::new(1, Sender::Student, "earlier");
        repos.chat_logs.append(&existing).await.unwrap();

        // 第二条记录与已有记录同 ID，CREATE 失败
        let result = repos
            .turns
            .commit_turn(
                1,
                Some(ModuleAdvance { expected: 0, next: 1 }),
                &[ChatLog::new(1, Sender::Agent, "well done"), existing.clone()],
            )
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        let stored = repos.enrollments.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.current_module_index, 0);
        let recent = repos.chat_logs.recent(1, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content, "earlier");
    }
}
