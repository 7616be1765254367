//! 进程内存储
//!
//! 与 SurrealDB 实现相同的仓储语义，用于本地开发和测试。

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Agent, ChatLog, Course, Enrollment, User};
use crate::storage::repository::{
    CatalogRepository, ChatLogRepository, ChatTurnRepository, EnrollmentRepository, ModuleAdvance,
};

/// 内存参考数据仓储
#[derive(Clone, Default)]
pub struct MemoryCatalogRepository {
    agents: Arc<DashMap<String, Agent>>,
    courses: Arc<DashMap<String, Course>>,
    users: Arc<DashMap<i64, User>>,
}

impl MemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalogRepository {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>> {
        Ok(self.agents.get(id).map(|a| a.clone()))
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>> {
        Ok(self.courses.get(id).map(|c| c.clone()))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn put_agent(&self, agent: &Agent) -> Result<()> {
        self.agents.insert(agent.id.clone(), agent.clone());
        Ok(())
    }

    async fn put_course(&self, course: &Course) -> Result<()> {
        self.courses.insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }
}

/// 内存选课仓储
#[derive(Clone, Default)]
pub struct MemoryEnrollmentRepository {
    enrollments: Arc<RwLock<BTreeMap<i64, Enrollment>>>,
}

impl MemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for MemoryEnrollmentRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Enrollment>> {
        Ok(self.enrollments.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Enrollment>> {
        Ok(self.enrollments.read().values().cloned().collect())
    }

    async fn create(&self, enrollment: &Enrollment) -> Result<Enrollment> {
        let mut enrollments = self.enrollments.write();
        if enrollments.contains_key(&enrollment.id) {
            return Err(AppError::Database(format!(
                "Enrollment already exists: {}",
                enrollment.id
            )));
        }
        enrollments.insert(enrollment.id, enrollment.clone());
        Ok(enrollment.clone())
    }
}

/// 内存聊天记录仓储，按写入顺序保存
#[derive(Clone, Default)]
pub struct MemoryChatLogRepository {
    logs: Arc<DashMap<i64, Vec<ChatLog>>>,
}

impl MemoryChatLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatLogRepository for MemoryChatLogRepository {
    async fn append(&self, log: &ChatLog) -> Result<()> {
        self.logs
            .entry(log.enrollment_id)
            .or_default()
            .push(log.clone());
        Ok(())
    }

    async fn recent(&self, enrollment_id: i64, limit: usize) -> Result<Vec<ChatLog>> {
        Ok(self
            .logs
            .get(&enrollment_id)
            .map(|logs| {
                let start = logs.len().saturating_sub(limit);
                logs[start..].to_vec()
            })
            .unwrap_or_default())
    }
}

/// 内存聊天轮次仓储
///
/// 持有选课表的写锁完成比较和全部写入。
#[derive(Clone)]
pub struct MemoryChatTurnRepository {
    enrollments: MemoryEnrollmentRepository,
    chat_logs: MemoryChatLogRepository,
}

impl MemoryChatTurnRepository {
    pub fn new(
        enrollments: MemoryEnrollmentRepository,
        chat_logs: MemoryChatLogRepository,
    ) -> Self {
        Self {
            enrollments,
            chat_logs,
        }
    }
}

#[async_trait]
impl ChatTurnRepository for MemoryChatTurnRepository {
    async fn commit_turn(
        &self,
        enrollment_id: i64,
        advance: Option<ModuleAdvance>,
        logs: &[ChatLog],
    ) -> Result<bool> {
        let mut enrollments = self.enrollments.enrollments.write();

        if let Some(advance) = advance {
            let enrollment = enrollments.get_mut(&enrollment_id).ok_or_else(|| {
                AppError::NotFound(format!("Enrollment not found: {}", enrollment_id))
            })?;
            if enrollment.current_module_index != advance.expected {
                return Ok(false);
            }
            enrollment.current_module_index = advance.next;
        }

        if !logs.is_empty() {
            self.chat_logs
                .logs
                .entry(enrollment_id)
                .or_default()
                .extend(logs.iter().cloned());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;

    fn turn_repository() -> (
        MemoryEnrollmentRepository,
        MemoryChatLogRepository,
        MemoryChatTurnRepository,
    ) {
        let enrollments = MemoryEnrollmentRepository::new();
        let chat_logs = MemoryChatLogRepository::new();
        let turns = MemoryChatTurnRepository::new(enrollments.clone(), chat_logs.clone());
        (enrollments, chat_logs, turns)
    }

    #[tokio::test]
    async fn test_commit_turn_compare_and_set() {
        let (enrollments, chat_logs, turns) = turn_repository();
        enrollments
            .create(&Enrollment::new(1, 1, "html_hero"))
            .await
            .unwrap();
        let advance = ModuleAdvance { expected: 0, next: 1 };

        let first = [
            ChatLog::new(1, Sender::Student, "done"),
            ChatLog::new(1, Sender::Agent, "well done"),
        ];
        assert!(turns.commit_turn(1, Some(advance), &first).await.unwrap());

        // 第二个携带旧下标的请求不会再次推进，也不写记录
        let stale = [ChatLog::new(1, Sender::Student, "done again")];
        assert!(!turns.commit_turn(1, Some(advance), &stale).await.unwrap());

        assert_eq!(
            enrollments.get_by_id(1).await.unwrap().unwrap().current_module_index,
            1
        );
        let contents: Vec<_> = chat_logs
            .recent(1, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.content)
            .collect();
        assert_eq!(contents, vec!["done", "well done"]);

        assert!(matches!(
            turns.commit_turn(99, Some(advance), &[]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_turn_without_advance_only_appends() {
        let (enrollments, chat_logs, turns) = turn_repository();
        enrollments
            .create(&Enrollment::new(1, 1, "html_hero"))
            .await
            .unwrap();

        let logs = [ChatLog::new(1, Sender::Student, "what is a tag?")];
        assert!(turns.commit_turn(1, None, &logs).await.unwrap());

        assert_eq!(
            enrollments.get_by_id(1).await.unwrap().unwrap().current_module_index,
            0
        );
        assert_eq!(chat_logs.recent(1, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_rejected() {
        let repo = MemoryEnrollmentRepository::new();
        repo.create(&Enrollment::new(1, 1, "html_hero")).await.unwrap();
        assert!(repo.create(&Enrollment::new(1, 1, "finance_101")).await.is_err());
    }

    #[tokio::test]
    async fn test_recent_returns_tail_in_order() {
        let repo = MemoryChatLogRepository::new();
        for i in 0..5 {
            repo.append(&ChatLog::new(1, Sender::Student, format!("msg {}", i)))
                .await
                .unwrap();
        }
        repo.append(&ChatLog::new(2, Sender::Student, "other"))
            .await
            .unwrap();

        let recent = repo.recent(1, 2).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 3", "msg 4"]);

        assert_eq!(repo.recent(1, 50).await.unwrap().len(), 5);
        assert!(repo.recent(3, 50).await.unwrap().is_empty());
    }
}
