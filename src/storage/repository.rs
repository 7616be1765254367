use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Agent, ChatLog, Course, Enrollment, User};

/// 参考数据仓储 trait
///
/// 导师、课程、用户在聊天过程中只读；写入只发生在种子数据阶段。
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// 根据 ID 获取导师
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>>;

    /// 根据 ID 获取课程
    async fn get_course(&self, id: &str) -> Result<Option<Course>>;

    /// 根据 ID 获取用户
    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// 写入导师（存在则覆盖）
    async fn put_agent(&self, agent: &Agent) -> Result<()>;

    /// 写入课程（存在则覆盖）
    async fn put_course(&self, course: &Course) -> Result<()>;

    /// 写入用户（存在则覆盖）
    async fn put_user(&self, user: &User) -> Result<()>;
}

/// 选课仓储 trait
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// 根据 ID 获取选课记录
    async fn get_by_id(&self, id: i64) -> Result<Option<Enrollment>>;

    /// 列出全部选课记录（按 ID 升序）
    async fn list(&self) -> Result<Vec<Enrollment>>;

    /// 创建选课记录
    async fn create(&self, enrollment: &Enrollment) -> Result<Enrollment>;
}

/// 聊天记录仓储 trait
#[async_trait]
pub trait ChatLogRepository: Send + Sync {
    /// 追加一条记录
    async fn append(&self, log: &ChatLog) -> Result<()>;

    /// 最近的 `limit` 条记录，按时间升序返回
    async fn recent(&self, enrollment_id: i64, limit: usize) -> Result<Vec<ChatLog>>;
}

/// 模块指针推进：仅当存储中的下标仍为 `expected` 时写入 `next`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleAdvance {
    pub expected: i64,
    pub next: i64,
}

/// 聊天轮次仓储 trait
///
/// 一轮聊天的模块推进和聊天记录在同一个事务里提交。
#[async_trait]
pub trait ChatTurnRepository: Send + Sync {
    /// 提交一轮聊天
    ///
    /// 返回 `false` 表示推进的比较失败（另一个请求已经推进过），此时不写入任何内容。
    /// 任一写入出错时整轮回滚。
    async fn commit_turn(
        &self,
        enrollment_id: i64,
        advance: Option<ModuleAdvance>,
        logs: &[ChatLog],
    ) -> Result<bool>;
}
