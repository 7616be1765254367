use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tracing::{debug, warn};

use crate::config::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::{Agent, ChatLog, Course, Enrollment, User};
use crate::storage::repository::{
    CatalogRepository, ChatLogRepository, ChatTurnRepository, EnrollmentRepository, ModuleAdvance,
};

/// SurrealDB 连接
///
/// `Surreal<Any>` 本身是廉价克隆的句柄，每个仓储持有一份。
#[derive(Clone)]
pub struct SurrealPool {
    db: Surreal<Any>,
}

impl SurrealPool {
    /// 建立连接并选择命名空间和数据库
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db: Surreal<Any> = connect(config.url.as_str()).await?;

        // 远程引擎需要认证，本地引擎（rocksdb:// / mem://）跳过
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        Ok(Self { db })
    }

    /// 获取内部数据库实例
    pub fn inner(&self) -> Surreal<Any> {
        self.db.clone()
    }

    /// 连通性检查
    pub async fn health(&self) -> Result<()> {
        self.db.health().await?;
        Ok(())
    }
}

/// 记录键由 `type::thing` 单独给出，内容里去掉 `id` 字段
fn content_without_id<T: Serialize>(entity: &T) -> Result<Value> {
    let mut value = serde_json::to_value(entity)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("id");
    }
    Ok(value)
}

const UPSERT_RECORD: &str = "UPSERT type::thing($table, $id) CONTENT $data";

/// 参考数据仓储实现
#[derive(Clone)]
pub struct SurrealCatalogRepository {
    db: Surreal<Any>,
}

impl SurrealCatalogRepository {
    pub fn new(pool: &SurrealPool) -> Self {
        Self { db: pool.inner() }
    }

    async fn select_one<T>(&self, table: &'static str, id: Value) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut rows: Vec<T> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM type::thing($table, $id)")
            .bind(("table", table))
            .bind(("id", id))
            .await?
            .take(0)?;
        Ok(rows.pop())
    }

    async fn upsert<T: Serialize>(&self, table: &'static str, id: Value, entity: &T) -> Result<()> {
        let data = content_without_id(entity)?;
        self.db
            .query(UPSERT_RECORD)
            .bind(("table", table))
            .bind(("id", id))
            .bind(("data", data))
            .await?
            .check()?;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for SurrealCatalogRepository {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>> {
        self.select_one("agent", Value::from(id)).await
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>> {
        self.select_one("course", Value::from(id)).await
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.select_one("user", Value::from(id)).await
    }

    async fn put_agent(&self, agent: &Agent) -> Result<()> {
        self.upsert("agent", Value::from(agent.id.as_str()), agent)
            .await
    }

    async fn put_course(&self, course: &Course) -> Result<()> {
        self.upsert("course", Value::from(course.id.as_str()), course)
            .await
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        self.upsert("user", Value::from(user.id), user).await
    }
}

/// 选课仓储实现
#[derive(Clone)]
pub struct SurrealEnrollmentRepository {
    db: Surreal<Any>,
}

impl SurrealEnrollmentRepository {
    pub fn new(pool: &SurrealPool) -> Self {
        Self { db: pool.inner() }
    }
}

#[async_trait]
impl EnrollmentRepository for SurrealEnrollmentRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Enrollment>> {
        let mut rows: Vec<Enrollment> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM type::thing('enrollment', $id)")
            .bind(("id", id))
            .await?
            .take(0)?;
        Ok(rows.pop())
    }

    async fn list(&self) -> Result<Vec<Enrollment>> {
        let rows: Vec<Enrollment> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM enrollment ORDER BY id ASC")
            .await?
            .take(0)?;
        Ok(rows)
    }

    async fn create(&self, enrollment: &Enrollment) -> Result<Enrollment> {
        let data = content_without_id(enrollment)?;
        self.db
            .query("CREATE type::thing('enrollment', $id) CONTENT $data RETURN NONE")
            .bind(("id", enrollment.id))
            .bind(("data", data))
            .await?
            .check()?;

        self.get_by_id(enrollment.id).await?.ok_or_else(|| {
            AppError::Database(format!("Failed to create enrollment: {}", enrollment.id))
        })
    }
}

/// 聊天记录仓储实现
///
/// `seq` 是进程内单调递增的微秒时间戳，保证同一毫秒内写入的两条记录仍然有序。
#[derive(Clone)]
pub struct SurrealChatLogRepository {
    db: Surreal<Any>,
    last_seq: Arc<AtomicI64>,
}

impl SurrealChatLogRepository {
    pub fn new(pool: &SurrealPool) -> Self {
        Self {
            db: pool.inner(),
            last_seq: Arc::new(AtomicI64::new(0)),
        }
    }

    fn next_seq(&self, log: &ChatLog) -> i64 {
        let now = log.timestamp.timestamp_micros();
        let previous = self
            .last_seq
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }

    /// 写入用的记录内容，附带排序用的 `seq`
    fn log_content(&self, log: &ChatLog) -> Result<Value> {
        let mut data = content_without_id(log)?;
        if let Some(object) = data.as_object_mut() {
            object.insert("seq".into(), Value::from(self.next_seq(log)));
        }
        Ok(data)
    }
}

#[async_trait]
impl ChatLogRepository for SurrealChatLogRepository {
    async fn append(&self, log: &ChatLog) -> Result<()> {
        let data = self.log_content(log)?;
        self.db
            .query("CREATE type::thing('chat_log', $id) CONTENT $data RETURN NONE")
            .bind(("id", log.id.clone()))
            .bind(("data", data))
            .await?
            .check()?;
        Ok(())
    }

    async fn recent(&self, enrollment_id: i64, limit: usize) -> Result<Vec<ChatLog>> {
        let mut rows: Vec<ChatLog> = self
            .db
            .query(
                "SELECT *, meta::id(id) AS id FROM chat_log \
                 WHERE enrollment_id = $enrollment_id \
                 ORDER BY seq DESC LIMIT $limit",
            )
            .bind(("enrollment_id", enrollment_id))
            .bind(("limit", limit as i64))
            .await?
            .take(0)?;

        rows.reverse();
        Ok(rows)
    }
}

/// 比较失败时由事务抛出，整轮回滚
const ADVANCE_STATEMENTS: &str = "LET $moved = (UPDATE type::thing('enrollment', $enrollment_id) \
     SET current_module_index = $next \
     WHERE current_module_index = $expected \
     RETURN VALUE current_module_index);\n\
     IF array::len($moved) = 0 { THROW 'module index changed concurrently' };\n";

/// 聊天轮次仓储实现
///
/// 模块推进和聊天记录写在同一个 `BEGIN TRANSACTION ... COMMIT TRANSACTION` 查询里。
#[derive(Clone)]
pub struct SurrealChatTurnRepository {
    db: Surreal<Any>,
    enrollments: SurrealEnrollmentRepository,
    chat_logs: SurrealChatLogRepository,
}

impl SurrealChatTurnRepository {
    pub fn new(
        pool: &SurrealPool,
        enrollments: SurrealEnrollmentRepository,
        chat_logs: SurrealChatLogRepository,
    ) -> Self {
        Self {
            db: pool.inner(),
            enrollments,
            chat_logs,
        }
    }
}

#[async_trait]
impl ChatTurnRepository for SurrealChatTurnRepository {
    async fn commit_turn(
        &self,
        enrollment_id: i64,
        advance: Option<ModuleAdvance>,
        logs: &[ChatLog],
    ) -> Result<bool> {
        let mut sql = String::from("BEGIN TRANSACTION;\n");
        if advance.is_some() {
            sql.push_str(ADVANCE_STATEMENTS);
        }
        for i in 0..logs.len() {
            sql.push_str(&format!(
                "CREATE type::thing('chat_log', $log_id_{i}) CONTENT $log_data_{i} RETURN NONE;\n"
            ));
        }
        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self.db.query(sql).bind(("enrollment_id", enrollment_id));
        if let Some(advance) = advance {
            query = query
                .bind(("expected", advance.expected))
                .bind(("next", advance.next));
        }
        for (i, log) in logs.iter().enumerate() {
            query = query
                .bind((format!("log_id_{i}"), log.id.clone()))
                .bind((format!("log_data_{i}"), self.chat_logs.log_content(log)?));
        }

        let committed = match query.await {
            Ok(response) => response.check().map(|_| ()),
            Err(e) => Err(e),
        };
        let Err(err) = committed else {
            return Ok(true);
        };

        // 事务已回滚；区分比较失败和真正的写入错误
        if let Some(advance) = advance {
            match self.enrollments.get_by_id(enrollment_id).await? {
                None => {
                    return Err(AppError::NotFound(format!(
                        "Enrollment not found: {}",
                        enrollment_id
                    )));
                }
                Some(current) if current.current_module_index != advance.expected => {
                    debug!(
                        enrollment_id,
                        expected = advance.expected,
                        current = current.current_module_index,
                        "Module advance lost the race"
                    );
                    return Ok(false);
                }
                Some(_) => {}
            }
        }

        warn!(enrollment_id, error = %err, "Chat turn rolled back");
        Err(err.into())
    }
}
