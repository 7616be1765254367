//! 聊天编排
//!
//! 一轮聊天：读取选课上下文 → 拼接提示词 → 调用 LLM 网关 → 识别完成标记 →
//! 推进模块指针。编排器只计算新状态，持久化由 [`ChatServiceImpl`] 负责。

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::{
    Agent, ChatLog, Course, Curriculum, CurriculumError, Enrollment, Module, Sender,
};
use crate::services::llm::{COMPLETION_MARKER, LlmGateway};
use crate::services::persona::{PersonaInstructions, PersonaRegistry};
use crate::storage::repository::{
    CatalogRepository, ChatLogRepository, ChatTurnRepository, EnrollmentRepository, ModuleAdvance,
};

/// 网关不可用时返回给学生的回复
pub const APOLOGY_REPLY: &str =
    "Sorry, I'm having trouble connecting to my brain right now. Please try again in a moment.";

/// 工作区更新：通知前端解锁了下一个模块
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WorkspaceUpdate {
    pub status: String,
    pub next_module: String,
    pub objective: String,
}

impl WorkspaceUpdate {
    pub fn unlocked(next: &Module) -> Self {
        Self {
            status: "unlocked".to_string(),
            next_module: next.title.clone(),
            objective: next.objective.clone(),
        }
    }
}

/// 一轮聊天的计算结果（尚未持久化）
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// 可能已推进下标的选课记录
    pub enrollment: Enrollment,
    /// 去掉完成标记后的回复
    pub reply: String,
    pub workspace_update: Option<WorkspaceUpdate>,
    /// 本轮开始时的模块下标
    pub previous_module_index: i64,
}

impl ChatTurn {
    /// 本轮是否推进了模块
    pub fn advanced(&self) -> bool {
        self.enrollment.current_module_index != self.previous_module_index
    }
}

/// 已校验的选课上下文
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub enrollment: Enrollment,
    pub course: Course,
    pub agent: Agent,
    pub module_index: usize,
    pub current_module: Module,
}

fn integrity(err: CurriculumError) -> AppError {
    AppError::DataIntegrity(err.to_string())
}

/// 拼接系统提示词
///
/// 顺序固定：persona 指令、导师身份、核心人格、课程、当前模块、学生信息、指令块。
pub fn build_system_prompt(
    persona: &PersonaInstructions,
    agent: &Agent,
    course: &Course,
    module: &Module,
    enrollment: &Enrollment,
) -> String {
    format!(
        "{persona}\n\n\
         You are {name}.\n\
         Your Core Personality: {core}\n\n\
         CURRENT CONTEXT:\n\
         Student is working on Course: {course}\n\
         Current Module: {title}\n\
         Objective: {objective}\n\
         Student Facts: {facts}\n\n\
         INSTRUCTIONS:\n\
         - Keep responses short (under 3 sentences) unless explaining a complex concept.\n\
         - If the student completes the objective, add {marker} to your response.\n",
        persona = persona.text,
        name = agent.name,
        core = agent.system_prompt_core,
        course = course.title,
        title = module.title,
        objective = module.objective,
        facts = enrollment.facts_for_prompt(),
        marker = COMPLETION_MARKER,
    )
}

/// 处理回复中的完成标记
///
/// 有下一个模块时推进一格并生成工作区更新；已在最后一个模块时不做任何改动。
/// 回复中所有标记都会被去掉，所有回复都去掉末尾空白。
pub fn apply_completion(
    reply: &str,
    enrollment: &mut Enrollment,
    curriculum: &Curriculum<'_>,
) -> Result<(String, Option<WorkspaceUpdate>)> {
    let mut update = None;
    let next_index = enrollment.current_module_index + 1;
    if reply.contains(COMPLETION_MARKER)
        && next_index >= 0
        && (next_index as usize) < curriculum.len()
    {
        let next = curriculum.module(next_index as usize).map_err(integrity)?;
        update = Some(WorkspaceUpdate::unlocked(&next));
        enrollment.current_module_index = next_index;
    }

    let cleaned = reply.replace(COMPLETION_MARKER, "").trim_end().to_string();
    Ok((cleaned, update))
}

/// 聊天编排器
pub struct ChatOrchestrator {
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    personas: Arc<PersonaRegistry>,
    gateway: Arc<dyn LlmGateway>,
}

impl ChatOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        personas: Arc<PersonaRegistry>,
        gateway: Arc<dyn LlmGateway>,
    ) -> Self {
        Self {
            catalog,
            enrollments,
            personas,
            gateway,
        }
    }

    /// 读取并校验选课上下文
    pub async fn load_context(&self, enrollment_id: i64) -> Result<ChatContext> {
        let enrollment = self
            .enrollments
            .get_by_id(enrollment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Enrollment not found: {}", enrollment_id)))?;

        let course = match enrollment.course_id.as_deref() {
            Some(course_id) => self.catalog.get_course(course_id).await?,
            None => None,
        }
        .ok_or_else(|| AppError::DataIntegrity("Course data missing".to_string()))?;

        let agent = match course.agent_id.as_deref() {
            Some(agent_id) => self.catalog.get_agent(agent_id).await?,
            None => None,
        }
        .ok_or_else(|| AppError::DataIntegrity("Agent data missing".to_string()))?;

        let curriculum = Curriculum::parse(&course.curriculum).map_err(integrity)?;
        let module_index = curriculum
            .check_index(enrollment.current_module_index)
            .map_err(integrity)?;
        let current_module = curriculum.module(module_index).map_err(integrity)?;

        Ok(ChatContext {
            enrollment,
            course,
            agent,
            module_index,
            current_module,
        })
    }

    /// 处理一轮聊天
    pub async fn handle_chat(&self, enrollment_id: i64, user_message: &str) -> Result<ChatTurn> {
        let ChatContext {
            mut enrollment,
            course,
            agent,
            module_index,
            current_module,
        } = self.load_context(enrollment_id).await?;

        let persona = self.personas.resolve(&agent.id);
        if persona.is_empty() {
            debug!(agent_id = %agent.id, "No persona instructions for agent");
        }

        let system_prompt =
            build_system_prompt(&persona, &agent, &course, &current_module, &enrollment);

        let raw_reply = match self
            .gateway
            .complete(&system_prompt, user_message, &current_module)
            .await
        {
            Ok(text) => text,
            Err(AppError::Gateway(reason)) => {
                warn!(enrollment_id, %reason, "Generation failed, replying with apology");
                APOLOGY_REPLY.to_string()
            }
            Err(e) => return Err(e),
        };

        let previous_module_index = enrollment.current_module_index;
        let curriculum = Curriculum::parse(&course.curriculum).map_err(integrity)?;
        let (reply, workspace_update) =
            apply_completion(&raw_reply, &mut enrollment, &curriculum)?;

        if let Some(update) = &workspace_update {
            info!(
                enrollment_id,
                from = module_index,
                next_module = %update.next_module,
                "Module completed"
            );
        }

        Ok(ChatTurn {
            enrollment,
            reply,
            workspace_update,
            previous_module_index,
        })
    }
}

/// 聊天结果（已持久化）
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub enrollment: Enrollment,
    pub reply: String,
    pub workspace_update: Option<WorkspaceUpdate>,
}

/// 聊天服务 trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// 处理一轮聊天并记录学生消息和导师回复
    async fn chat(&self, enrollment_id: i64, message: &str) -> Result<ChatOutcome>;

    /// 最近的聊天记录（时间升序）
    async fn history(&self, enrollment_id: i64, limit: usize) -> Result<Vec<ChatLog>>;
}

/// 聊天服务实现
pub struct ChatServiceImpl {
    orchestrator: ChatOrchestrator,
    enrollments: Arc<dyn EnrollmentRepository>,
    chat_logs: Arc<dyn ChatLogRepository>,
    turns: Arc<dyn ChatTurnRepository>,
}

impl ChatServiceImpl {
    pub fn new(
        orchestrator: ChatOrchestrator,
        enrollments: Arc<dyn EnrollmentRepository>,
        chat_logs: Arc<dyn ChatLogRepository>,
        turns: Arc<dyn ChatTurnRepository>,
    ) -> Self {
        Self {
            orchestrator,
            enrollments,
            chat_logs,
            turns,
        }
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn chat(&self, enrollment_id: i64, message: &str) -> Result<ChatOutcome> {
        let turn = self.orchestrator.handle_chat(enrollment_id, message).await?;

        let advance = turn.advanced().then(|| ModuleAdvance {
            expected: turn.previous_module_index,
            next: turn.enrollment.current_module_index,
        });
        let logs = [
            ChatLog::new(turn.enrollment.id, Sender::Student, message),
            ChatLog::new(turn.enrollment.id, Sender::Agent, turn.reply.as_str()),
        ];

        let committed = self
            .turns
            .commit_turn(turn.enrollment.id, advance, &logs)
            .await?;
        if !committed {
            return Err(AppError::Conflict(format!(
                "Enrollment {} progressed concurrently, please retry",
                turn.enrollment.id
            )));
        }

        Ok(ChatOutcome {
            enrollment: turn.enrollment,
            reply: turn.reply,
            workspace_update: turn.workspace_update,
        })
    }

    async fn history(&self, enrollment_id: i64, limit: usize) -> Result<Vec<ChatLog>> {
        self.enrollments
            .get_by_id(enrollment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Enrollment not found: {}", enrollment_id)))?;

        self.chat_logs.recent(enrollment_id, limit).await
    }
}

/// 创建聊天服务
pub fn create_chat_service(
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    chat_logs: Arc<dyn ChatLogRepository>,
    turns: Arc<dyn ChatTurnRepository>,
    personas: Arc<PersonaRegistry>,
    gateway: Arc<dyn LlmGateway>,
) -> Box<dyn ChatService> {
    let orchestrator = ChatOrchestrator::new(catalog, enrollments.clone(), personas, gateway);
    Box::new(ChatServiceImpl::new(
        orchestrator,
        enrollments,
        chat_logs,
        turns,
    ))
}
