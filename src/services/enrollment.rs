//! 选课列表服务
//!
//! 列表接口对缺失或损坏的数据保持宽容：对应字段返回 `null`，不报错。

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::models::{Curriculum, Enrollment};
use crate::storage::repository::{CatalogRepository, EnrollmentRepository};

/// 选课摘要
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrollmentSummary {
    pub enrollment_id: i64,
    pub course_id: Option<String>,
    pub course_title: Option<String>,
    pub agent_name: Option<String>,
    pub current_module_index: i64,
    pub total_modules: Option<usize>,
    pub current_module_title: Option<String>,
    pub current_module_objective: Option<String>,
}

impl EnrollmentSummary {
    fn bare(enrollment: &Enrollment) -> Self {
        Self {
            enrollment_id: enrollment.id,
            course_id: enrollment.course_id.clone(),
            course_title: None,
            agent_name: None,
            current_module_index: enrollment.current_module_index,
            total_modules: None,
            current_module_title: None,
            current_module_objective: None,
        }
    }
}

/// 选课服务 trait
#[async_trait]
pub trait EnrollmentService: Send + Sync {
    /// 全部选课的摘要，按选课 ID 升序
    async fn list_summaries(&self) -> Result<Vec<EnrollmentSummary>>;
}

/// 选课服务实现
pub struct EnrollmentServiceImpl {
    enrollments: Arc<dyn EnrollmentRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl EnrollmentServiceImpl {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        catalog: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self {
            enrollments,
            catalog,
        }
    }

    async fn summarize(&self, enrollment: &Enrollment) -> Result<EnrollmentSummary> {
        let mut summary = EnrollmentSummary::bare(enrollment);

        let course = match enrollment.course_id.as_deref() {
            Some(course_id) => self.catalog.get_course(course_id).await?,
            None => None,
        };
        let Some(course) = course else {
            return Ok(summary);
        };
        summary.course_title = Some(course.title.clone());

        if let Some(agent_id) = course.agent_id.as_deref() {
            summary.agent_name = self
                .catalog
                .get_agent(agent_id)
                .await?
                .map(|agent| agent.name);
        }

        summary.total_modules = course.module_count();
        if let Ok(curriculum) = Curriculum::parse(&course.curriculum) {
            if let Ok(index) = usize::try_from(enrollment.current_module_index) {
                if let Some((title, objective)) = curriculum.module_lenient(index) {
                    summary.current_module_title = title;
                    summary.current_module_objective = objective;
                }
            }
        }

        Ok(summary)
    }
}

#[async_trait]
impl EnrollmentService for EnrollmentServiceImpl {
    async fn list_summaries(&self) -> Result<Vec<EnrollmentSummary>> {
        let enrollments = self.enrollments.list().await?;
        debug!(count = enrollments.len(), "Listing enrollments");

        let mut summaries = Vec::with_capacity(enrollments.len());
        for enrollment in &enrollments {
            summaries.push(self.summarize(enrollment).await?);
        }
        Ok(summaries)
    }
}

/// 创建选课服务
pub fn create_enrollment_service(
    enrollments: Arc<dyn EnrollmentRepository>,
    catalog: Arc<dyn CatalogRepository>,
) -> Box<dyn EnrollmentService> {
    Box::new(EnrollmentServiceImpl::new(enrollments, catalog))
}
