use crate::config::config::AppConfig;
use crate::services::chat::ChatService;
use crate::services::enrollment::EnrollmentService;
use crate::services::upload::UploadService;
use crate::storage::factory::Repositories;
use std::sync::Arc;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// Repository bundle (also used for readiness checks)
    pub repositories: Repositories,
    /// Chat orchestration and history
    pub chat_service: Arc<dyn ChatService>,
    /// Enrollment listing
    pub enrollment_service: Arc<dyn EnrollmentService>,
    /// File uploads
    pub upload_service: Arc<dyn UploadService>,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("repositories", &self.repositories)
            .field("chat_service", &"Arc<dyn ChatService>")
            .field("enrollment_service", &"Arc<dyn EnrollmentService>")
            .field("upload_service", &"Arc<dyn UploadService>")
            .field("api_prefix", &self.config.server.api_prefix)
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        repositories: Repositories,
        chat_service: Box<dyn ChatService>,
        enrollment_service: Box<dyn EnrollmentService>,
        upload_service: Box<dyn UploadService>,
        config: AppConfig,
    ) -> Self {
        Self {
            repositories,
            chat_service: Arc::from(chat_service),
            enrollment_service: Arc::from(enrollment_service),
            upload_service: Arc::from(upload_service),
            config: Arc::new(config),
        }
    }
}
