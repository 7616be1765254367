//! 服务模块

pub mod chat;
pub mod enrollment;
pub mod llm;
pub mod persona;
pub mod upload;

pub use chat::{
    ChatOrchestrator, ChatOutcome, ChatService, ChatTurn, WorkspaceUpdate, create_chat_service,
};
pub use enrollment::{EnrollmentService, EnrollmentSummary, create_enrollment_service};
pub use llm::{
    COMPLETION_MARKER, GeminiGateway, LlmGateway, OfflineGateway, create_llm_gateway,
};
pub use persona::{Persona, PersonaInstructions, PersonaRegistry};
pub use upload::{UploadReceipt, UploadService, UploadedFile, create_upload_service};
