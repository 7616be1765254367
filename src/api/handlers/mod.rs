//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod chat_handler;
pub mod enrollment_handler;
pub mod upload_handler;

pub use chat_handler::*;
pub use enrollment_handler::*;
pub use upload_handler::*;
