//! 核心数据模型模块
//!
//! 定义 Homegrown 的核心数据结构：Agent, Course, Enrollment, ChatLog, User。

pub mod agent;
pub mod chat_log;
pub mod course;
pub mod enrollment;
pub mod user;

pub use agent::*;
pub use chat_log::*;
pub use course::*;
pub use enrollment::*;
pub use user::*;
