//! Homegrown - AI 辅导后端
//!
//! 每门课程由一位带有固定人格的 AI 导师授课。学生与导师聊天，
//! 导师判定当前模块的目标已达成时，课程进度自动推进到下一个模块。

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
