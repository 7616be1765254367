//! 存储层模块
//!
//! 提供数据持久化服务，支持 SurrealDB 和进程内存储。

pub mod factory;
pub mod memory;
pub mod repository;
pub mod seed;
pub mod surrealdb;

pub use factory::{Repositories, StorageFactory, StorageInstance};
