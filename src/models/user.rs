use serde::{Deserialize, Serialize};

/// 用户角色
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Parent,
    Admin,
}

/// 用户实体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
}

impl User {
    /// 创建学生用户
    pub fn student(id: i64, email: &str, display_name: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            display_name: display_name.to_string(),
            role: UserRole::Student,
        }
    }
}
