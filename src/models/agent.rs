use serde::{Deserialize, Serialize};

/// 导师实体
///
/// 绑定到课程的 AI 角色，种子数据写入后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    /// 导师标识（如 `tera_byte`）
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 核心人格描述
    pub system_prompt_core: String,
}

impl Agent {
    pub fn new(id: &str, name: &str, system_prompt_core: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            system_prompt_core: system_prompt_core.to_string(),
        }
    }
}
