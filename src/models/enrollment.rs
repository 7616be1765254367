use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 选课记录
///
/// 记录学生在一门课程中的进度。`current_module_index` 只会被聊天编排器
/// 逐一推进，不会回退，也不会越过最后一个模块。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    /// 选课标识
    pub id: i64,
    /// 学生
    pub student_id: Option<i64>,
    /// 课程
    pub course_id: Option<String>,
    /// 当前模块下标（从 0 开始）
    pub current_module_index: i64,
    /// 学生信息累积（预留扩展，目前只用于拼接提示词）
    #[serde(default)]
    pub student_facts: Map<String, Value>,
}

impl Enrollment {
    /// 创建新选课记录，从第一个模块开始
    pub fn new(id: i64, student_id: i64, course_id: &str) -> Self {
        Self {
            id,
            student_id: Some(student_id),
            course_id: Some(course_id.to_string()),
            current_module_index: 0,
            student_facts: Map::new(),
        }
    }

    /// 学生信息的提示词表示
    pub fn facts_for_prompt(&self) -> String {
        Value::Object(self.student_facts.clone()).to_string()
    }
}
