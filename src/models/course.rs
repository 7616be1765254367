use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 课程实体
///
/// 课程大纲以原始 JSON 文档保存，读取时再解析，
/// 这样损坏的种子数据会在使用时以数据完整性错误暴露出来。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    /// 课程标识
    pub id: String,
    /// 课程标题
    pub title: String,
    /// 授课导师
    pub agent_id: Option<String>,
    /// 课程大纲文档，形如 `{"modules": [...]}`
    pub curriculum: Value,
}

impl Course {
    pub fn new(id: &str, title: &str, agent_id: &str, curriculum: Value) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            agent_id: Some(agent_id.to_string()),
            curriculum,
        }
    }

    /// 课程大纲中模块数组的原始长度，空数组为 `Some(0)`；不是数组时为 `None`
    pub fn module_count(&self) -> Option<usize> {
        self.curriculum
            .get("modules")
            .and_then(Value::as_array)
            .map(Vec::len)
    }
}

/// 课程单元
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub id: Option<String>,
    pub title: String,
    pub objective: String,
    pub success_criteria: Option<String>,
}

impl Module {
    pub fn new(title: &str, objective: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            objective: objective.to_string(),
            success_criteria: None,
        }
    }
}

/// 课程大纲解析错误
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CurriculumError {
    #[error("Course curriculum is invalid")]
    NotADocument,

    #[error("Course curriculum has no modules")]
    NoModules,

    #[error("Module {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Module index {index} is out of range (0..{len})")]
    OutOfRange { index: i64, len: usize },
}

/// 已校验的课程大纲视图
///
/// 只保证模块列表存在且非空；单个模块的字段在取用时校验。
#[derive(Debug, Clone, Copy)]
pub struct Curriculum<'a> {
    modules: &'a [Value],
}

impl<'a> Curriculum<'a> {
    /// 解析课程大纲文档
    pub fn parse(document: &'a Value) -> Result<Self, CurriculumError> {
        let object = document.as_object().ok_or(CurriculumError::NotADocument)?;
        let modules = object
            .get("modules")
            .and_then(Value::as_array)
            .filter(|m| !m.is_empty())
            .ok_or(CurriculumError::NoModules)?;

        Ok(Self { modules })
    }

    /// 模块数量
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// 校验选课进度指针，越界视为数据损坏，不做截断
    pub fn check_index(&self, index: i64) -> Result<usize, CurriculumError> {
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.modules.len())
            .ok_or(CurriculumError::OutOfRange {
                index,
                len: self.modules.len(),
            })
    }

    /// 取出指定位置的模块，标题和目标为必填字段
    pub fn module(&self, index: usize) -> Result<Module, CurriculumError> {
        let raw = self.modules.get(index).ok_or(CurriculumError::OutOfRange {
            index: index as i64,
            len: self.modules.len(),
        })?;

        let field = |name: &'static str| -> Option<String> {
            raw.get(name).and_then(Value::as_str).map(str::to_string)
        };

        Ok(Module {
            id: field("id"),
            title: field("title").ok_or(CurriculumError::MissingField {
                index,
                field: "title",
            })?,
            objective: field("objective").ok_or(CurriculumError::MissingField {
                index,
                field: "objective",
            })?,
            success_criteria: field("success_criteria"),
        })
    }

    /// 宽松读取模块，字段缺失时返回 `None`（用于列表展示）
    pub fn module_lenient(&self, index: usize) -> Option<(Option<String>, Option<String>)> {
        let raw = self.modules.get(index)?;
        let title = raw.get("title").and_then(Value::as_str).map(str::to_string);
        let objective = raw
            .get("objective")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some((title, objective))
    }
}
