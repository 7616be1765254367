//! 导师 Persona 注册表
//!
//! 两级查找：导师 ID → persona ID → 指令文本。进程启动时构建，之后只读，
//! 以 `Arc<PersonaRegistry>` 注入到聊天编排器。

use figment::{
    Figment,
    providers::{Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// 导师 persona
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub id: String,
    pub display_name: String,
    pub system_instructions: String,
}

/// 解析结果；找不到 persona 时为空指令，而不是错误
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonaInstructions {
    pub persona_id: Option<String>,
    pub display_name: Option<String>,
    pub text: String,
}

impl PersonaInstructions {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// persona 定义文件格式
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonaTable {
    pub personas: Vec<Persona>,
    /// 导师 ID → persona ID
    pub agents: HashMap<String, String>,
}

/// Persona 注册表
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: HashMap<String, Persona>,
    agent_to_persona: HashMap<String, String>,
}

impl PersonaRegistry {
    /// 空注册表
    pub fn empty() -> Self {
        Self::default()
    }

    /// 内置的两位导师
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(
            Persona {
                id: "daisy_dollars1".into(),
                display_name: "Daisy Dollars-Personal Finance 101".into(),
                system_instructions: include_str!("../../assets/personas/daisy_dollars1.md")
                    .into(),
            },
            &["daisy_dollars"],
        );
        registry.insert(
            Persona {
                id: "tera_byte1".into(),
                display_name: "Tera Byte-HTML Hero: Your First Website in an Hour!".into(),
                system_instructions: include_str!("../../assets/personas/tera_byte1.md").into(),
            },
            &["tera_byte"],
        );
        registry
    }

    /// 内置表加上可选的定义文件，文件中的同名条目覆盖内置条目
    pub fn load(persona_file: Option<&Path>) -> Result<Self> {
        let mut registry = Self::builtin();
        if let Some(path) = persona_file {
            let table: PersonaTable = Figment::new().merge(Toml::file(path)).extract()?;
            info!(
                path = %path.display(),
                personas = table.personas.len(),
                "Loaded persona overrides"
            );
            registry.merge(table);
        }
        Ok(registry)
    }

    /// 合并定义表
    pub fn merge(&mut self, table: PersonaTable) {
        for persona in table.personas {
            self.personas.insert(persona.id.clone(), persona);
        }
        self.agent_to_persona.extend(table.agents);
    }

    fn insert(&mut self, persona: Persona, agent_ids: &[&str]) {
        for agent_id in agent_ids {
            self.agent_to_persona
                .insert(agent_id.to_string(), persona.id.clone());
        }
        self.personas.insert(persona.id.clone(), persona);
    }

    /// 根据 persona ID 获取
    pub fn get(&self, persona_id: &str) -> Option<&Persona> {
        self.personas.get(persona_id)
    }

    /// 根据导师 ID 获取
    pub fn persona_for_agent(&self, agent_id: &str) -> Option<&Persona> {
        self.agent_to_persona
            .get(agent_id)
            .and_then(|persona_id| self.get(persona_id))
    }

    /// 解析导师的指令文本，任一级缺失都返回空指令
    pub fn resolve(&self, agent_id: &str) -> PersonaInstructions {
        match self.persona_for_agent(agent_id) {
            Some(persona) => PersonaInstructions {
                persona_id: Some(persona.id.clone()),
                display_name: Some(persona.display_name.clone()),
                text: persona.system_instructions.clone(),
            },
            None => PersonaInstructions::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}
