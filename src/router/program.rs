//! 程序表：配置中的浏览器/程序及其选择逻辑

use std::fmt;
use tracing::warn;

use crate::config::{ConfigFile, ProgramEntry};
use crate::error::{UrouteError, UrouteResult};

/// 可路由的目标程序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub id: String,
    pub name: String,
    pub command: String,
    pub icon: Option<String>,
}

impl From<&ProgramEntry> for Program {
    fn from(entry: &ProgramEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            command: entry.command.clone(),
            icon: entry.icon.clone(),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// 程序表，保持配置文件中的顺序
#[derive(Debug, Clone, Default)]
pub struct ProgramTable {
    programs: Vec<Program>,
    default_program: Option<String>,
}

impl ProgramTable {
    pub fn new(programs: Vec<Program>, default_program: Option<String>) -> Self {
        Self { programs, default_program }
    }

    /// 从配置文件构建；重复ID告警，后者覆盖前者并保留前者位置
    pub fn from_config(file: &ConfigFile) -> Self {
        let mut programs: Vec<Program> = Vec::with_capacity(file.programs.len());
        for entry in &file.programs {
            let program = Program::from(entry);
            match programs.iter_mut().find(|p| p.id == program.id) {
                Some(existing) => {
                    warn!("程序配置重复：{}", program.id);
                    *existing = program;
                }
                None => programs.push(program),
            }
        }

        Self::new(programs, file.main.default_program.clone())
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn default_program(&self) -> Option<&str> {
        self.default_program.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Program> {
        self.programs.iter().find(|p| p.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// 选择程序：优先指定程序，其次默认程序，最后取第一个
    pub fn select(&self, preferred: Option<&str>) -> UrouteResult<&Program> {
        if self.programs.is_empty() {
            return Err(UrouteError::NoPrograms);
        }

        if let Some(id) = preferred {
            match self.get(id) {
                Some(program) => return Ok(program),
                None => warn!("未配置该程序：{}", id),
            }
        }

        match self.default_program.as_deref() {
            Some(id) if !id.is_empty() => self
                .get(id)
                .ok_or_else(|| UrouteError::UnknownProgram(id.to_string())),
            _ => Ok(&self.programs[0]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(default_program: Option<&str>) -> ProgramTable {
        let file = ConfigFile::from_toml(
            r#"
            [[program]]
            id = "ff"
            name = "Firefox"
            command = "firefox"

            [[program]]
            id = "cr"
            name = "Chromium"
            command = "chromium"
            "#,
        )
        .unwrap();
        let mut table = ProgramTable::from_config(&file);
        table.default_program = default_program.map(str::to_string);
        table
    }

    #[test]
    fn test_select_preferred_then_default_then_first() {
        assert_eq!(table(Some("cr")).select(Some("ff")).unwrap().id, "ff");
        assert_eq!(table(Some("cr")).select(None).unwrap().id, "cr");
        assert_eq!(table(None).select(None).unwrap().id, "ff");
    }

    #[test]
    fn test_unknown_preferred_falls_back() {
        assert_eq!(table(Some("cr")).select(Some("nope")).unwrap().id, "cr");
        assert_eq!(table(None).select(Some("nope")).unwrap().id, "ff");
    }

    #[test]
    fn test_unknown_default_is_error() {
        let err = table(Some("gone")).select(None).unwrap_err();
        assert!(matches!(err, UrouteError::UnknownProgram(id) if id == "gone"));
    }

    #[test]
    fn test_no_programs() {
        let err = ProgramTable::default().select(Some("ff")).unwrap_err();
        assert!(matches!(err, UrouteError::NoPrograms));
    }

    #[test]
    fn test_duplicate_ids_keep_first_position() {
        let file = ConfigFile::from_toml(
            r#"
            [[program]]
            id = "ff"
            name = "Old"
            command = "firefox"

            [[program]]
            id = "cr"
            name = "Chromium"
            command = "chromium"

            [[program]]
            id = "ff"
            name = "New"
            command = "firefox --new-window"
            "#,
        )
        .unwrap();

        let table = ProgramTable::from_config(&file);
        assert_eq!(table.programs().len(), 2);
        assert_eq!(table.programs()[0].name, "New");
        assert_eq!(table.programs()[1].id, "cr");
    }
}
