//! Regex-based code structure scanning.

use crate::read::read_existing;
use crate::{Engine, EngineResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static FUNCTION_REGEX: OnceLock<Regex> = OnceLock::new();
static CLASS_REGEX: OnceLock<Regex> = OnceLock::new();
static METHOD_REGEX: OnceLock<Regex> = OnceLock::new();
static ARROW_REGEX: OnceLock<Regex> = OnceLock::new();

fn function_regex() -> &'static Regex {
    FUNCTION_REGEX.get_or_init(|| {
        Regex::new(r"^\s*function\s+(\w+)\s*\(")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn class_regex() -> &'static Regex {
    CLASS_REGEX.get_or_init(|| {
        Regex::new(r"^\s*class\s+(\w+)")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn method_regex() -> &'static Regex {
    METHOD_REGEX.get_or_init(|| {
        Regex::new(r"^\s*(\w+)\s*\([^)]*\)\s*\{")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn arrow_regex() -> &'static Regex {
    ARROW_REGEX.get_or_init(|| {
        Regex::new(r"^\s*const\s+(\w+)\s*=\s*\([^)]*\)\s*=>")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Filter selecting which structure kinds to report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureFilter {
    #[default]
    All,
    Function,
    Class,
    Method,
    Arrow,
}

impl StructureFilter {
    fn wants(self, kind: StructureKind) -> bool {
        match self {
            StructureFilter::All => true,
            StructureFilter::Function => kind == StructureKind::Function,
            StructureFilter::Class => kind == StructureKind::Class,
            StructureFilter::Method => kind == StructureKind::Method,
            StructureFilter::Arrow => kind == StructureKind::ArrowFunction,
        }
    }
}

/// Kind of a matched declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Function,
    Class,
    Method,
    ArrowFunction,
}

/// One matched declaration.
#[derive(Debug, Clone, Serialize)]
pub struct StructureMatch {
    #[serde(rename = "type")]
    pub kind: StructureKind,
    pub name: String,
    pub line: usize,
    pub content: String,
}

/// Result of a structure scan.
#[derive(Debug, Serialize)]
pub struct StructuresOutcome {
    pub file_path: String,
    pub structure_type: StructureFilter,
    pub total_structures: usize,
    pub structures: Vec<StructureMatch>,
    pub file_size: usize,
    pub total_lines: usize,
}

impl Engine {
    /// Scan `file_path` line by line for function, class, method, and
    /// arrow-function declarations.
    pub async fn find_code_structures(
        &self,
        file_path: &str,
        filter: StructureFilter,
    ) -> EngineResult<StructuresOutcome> {
        let path = self.resolver.resolve(file_path);
        let content = read_existing(&path).await?;

        let lines: Vec<&str> = content.split('\n').collect();
        let checks: [(StructureKind, &Regex); 4] = [
            (StructureKind::Function, function_regex()),
            (StructureKind::Class, class_regex()),
            (StructureKind::Method, method_regex()),
            (StructureKind::ArrowFunction, arrow_regex()),
        ];

        let mut structures = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            for &(kind, regex) in &checks {
                if !filter.wants(kind) {
                    continue;
                }
                if let Some(captures) = regex.captures(line) {
                    structures.push(StructureMatch {
                        kind,
                        name: captures.get(1).map_or("", |m| m.as_str()).to_string(),
                        line: i + 1,
                        content: line.trim().to_string(),
                    });
                }
            }
        }

        Ok(StructuresOutcome {
            file_path: path.display().to_string(),
            structure_type: filter,
            total_structures: structures.len(),
            structures,
            file_size: content.len(),
            total_lines: lines.len(),
        })
    }
}
