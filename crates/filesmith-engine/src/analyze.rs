//! Syntax validation and content compression.
//!
//! Both operations are read-only: validation reports problems without
//! touching the file, and compression returns the compressed content in
//! the result instead of writing it back.

use crate::read::read_existing;
use crate::{Engine, EngineResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static TRAILING_WS_REGEX: OnceLock<Regex> = OnceLock::new();
static EXCESS_BLANK_REGEX: OnceLock<Regex> = OnceLock::new();
static LINE_COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();
static SPACE_RUN_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();
static BLANK_LINE_REGEX: OnceLock<Regex> = OnceLock::new();

fn trailing_ws_regex() -> &'static Regex {
    TRAILING_WS_REGEX.get_or_init(|| {
        Regex::new(r"(?m)[ \t]+$")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn excess_blank_regex() -> &'static Regex {
    EXCESS_BLANK_REGEX.get_or_init(|| {
        Regex::new(r"\n{3,}").expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn line_comment_regex() -> &'static Regex {
    LINE_COMMENT_REGEX.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*//.*\n?")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn space_run_regex() -> &'static Regex {
    SPACE_RUN_REGEX.get_or_init(|| {
        Regex::new(r"(\S)[ \t]{2,}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn block_comment_regex() -> &'static Regex {
    BLOCK_COMMENT_REGEX.get_or_init(|| {
        Regex::new(r"(?s)/\*.*?\*/")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn blank_line_regex() -> &'static Regex {
    BLANK_LINE_REGEX.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*\n")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Validation verdict for one file.
#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Result of a syntax check.
#[derive(Debug, Serialize)]
pub struct ValidationOutcome {
    pub file_path: String,
    pub language: String,
    pub validation: Validation,
    pub file_size: usize,
    pub line_count: usize,
}

/// How hard to compress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Light,
    #[default]
    Medium,
    Aggressive,
}

/// Result of a compression pass. The file itself is never modified.
#[derive(Debug, Serialize)]
pub struct CompressionOutcome {
    pub file_path: String,
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_ratio: f64,
    pub level: CompressionLevel,
    pub compressed_content: String,
}

/// Bracket-balance scan for brace languages.
///
/// Tracks strings, escapes, and comments so brackets inside them are
/// ignored. Single-line strings reset at end of line; template literals
/// span lines. With `rust_lifetimes` set, a quote directly before an
/// identifier that is not closed after one character is read as a
/// lifetime instead of a char literal. Heuristic only; it reports bracket
/// problems, not full syntax errors.
fn check_brackets(content: &str, rust_lifetimes: bool) -> Vec<String> {
    let mut errors = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut in_string: Option<char> = None;
    let mut in_block_comment = false;
    let mut in_line_comment = false;
    let mut escaped = false;
    let mut line = 1usize;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
            in_line_comment = false;
            escaped = false;
            if in_string != Some('`') {
                in_string = None;
            }
            continue;
        }
        if in_line_comment {
            continue;
        }
        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '/' if chars.peek() == Some(&'/') => {
                chars.next();
                in_line_comment = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                in_block_comment = true;
            }
            '\'' if rust_lifetimes => {
                let mut ahead = chars.clone();
                let first = ahead.next();
                let second = ahead.next();
                let is_lifetime = matches!(first, Some(f) if f == '_' || f.is_alphabetic())
                    && second != Some('\'');
                if !is_lifetime {
                    in_string = Some('\'');
                }
            }
            '"' | '\'' | '`' => in_string = Some(c),
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, open_line)) => errors.push(format!(
                        "mismatched '{c}' on line {line}: '{open}' from line {open_line} is still open"
                    )),
                    None => errors.push(format!("unmatched '{c}' on line {line}")),
                }
            }
            _ => {}
        }
    }

    for (open, open_line) in stack {
        errors.push(format!("unclosed '{open}' opened on line {open_line}"));
    }
    errors
}

pub(crate) fn compress(content: &str, level: CompressionLevel) -> String {
    let mut compressed = content.to_string();
    match level {
        CompressionLevel::Light => {
            compressed = trailing_ws_regex().replace_all(&compressed, "").into_owned();
            compressed = excess_blank_regex()
                .replace_all(&compressed, "\n\n")
                .into_owned();
        }
        CompressionLevel::Medium => {
            compressed = line_comment_regex().replace_all(&compressed, "").into_owned();
            compressed = trailing_ws_regex().replace_all(&compressed, "").into_owned();
            compressed = space_run_regex()
                .replace_all(&compressed, "${1} ")
                .into_owned();
            compressed = excess_blank_regex()
                .replace_all(&compressed, "\n\n")
                .into_owned();
        }
        CompressionLevel::Aggressive => {
            compressed = block_comment_regex()
                .replace_all(&compressed, "")
                .into_owned();
            compressed = line_comment_regex().replace_all(&compressed, "").into_owned();
            compressed = trailing_ws_regex().replace_all(&compressed, "").into_owned();
            compressed = space_run_regex()
                .replace_all(&compressed, "${1} ")
                .into_owned();
            compressed = blank_line_regex().replace_all(&compressed, "").into_owned();
        }
    }
    compressed
}

impl Engine {
    /// Extension-driven syntax check: JSON parses with serde, brace
    /// languages get the bracket-balance scan, anything else is reported
    /// valid with no checks applied.
    pub async fn validate_syntax(&self, file_path: &str) -> EngineResult<ValidationOutcome> {
        let path = self.resolver.resolve(file_path);
        let content = read_existing(&path).await?;

        let language = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let errors = match language.as_str() {
            "json" => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(_) => Vec::new(),
                Err(e) => vec![e.to_string()],
            },
            "js" | "ts" | "jsx" | "tsx" => check_brackets(&content, false),
            "rs" => check_brackets(&content, true),
            _ => Vec::new(),
        };

        Ok(ValidationOutcome {
            file_path: path.display().to_string(),
            language,
            validation: Validation {
                is_valid: errors.is_empty(),
                errors,
            },
            file_size: content.len(),
            line_count: content.split('\n').count(),
        })
    }

    /// Compress `file_path` at the given level and return the result
    /// without writing anything back.
    pub async fn compress_content(
        &self,
        file_path: &str,
        level: CompressionLevel,
    ) -> EngineResult<CompressionOutcome> {
        let path = self.resolver.resolve(file_path);
        let content = read_existing(&path).await?;

        let compressed = compress(&content, level);
        let compression_ratio = if content.is_empty() {
            0.0
        } else {
            let ratio = (1.0 - compressed.len() as f64 / content.len() as f64) * 100.0;
            (ratio * 100.0).round() / 100.0
        };

        Ok(CompressionOutcome {
            file_path: path.display().to_string(),
            original_size: content.len(),
            compressed_size: compressed.len(),
            compression_ratio,
            level,
            compressed_content: compressed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_engine, write_file};

    #[tokio::test]
    async fn test_validate_json() {
        let (dir, engine) = test_engine();
        write_file(&dir, "good.json", r#"{"a": [1, 2]}"#).await;
        write_file(&dir, "bad.json", r#"{"a": [1, 2}"#).await;

        let good = engine.validate_syntax("good.json").await.unwrap();
        assert!(good.validation.is_valid);
        assert_eq!(good.language, "json");

        let bad = engine.validate_syntax("bad.json").await.unwrap();
        assert!(!bad.validation.is_valid);
        assert_eq!(bad.validation.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_reports_unclosed_brace() {
        let (dir, engine) = test_engine();
        write_file(&dir, "bad.js", "function f() {\n  return 1;\n").await;

        let outcome = engine.validate_syntax("bad.js").await.unwrap();
        assert!(!outcome.validation.is_valid);
        assert!(outcome.validation.errors[0].contains("unclosed '{'"));
        assert!(outcome.validation.errors[0].contains("line 1"));
    }

    #[tokio::test]
    async fn test_validate_ignores_brackets_in_strings_and_comments() {
        let (dir, engine) = test_engine();
        let source = "const s = \"}\";\nconst t = '{{{';\n// ) comment\n/* ] */\nconst u = `\n}`;\n";
        write_file(&dir, "ok.js", source).await;

        let outcome = engine.validate_syntax("ok.js").await.unwrap();
        assert!(outcome.validation.is_valid, "{:?}", outcome.validation.errors);
    }

    #[tokio::test]
    async fn test_validate_rust_lifetimes_are_not_strings() {
        let (dir, engine) = test_engine();
        let source = "fn first<'a>(x: &'a str) -> &'a str {\n    &x[..1]\n}\n";
        write_file(&dir, "lib.rs", source).await;

        let outcome = engine.validate_syntax("lib.rs").await.unwrap();
        assert!(outcome.validation.is_valid, "{:?}", outcome.validation.errors);
    }

    #[tokio::test]
    async fn test_validate_reports_mismatch() {
        let (dir, engine) = test_engine();
        write_file(&dir, "bad.js", "const a = (1 + [2);\n").await;

        let outcome = engine.validate_syntax("bad.js").await.unwrap();
        assert!(!outcome.validation.is_valid);
        assert!(outcome.validation.errors[0].contains("mismatched ')'"));
    }

    #[tokio::test]
    async fn test_validate_unknown_extension_passes() {
        let (dir, engine) = test_engine();
        write_file(&dir, "notes.md", "# {{{ unbalanced").await;

        let outcome = engine.validate_syntax("notes.md").await.unwrap();
        assert!(outcome.validation.is_valid);
        assert!(outcome.validation.errors.is_empty());
    }

    #[test]
    fn test_compress_light_trims_and_collapses() {
        let compressed = compress("a  \n\n\n\nb\n", CompressionLevel::Light);
        assert_eq!(compressed, "a\n\nb\n");
    }

    #[test]
    fn test_compress_medium_drops_line_comments() {
        let source = "// header\nlet x = 1;\n\nlet y  =  2;  \n";
        let compressed = compress(source, CompressionLevel::Medium);
        assert_eq!(compressed, "let x = 1;\n\nlet y = 2;\n");
    }

    #[test]
    fn test_compress_aggressive_drops_blocks_and_blanks() {
        let source = "a\n/* one\ntwo */\n\nb\n";
        let compressed = compress(source, CompressionLevel::Aggressive);
        assert_eq!(compressed, "a\nb\n");
    }

    #[tokio::test]
    async fn test_compress_reports_ratio_and_never_writes() {
        let (dir, engine) = test_engine();
        let source = "code();  \n\n\n\ncode();\n";
        let path = write_file(&dir, "file.js", source).await;

        let outcome = engine
            .compress_content("file.js", CompressionLevel::Light)
            .await
            .unwrap();

        assert_eq!(outcome.original_size, source.len());
        assert!(outcome.compressed_size < outcome.original_size);
        assert!(outcome.compression_ratio > 0.0);

        let on_disk = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(on_disk, source);
    }

    #[tokio::test]
    async fn test_compress_incompressible_ratio_is_zero() {
        let (dir, engine) = test_engine();
        write_file(&dir, "file.js", "abc").await;

        let outcome = engine
            .compress_content("file.js", CompressionLevel::Medium)
            .await
            .unwrap();

        assert_eq!(outcome.compression_ratio, 0.0);
        assert_eq!(outcome.compressed_content, "abc");
    }

    #[test]
    fn test_compression_level_wire_names() {
        let level: CompressionLevel = serde_json::from_str("\"aggressive\"").unwrap();
        assert_eq!(level, CompressionLevel::Aggressive);
        assert_eq!(CompressionLevel::default(), CompressionLevel::Medium);
    }
}
