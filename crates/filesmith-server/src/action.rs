//! Wire-level request types.

use filesmith_engine::{MultiFileOptions, NewContent, StructureFilter};
use serde::Deserialize;
use serde_json::Value;

/// One request line, tagged by `action`.
///
/// The action set is closed; a line naming anything else fails to
/// deserialize and is answered with an error envelope by the service.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Create a file, refusing to clobber unless `overwrite` is set.
    CreateFile {
        file_path: String,
        #[serde(default)]
        new_content: String,
        #[serde(default)]
        overwrite: bool,
    },

    /// Read a line range split into fixed-size chunks.
    ReadFileChunked {
        file_path: String,
        #[serde(default = "default_start_line")]
        start_line: usize,
        end_line: Option<usize>,
        chunk_size: Option<usize>,
    },

    /// Replace an inclusive line range with new content.
    ReplaceLines {
        file_path: String,
        start_line: usize,
        end_line: usize,
        new_content: NewContent,
        #[serde(default = "default_backup")]
        backup: bool,
    },

    /// Delete an inclusive line range.
    DeleteLines {
        file_path: String,
        start_line: usize,
        end_line: usize,
        #[serde(default = "default_backup")]
        backup: bool,
    },

    /// Insert content after `start_line`; 0 inserts at the top.
    InsertLines {
        file_path: String,
        start_line: usize,
        new_content: NewContent,
        #[serde(default = "default_backup")]
        backup: bool,
    },

    /// Scan for function/class/method/arrow declarations.
    FindCodeStructures {
        file_path: String,
        #[serde(default)]
        structure_type: StructureFilter,
    },

    /// Substring or regex find-and-replace across the whole file.
    FindAndReplace {
        file_path: String,
        search_pattern: String,
        replacement: String,
        #[serde(default)]
        use_regex: bool,
        #[serde(default = "default_backup")]
        backup: bool,
    },

    /// Line-by-line comparison of two files.
    GenerateDiff {
        file_path: String,
        file_path_2: String,
    },

    /// Run a list of filesystem operations, one result per item.
    BatchOperations { operations: Vec<Value> },

    /// Apply one read-only operation to many files.
    ProcessMultipleFiles {
        file_paths: Vec<String>,
        operation_type: String,
        #[serde(default)]
        options: MultiFileOptions,
    },

    /// Restore the pre-mutation snapshot of a recorded operation.
    RollbackOperation { operation_id: String },

    /// History stats, collaborator availability, cleanup policy.
    GetPerformanceStats,

    /// Timed read + embedding create + top-3 similar in one call.
    ProcessFileComplete { file_path: String },

    /// Create an embedding unless one already exists (or `force`).
    SmartCreateEmbedding {
        file_path: String,
        #[serde(default)]
        force: bool,
    },

    /// Sidecar-index membership check, no collaborator round trip.
    HasEmbedding { file_path: String },

    /// Embedding sidecar cache statistics.
    GetEmbeddingCacheInfo,

    /// Remove a file's embedding via the collaborator.
    CleanupFileEmbedding { file_path: String },
}

fn default_start_line() -> usize {
    1
}

fn default_backup() -> bool {
    true
}

impl Request {
    /// Action name as it appears on the wire, for logging.
    pub fn action_name(&self) -> &'static str {
        match self {
            Request::CreateFile { .. } => "create_file",
            Request::ReadFileChunked { .. } => "read_file_chunked",
            Request::ReplaceLines { .. } => "replace_lines",
            Request::DeleteLines { .. } => "delete_lines",
            Request::InsertLines { .. } => "insert_lines",
            Request::FindCodeStructures { .. } => "find_code_structures",
            Request::FindAndReplace { .. } => "find_and_replace",
            Request::GenerateDiff { .. } => "generate_diff",
            Request::BatchOperations { .. } => "batch_operations",
            Request::ProcessMultipleFiles { .. } => "process_multiple_files",
            Request::RollbackOperation { .. } => "rollback_operation",
            Request::GetPerformanceStats => "get_performance_stats",
            Request::ProcessFileComplete { .. } => "process_file_complete",
            Request::SmartCreateEmbedding { .. } => "smart_create_embedding",
            Request::HasEmbedding { .. } => "has_embedding",
            Request::GetEmbeddingCacheInfo => "get_embedding_cache_info",
            Request::CleanupFileEmbedding { .. } => "cleanup_file_embedding",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let request: Request = serde_json::from_value(json!({
            "action": "replace_lines",
            "file_path": "a.txt",
            "start_line": 1,
            "end_line": 2,
            "new_content": "x",
        }))
        .unwrap();

        let Request::ReplaceLines { backup, .. } = request else {
            panic!("wrong variant");
        };
        assert!(backup);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = serde_json::from_value::<Request>(json!({
            "action": "shred_file",
            "file_path": "a.txt",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown variant"));
    }

    #[test]
    fn test_missing_required_param_rejected() {
        let err = serde_json::from_value::<Request>(json!({
            "action": "delete_lines",
            "file_path": "a.txt",
            "start_line": 1,
        }))
        .unwrap_err();
        assert!(err.to_string().contains("end_line"));
    }

    #[test]
    fn test_new_content_accepts_string_and_lines() {
        let request: Request = serde_json::from_value(json!({
            "action": "insert_lines",
            "file_path": "a.txt",
            "start_line": 0,
            "new_content": ["one", "two"],
        }))
        .unwrap();
        assert_eq!(request.action_name(), "insert_lines");

        let request: Request = serde_json::from_value(json!({
            "action": "insert_lines",
            "file_path": "a.txt",
            "start_line": 0,
            "new_content": "one\ntwo",
        }))
        .unwrap();
        assert_eq!(request.action_name(), "insert_lines");
    }

    #[test]
    fn test_parameterless_actions() {
        let request: Request =
            serde_json::from_value(json!({ "action": "get_performance_stats" })).unwrap();
        assert_eq!(request.action_name(), "get_performance_stats");

        let request: Request =
            serde_json::from_value(json!({ "action": "get_embedding_cache_info" })).unwrap();
        assert_eq!(request.action_name(), "get_embedding_cache_info");
    }
}
