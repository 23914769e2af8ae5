//! Line-by-line comparison of two files.

use crate::read::read_existing;
use crate::{Engine, EngineResult};
use serde::Serialize;

/// Cap on reported entries; the full count is still returned.
const MAX_DIFF_ENTRIES: usize = 100;

/// How a line differs between the two files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    Added,
    Deleted,
    Modified,
}

/// One differing line.
#[derive(Debug, Clone, Serialize)]
pub struct LineDifference {
    pub line_number: usize,
    pub left: String,
    pub right: String,
    #[serde(rename = "type")]
    pub kind: DifferenceKind,
}

/// Result of a two-file comparison.
#[derive(Debug, Serialize)]
pub struct DiffOutcome {
    pub file_path: String,
    pub file_path_2: String,
    pub total_differences: usize,
    pub differences: Vec<LineDifference>,
    pub identical: bool,
    pub file_size: usize,
    pub file_size_2: usize,
    pub line_count: usize,
    pub line_count_2: usize,
}

impl Engine {
    /// Compare two files line by line.
    ///
    /// An empty side classifies the entry: no left line means the right
    /// file added one, no right line means it was deleted, anything else
    /// is a modification. At most the first 100 entries are reported;
    /// `total_differences` always carries the full count.
    pub async fn generate_diff(
        &self,
        file_path: &str,
        file_path_2: &str,
    ) -> EngineResult<DiffOutcome> {
        let left_path = self.resolver.resolve(file_path);
        let right_path = self.resolver.resolve(file_path_2);

        let left_content = read_existing(&left_path).await?;
        let right_content = read_existing(&right_path).await?;

        let left_lines: Vec<&str> = left_content.split('\n').collect();
        let right_lines: Vec<&str> = right_content.split('\n').collect();
        let max_lines = left_lines.len().max(right_lines.len());

        let mut differences = Vec::new();
        for i in 0..max_lines {
            let left = left_lines.get(i).copied().unwrap_or("");
            let right = right_lines.get(i).copied().unwrap_or("");
            if left == right {
                continue;
            }
            let kind = if left.is_empty() {
                DifferenceKind::Added
            } else if right.is_empty() {
                DifferenceKind::Deleted
            } else {
                DifferenceKind::Modified
            };
            differences.push(LineDifference {
                line_number: i + 1,
                left: left.to_string(),
                right: right.to_string(),
                kind,
            });
        }

        let total_differences = differences.len();
        differences.truncate(MAX_DIFF_ENTRIES);

        Ok(DiffOutcome {
            file_path: left_path.display().to_string(),
            file_path_2: right_path.display().to_string(),
            total_differences,
            differences,
            identical: total_differences == 0,
            file_size: left_content.len(),
            file_size_2: right_content.len(),
            line_count: left_lines.len(),
            line_count_2: right_lines.len(),
        })
    }
}
