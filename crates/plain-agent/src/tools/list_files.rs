use std::path::PathBuf;

use plain_agent_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::fs::{list_files, run_blocking};

/// Input of [`ListFilesTool`].
#[derive(Deserialize, JsonSchema)]
pub struct ListFilesParameters {
    /// The directory to list.
    #[schemars(description = "The path of the directory to list.")]
    pub path: String,
}

/// A tool for listing the direct children of a directory.
pub struct ListFilesTool {
    root: PathBuf,
    input_schema: Value,
}

impl ListFilesTool {
    /// Creates a new list files tool resolving relative paths against
    /// `root`.
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        ListFilesTool {
            root: root.into(),
            input_schema: schema_for!(ListFilesParameters).to_value(),
        }
    }
}

impl Default for ListFilesTool {
    #[inline]
    fn default() -> Self {
        Self::new(".")
    }
}

impl Tool for ListFilesTool {
    type Input = ListFilesParameters;

    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        r#"
Lists the files and directories directly inside the given directory.
Directories are marked with [DIR] and files with [FILE]."#
    }

    fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    fn execute(
        &self,
        input: ListFilesParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let root = self.root.clone();
        run_blocking(move || list_files(&root, &input.path))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[tokio::test]
    async fn test_list_files_tool() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("Cargo.toml"), "").unwrap();

        let tool = ListFilesTool::new(dir.path());
        let result = tool
            .execute(ListFilesParameters {
                path: ".".to_owned(),
            })
            .await;
        assert_eq!(
            result.unwrap(),
            "Files in directory .:\n[FILE] Cargo.toml\n[DIR] src/"
        );

        let result = tool
            .execute(ListFilesParameters {
                path: "target".to_owned(),
            })
            .await;
        assert_eq!(
            result.unwrap(),
            "Error: The directory at target does not exist."
        );
    }
}
