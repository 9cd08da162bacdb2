use std::path::PathBuf;

use plain_agent_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::fs::{edit_file, run_blocking};

/// Input of [`EditFileTool`].
#[derive(Deserialize, JsonSchema)]
pub struct EditFileParameters {
    /// The file to edit.
    #[schemars(description = "The path of the file to edit or create.")]
    pub path: String,
    /// The text to replace, empty to write the whole file.
    #[schemars(
        description = "The content to replace. Leave it empty to write the whole file."
    )]
    #[serde(default)]
    pub old_content: String,
    /// The replacement text or the whole new content.
    #[schemars(description = "The content to write in place of `old_content`.")]
    pub new_content: String,
}

/// A tool for editing, creating or overwriting a file.
pub struct EditFileTool {
    root: PathBuf,
    input_schema: Value,
}

impl EditFileTool {
    /// Creates a new edit file tool resolving relative paths against `root`.
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        EditFileTool {
            root: root.into(),
            input_schema: schema_for!(EditFileParameters).to_value(),
        }
    }
}

impl Default for EditFileTool {
    #[inline]
    fn default() -> Self {
        Self::new(".")
    }
}

impl Tool for EditFileTool {
    type Input = EditFileParameters;

    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        r#"
Edits a file by replacing every occurrence of `old_content` with `new_content`.
If `old_content` is empty or the file doesn't exist, the file is written with `new_content` as its entire content, creating missing directories."#
    }

    fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    fn execute(
        &self,
        input: EditFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let root = self.root.clone();
        run_blocking(move || {
            edit_file(&root, &input.path, &input.old_content, &input.new_content)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn params(path: &str, old_content: &str, new_content: &str) -> EditFileParameters {
        EditFileParameters {
            path: path.to_owned(),
            old_content: old_content.to_owned(),
            new_content: new_content.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_edit_file_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tool = EditFileTool::new(dir.path());

        let result = tool.execute(params("notes/todo.md", "", "- milk")).await;
        assert_eq!(
            result.unwrap(),
            "File notes/todo.md has been successfully created."
        );

        let result = tool.execute(params("notes/todo.md", "milk", "eggs")).await;
        assert_eq!(
            result.unwrap(),
            "File notes/todo.md has been successfully updated."
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("notes/todo.md")).unwrap(),
            "- eggs"
        );

        let result = tool.execute(params("notes/todo.md", "bread", "x")).await;
        assert_eq!(
            result.unwrap(),
            "Error: The specified old content was not found in the file notes/todo.md."
        );
    }

    #[test]
    fn test_old_content_is_optional() {
        let input: EditFileParameters =
            serde_json::from_value(json!({ "path": "a.txt", "new_content": "x" }))
                .unwrap();
        assert_eq!(input.old_content, "");

        let tool = EditFileTool::default();
        let required = tool.input_schema()["required"].as_array().unwrap();
        assert!(!required.contains(&json!("old_content")));
    }
}
