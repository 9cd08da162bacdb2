use std::path::PathBuf;

use plain_agent_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::fs::{read_file, run_blocking};

/// Input of [`ReadFileTool`].
#[derive(Deserialize, JsonSchema)]
pub struct ReadFileParameters {
    /// The file to read.
    #[schemars(description = "The path of the file to read.")]
    pub path: String,
}

/// A tool for reading the whole content of a file.
pub struct ReadFileTool {
    root: PathBuf,
    input_schema: Value,
}

impl ReadFileTool {
    /// Creates a new read file tool resolving relative paths against `root`.
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        ReadFileTool {
            root: root.into(),
            input_schema: schema_for!(ReadFileParameters).to_value(),
        }
    }
}

impl Default for ReadFileTool {
    #[inline]
    fn default() -> Self {
        Self::new(".")
    }
}

impl Tool for ReadFileTool {
    type Input = ReadFileParameters;

    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads the entire content of a file at the given path."
    }

    fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    fn execute(
        &self,
        input: ReadFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let root = self.root.clone();
        run_blocking(move || read_file(&root, &input.path))
    }
}
