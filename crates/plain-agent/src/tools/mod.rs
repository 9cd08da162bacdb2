//! A set of built-in tools that models can use.

mod edit_file;
mod fs;
mod list_files;
mod read_file;

use std::path::{Path, PathBuf};

use plain_agent_core::tool::{Registry as ToolRegistry, RegistryError};

pub use edit_file::{EditFileParameters, EditFileTool};
pub use fs::{FsError, edit_file, list_files, read_file};
pub use list_files::{ListFilesParameters, ListFilesTool};
pub use read_file::{ReadFileParameters, ReadFileTool};

/// The file tools (`read_file`, `list_files` and `edit_file`) sharing one
/// root directory.
///
/// Relative paths given by the model are resolved against the root, and
/// absolute paths are used as they are. The root is not a sandbox.
#[derive(Clone, Debug)]
pub struct FileSystemToolset {
    root: PathBuf,
}

impl FileSystemToolset {
    /// Creates a toolset rooted at `root`.
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registers all file tools into `registry`.
    pub fn register_into(
        &self,
        registry: &mut ToolRegistry,
    ) -> Result<(), RegistryError> {
        registry.register(ReadFileTool::new(&self.root))?;
        registry.register(ListFilesTool::new(&self.root))?;
        registry.register(EditFileTool::new(&self.root))?;
        Ok(())
    }
}
