use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use plain_agent_core::tool::{Error as ToolError, ToolResult};
use tokio::task::spawn_blocking;

/// A file operation failure the model should hear about.
///
/// The `Display` output is the text returned to the model, so none of these
/// stop the conversation.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The file to read doesn't exist.
    #[error("Error: The file at {path} was not found.")]
    FileNotFound {
        /// The path as given by the model.
        path: String,
    },
    /// The directory to list doesn't exist.
    #[error("Error: The directory at {path} does not exist.")]
    DirectoryNotFound {
        /// The path as given by the model.
        path: String,
    },
    /// The content to replace doesn't occur in the file.
    #[error("Error: The specified old content was not found in the file {path}.")]
    ContentNotFound {
        /// The path as given by the model.
        path: String,
    },
    /// Reading a file failed for another reason.
    #[error("An error occurred while reading the file: {0}")]
    Read(#[source] io::Error),
    /// Listing a directory failed for another reason.
    #[error("An error occurred while listing files: {0}")]
    List(#[source] io::Error),
    /// Editing a file failed for another reason.
    #[error("An error occurred while editing the file: {0}")]
    Edit(#[source] io::Error),
}

/// Runs a file operation on the blocking pool.
///
/// An [`FsError`] becomes the successful result text, so the model can
/// react to it. Only a panicking operation fails the tool call.
pub(crate) async fn run_blocking<F>(op: F) -> ToolResult
where
    F: FnOnce() -> Result<String, FsError> + Send + 'static,
{
    match spawn_blocking(op).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => {
            debug!("file operation failed: {err}");
            Ok(err.to_string())
        }
        Err(err) => {
            error!("file operation panicked: {err}");
            Err(ToolError::execution_error().with_reason(err.to_string()))
        }
    }
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Reads the whole file at `path`.
pub fn read_file(root: &Path, path: &str) -> Result<String, FsError> {
    let content =
        fs::read_to_string(resolve(root, path)).map_err(|err| {
            match err.kind() {
                io::ErrorKind::NotFound => FsError::FileNotFound {
                    path: path.to_owned(),
                },
                _ => FsError::Read(err),
            }
        })?;
    Ok(format!("Contents of the file {path}:\n{content}"))
}

/// Lists the direct children of the directory at `path`, sorted by name.
pub fn list_files(root: &Path, path: &str) -> Result<String, FsError> {
    let dir = resolve(root, path);
    if !dir.exists() {
        return Err(FsError::DirectoryNotFound {
            path: path.to_owned(),
        });
    }

    let mut entries = vec![];
    for entry in fs::read_dir(&dir).map_err(FsError::List)? {
        let entry = entry.map_err(FsError::List)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follows symlinks, so a link to a directory is listed as one.
        let is_dir = entry.path().is_dir();
        entries.push((name, is_dir));
    }
    entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    let lines: Vec<_> = entries
        .into_iter()
        .map(|(name, is_dir)| {
            if is_dir {
                format!("[DIR] {name}/")
            } else {
                format!("[FILE] {name}")
            }
        })
        .collect();
    Ok(format!("Files in directory {path}:\n{}", lines.join("\n")))
}

/// Edits or writes the file at `path`.
///
/// When the file exists and `old_content` is not empty, every occurrence of
/// `old_content` is replaced by `new_content`, and nothing is written if
/// there is no occurrence. Otherwise the file (and its missing parent
/// directories) is created, or overwritten, with `new_content` as the
/// entire content.
pub fn edit_file(
    root: &Path,
    path: &str,
    old_content: &str,
    new_content: &str,
) -> Result<String, FsError> {
    let file = resolve(root, path);

    if file.exists() && !old_content.is_empty() {
        let current = fs::read_to_string(&file).map_err(FsError::Edit)?;
        if !current.contains(old_content) {
            return Err(FsError::ContentNotFound {
                path: path.to_owned(),
            });
        }
        fs::write(&file, current.replace(old_content, new_content))
            .map_err(FsError::Edit)?;
        return Ok(format!("File {path} has been successfully updated."));
    }

    if let Some(parent) = file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(FsError::Edit)?;
        }
    }
    fs::write(&file, new_content).map_err(FsError::Edit)?;
    Ok(format!("File {path} has been successfully created."))
}
