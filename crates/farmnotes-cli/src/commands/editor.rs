//! `$VISUAL` / `$EDITOR` round trips for note bodies.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::commands::common::normalize_content;
use crate::error::CliError;

/// Scratch file removed when dropped, even if the editor fails
struct ScratchFile(PathBuf);

impl ScratchFile {
    fn create(initial: &str) -> Result<Self, CliError> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        let path = env::temp_dir().join(format!(
            "farmnotes-note-{}-{stamp}.md",
            std::process::id()
        ));
        std::fs::write(&path, initial)?;
        Ok(Self(path))
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Open `initial` in the user's editor and return the saved text, or `None`
/// when it was left blank
pub fn edit_text(initial: &str) -> Result<Option<String>, CliError> {
    let scratch = ScratchFile::create(initial)?;
    let editor = preferred_editor();
    let status = spawn_editor(&editor, &scratch.0)?;
    if !status.success() {
        return Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )));
    }
    Ok(normalize_content(&std::fs::read_to_string(&scratch.0)?))
}

/// Run the editor as a program name first, then as a command line with
/// arguments (`code --wait`)
fn spawn_editor(editor: &str, file_path: &Path) -> Result<ExitStatus, CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => Ok(status),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let program = parts
                .next()
                .ok_or_else(|| CliError::EditorFailed("empty EDITOR command".to_string()))?;
            Ok(Command::new(program).args(parts).arg(file_path).status()?)
        }
        Err(error) => Err(CliError::Io(error)),
    }
}

pub fn preferred_editor() -> String {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .find_map(|name| env::var(name).ok().filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}
