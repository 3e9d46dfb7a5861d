// Terminal input for the chat client: prompts, tool confirmations and
// line history kept between sessions

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};

pub struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

/// ~/.kali-mcp/history.txt, or `None` without a home directory
pub fn default_history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kali-mcp").join("history.txt"))
}

/// Whether a confirmation answer means yes
fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

impl InputHandler {
    /// `history_path` is loaded now and written by [`save_history`](Self::save_history);
    /// `None` keeps history in memory only
    pub fn new(history_path: Option<PathBuf>) -> Result<Self> {
        let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;

        if let Some(path) = history_path.as_deref().filter(|p| p.exists()) {
            if let Err(e) = editor.load_history(path) {
                tracing::debug!(path = %path.display(), error = %e, "Ignoring unreadable history");
            }
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    pub fn history_path(&self) -> Option<&Path> {
        self.history_path.as_deref()
    }

    /// Read a trimmed line, recording it in history when non-empty
    ///
    /// `Ok(None)` means the user pressed Ctrl+C or Ctrl+D.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let Some(line) = self.prompt(prompt)? else {
            return Ok(None);
        };
        if !line.is_empty() {
            self.editor
                .add_history_entry(&line)
                .context("Failed to add history entry")?;
        }
        Ok(Some(line))
    }

    /// Ask a yes/no question; anything but y/yes, including Ctrl+C, is no
    ///
    /// Answers are kept out of history.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.prompt(&format!("{} (y/n): ", question))?;
        Ok(answer.as_deref().is_some_and(is_affirmative))
    }

    fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line.trim().to_string())),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err).context("Failed to read input"),
        }
    }

    pub fn save_history(&mut self) -> Result<()> {
        let Some(path) = &self.history_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        self.editor
            .save_history(path)
            .with_context(|| format!("Failed to save history to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_affirmative() {
        for yes in ["y", "Y", "yes", "YES", " yes\n"] {
            assert!(is_affirmative(yes), "{:?}", yes);
        }
        for no in ["", "n", "no", "yep", "y es", "sure"] {
            assert!(!is_affirmative(no), "{:?}", no);
        }
    }

    #[test]
    fn test_default_history_path() {
        if let Some(path) = default_history_path() {
            assert!(path.ends_with(".kali-mcp/history.txt"));
        }
    }

    #[test]
    fn test_history_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.txt");

        let mut input = InputHandler::new(Some(path.clone())).unwrap();
        assert_eq!(input.history_path(), Some(path.as_path()));
        input.editor.add_history_entry("nmap 10.10.10.10").unwrap();
        input.save_history().unwrap();
        assert!(path.exists());

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.lines().any(|line| line == "nmap 10.10.10.10"));
        InputHandler::new(Some(path)).unwrap();
    }

    #[test]
    fn test_no_history_path_saves_nothing() {
        let mut input = InputHandler::new(None).unwrap();
        input.save_history().unwrap();
        assert!(input.history_path().is_none());
    }
}
