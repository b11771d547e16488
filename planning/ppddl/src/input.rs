use std::path::Path;

/// A PPDDL source text, with the path of the file it was read from if any.
pub struct Input {
    text: String,
    source: Option<String>,
}

impl Input {
    pub fn from_string(text: impl Into<String>) -> Input {
        Input {
            text: text.into(),
            source: None,
        }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Input> {
        Ok(Input {
            text: std::fs::read_to_string(path)?,
            source: Some(path.display().to_string()),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Path of the file this text was read from.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::from_string(text)
    }
}
