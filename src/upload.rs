//! Document selection and upload gating
//!
//! A file reaches the control either by being dropped onto the terminal
//! (which pastes its path) or by typing a path into the drop zone. Only PDFs
//! are accepted. The control never talks to the network itself; the
//! coordinator takes the file from `begin_submit` and reports back through
//! `finish`.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub media_type: String,
}

impl SelectedFile {
    /// Build a candidate from a path, accepting only existing PDF files.
    pub fn from_path(path: &Path) -> Result<Self, SelectionError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = media_type_for(path);

        if media_type != PDF_MEDIA_TYPE {
            return Err(SelectionError::NotPdf {
                name,
                media_type: media_type.to_string(),
            });
        }
        if !path.is_file() {
            return Err(SelectionError::NotFound(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            name,
            media_type: media_type.to_string(),
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Only PDF files are allowed")]
    NotPdf { name: String, media_type: String },

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("An upload is already in progress")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Empty,
    CandidateSelected,
    Submitting,
}

#[derive(Debug, Default)]
pub struct UploadControl {
    candidate: Option<SelectedFile>,
    submitting: bool,
    highlighted: bool,
}

impl UploadControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> UploadState {
        match (&self.candidate, self.submitting) {
            (None, _) => UploadState::Empty,
            (Some(_), false) => UploadState::CandidateSelected,
            (Some(_), true) => UploadState::Submitting,
        }
    }

    pub fn candidate(&self) -> Option<&SelectedFile> {
        self.candidate.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn drag_enter(&mut self) {
        self.highlighted = true;
    }

    pub fn drag_leave(&mut self) {
        self.highlighted = false;
    }

    /// Select a file from a typed or pasted path. On error nothing changes.
    pub fn select(&mut self, raw: &str) -> Result<&SelectedFile, SelectionError> {
        if self.submitting {
            return Err(SelectionError::Busy);
        }

        let file = SelectedFile::from_path(&normalize_path(raw))?;
        tracing::debug!(file = %file.name, "document selected");
        Ok(&*self.candidate.insert(file))
    }

    /// A drop ends the drag, then selects like the picker does.
    pub fn drop_path(&mut self, raw: &str) -> Result<&SelectedFile, SelectionError> {
        self.drag_leave();
        self.select(raw)
    }

    /// Start submitting the current candidate. Returns `None` when there is
    /// nothing selected or an upload is already in flight.
    pub fn begin_submit(&mut self) -> Option<SelectedFile> {
        if self.submitting {
            return None;
        }
        let file = self.candidate.clone()?;
        self.submitting = true;
        Some(file)
    }

    /// Settle an in-flight upload. Success releases the candidate, failure keeps it for a retry.
    pub fn finish(&mut self, success: bool) {
        if !self.submitting {
            return;
        }
        self.submitting = false;
        if success {
            self.candidate = None;
        }
    }
}

/// Media type by extension. Anything that is not a PDF is opaque to the client.
pub fn media_type_for(path: &Path) -> &'static str {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MEDIA_TYPE,
        Some(_) => "application/octet-stream",
        None => "",
    }
}

/// Clean up a path as terminals paste it on drop: surrounding quotes,
/// a `file://` prefix and backslash-escaped spaces.
pub fn normalize_path(raw: &str) -> PathBuf {
    let mut s = raw.trim();

    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = &s[1..s.len() - 1];
        }
    }

    let s = s.strip_prefix("file://").unwrap_or(s);

    PathBuf::from(s.replace("\\ ", " "))
}
