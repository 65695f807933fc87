//! Publication attachments
//!
//! An attachment points at one stored file. The stored object is addressed by
//! a generated upload name so two uploads never collide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationErrors;

/// Storage subfolder for attachment uploads.
pub const ATTACHMENT_SUBFOLDER: &str = "attachments";

const MAX_DISPLAY_NAME_LEN: usize = 255;

/// A file attached to a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationAttachment {
    /// Unique identifier
    pub id: Uuid,

    /// Parent publication
    pub publication_id: Uuid,

    /// Storage key of the file
    pub file: String,

    /// Name shown to users; empty means "use the file name"
    #[serde(default)]
    pub display_name: String,

    /// File size in bytes
    pub size: u64,

    pub created_at: DateTime<Utc>,
}

impl PublicationAttachment {
    /// Creates an attachment record for an already stored file.
    pub fn new(
        publication_id: Uuid,
        file: impl Into<String>,
        display_name: impl Into<String>,
        size: u64,
    ) -> Result<Self, ValidationErrors> {
        let display_name = display_name.into();
        validate_display_name(&display_name)?;

        Ok(Self {
            id: Uuid::now_v7(),
            publication_id,
            file: file.into(),
            display_name,
            size,
            created_at: Utc::now(),
        })
    }

    /// Display name, falling back to the storage key.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.file
        } else {
            &self.display_name
        }
    }

    /// Rename the attachment.
    pub fn rename(&mut self, display_name: impl Into<String>) -> Result<(), ValidationErrors> {
        let display_name = display_name.into();
        validate_display_name(&display_name)?;
        self.display_name = display_name;
        Ok(())
    }

    /// Point the record at a new stored file, returning the previous key.
    pub fn replace_file(&mut self, file: impl Into<String>, size: u64) -> String {
        self.size = size;
        std::mem::replace(&mut self.file, file.into())
    }
}

fn validate_display_name(display_name: &str) -> Result<(), ValidationErrors> {
    if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(ValidationErrors::single(
            "display_name",
            "ensure this field has no more than 255 characters",
        ));
    }
    Ok(())
}

/// Generate a unique storage key for an upload.
///
/// The key is `<subfolder>/<uuid>.<extension>`, with the extension taken from
/// the last dot-separated part of the original file name and lowercased. An
/// extension that is not ASCII alphanumeric is dropped, leaving `<subfolder>/<uuid>`.
///
/// # Examples
///
/// ```
/// use eo_org::attachment::unique_upload_name;
///
/// let key = unique_upload_name("attachments", "Report.PDF");
/// assert!(key.starts_with("attachments/"));
/// assert!(key.ends_with(".pdf"));
/// ```
pub fn unique_upload_name(subfolder: &str, filename: &str) -> String {
    let folder = subfolder.trim_end_matches('/');
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{}/{}.{}", folder, Uuid::new_v4(), ext.to_ascii_lowercase()),
        None => format!("{}/{}", folder, Uuid::new_v4()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_upload_name() {
        let first = unique_upload_name("attachments", "Flyer.Final.PNG");
        let second = unique_upload_name("attachments/", "Flyer.Final.PNG");

        assert!(first.starts_with("attachments/"));
        assert!(first.ends_with(".png"));
        assert!(!second.starts_with("attachments//"));
        assert_ne!(first, second);

        // 36 char uuid between the folder and the extension
        let stem = first.trim_start_matches("attachments/").trim_end_matches(".png");
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_unsafe_extension_is_dropped() {
        for filename in ["a.b/c", "notes.t x t", "../../etc.", "README"] {
            let key = unique_upload_name("attachments", filename);
            let stem = key.strip_prefix("attachments/").unwrap();
            assert!(Uuid::parse_str(stem).is_ok(), "{filename} -> {key}");
        }
        assert!(unique_upload_name("attachments", "scan.JPEG2").ends_with(".jpeg2"));
    }

    #[test]
    fn test_label_falls_back_to_file() {
        let mut attachment =
            PublicationAttachment::new(Uuid::now_v7(), "attachments/a.pdf", "", 12).unwrap();
        assert_eq!(attachment.label(), "attachments/a.pdf");

        attachment.rename("Agenda").unwrap();
        assert_eq!(attachment.label(), "Agenda");
    }

    #[test]
    fn test_replace_file_returns_previous_key() {
        let mut attachment =
            PublicationAttachment::new(Uuid::now_v7(), "attachments/a.pdf", "Agenda", 12).unwrap();
        let previous = attachment.replace_file("attachments/b.pdf", 40);

        assert_eq!(previous, "attachments/a.pdf");
        assert_eq!(attachment.file, "attachments/b.pdf");
        assert_eq!(attachment.size, 40);
    }

    #[test]
    fn test_display_name_length() {
        let long = "x".repeat(256);
        let errors = PublicationAttachment::new(Uuid::now_v7(), "k", long, 0).unwrap_err();
        assert!(errors.has("display_name"));
    }
}
