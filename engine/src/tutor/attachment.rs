//! Student attachments
//!
//! Images (whiteboard drawings, photos of work) travel inline next to the
//! prompt in the same turn. Documents take a separate path: their full
//! content is supplied directly and no chat history is sent.

use base64::prelude::*;
use sdk::{ContentPart, EngineError};
use std::path::Path;

/// File handed in alongside a student prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Image {
        mime_type: String,
        bytes: Vec<u8>,
    },
    Document {
        name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

impl Attachment {
    pub fn image(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Image {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn document(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Document {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Load a file, choosing image or document by extension
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let mime_type = mime_from_extension(path);

        if mime_type.starts_with("image/") {
            Ok(Self::image(mime_type, bytes))
        } else {
            Ok(Self::document(name, mime_type, bytes))
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Attachment::Image { .. })
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Attachment::Image { mime_type, .. } | Attachment::Document { mime_type, .. } => {
                mime_type
            }
        }
    }

    /// Content part for the service.
    ///
    /// Images and binary documents become base64 inline data. Text documents
    /// are decoded and sent as text, prefixed with their file name.
    pub fn to_part(&self) -> ContentPart {
        match self {
            Attachment::Image { mime_type, bytes } => {
                ContentPart::inline(mime_type.clone(), BASE64_STANDARD.encode(bytes))
            }
            Attachment::Document {
                name,
                mime_type,
                bytes,
            } if mime_type.starts_with("text/") => ContentPart::text(format!(
                "Document \"{}\":\n{}",
                name,
                String::from_utf8_lossy(bytes)
            )),
            Attachment::Document {
                mime_type, bytes, ..
            } => ContentPart::inline(mime_type.clone(), BASE64_STANDARD.encode(bytes)),
        }
    }
}

fn mime_from_extension(path: &Path) -> String {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::InlineData;
    use std::io::Write;

    #[test]
    fn test_image_is_base64_inline() {
        let part = Attachment::image("image/png", b"hello".to_vec()).to_part();
        assert_eq!(
            part,
            ContentPart::InlineData(InlineData {
                mime_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            })
        );
    }

    #[test]
    fn test_text_document_becomes_text() {
        let doc = Attachment::document("notes.txt", "text/plain", b"Photosynthesis uses light.".to_vec());
        match doc.to_part() {
            ContentPart::Text(text) => {
                assert!(text.starts_with("Document \"notes.txt\":"));
                assert!(text.contains("Photosynthesis uses light."));
            }
            other => panic!("Expected text part, got {:?}", other),
        }
    }

    #[test]
    fn test_pdf_document_stays_inline() {
        let doc = Attachment::document("worksheet.pdf", "application/pdf", vec![0x25, 0x50]);
        assert!(matches!(doc.to_part(), ContentPart::InlineData(_)));
        assert!(!doc.is_image());
    }

    #[test]
    fn test_from_path_detects_kind() {
        let dir = tempfile::tempdir().unwrap();

        let image_path = dir.path().join("board.PNG");
        std::fs::File::create(&image_path)
            .unwrap()
            .write_all(&[0x89, 0x50])
            .unwrap();
        let image = Attachment::from_path(&image_path).unwrap();
        assert!(image.is_image());
        assert_eq!(image.mime_type(), "image/png");

        let doc_path = dir.path().join("essay.md");
        std::fs::write(&doc_path, "# Essay").unwrap();
        match Attachment::from_path(&doc_path).unwrap() {
            Attachment::Document { name, mime_type, .. } => {
                assert_eq!(name, "essay.md");
                assert_eq!(mime_type, "text/markdown");
            }
            other => panic!("Expected document, got {:?}", other),
        }
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = Attachment::from_path(Path::new("/definitely/not/here.png"));
        assert!(matches!(result, Err(EngineError::Io(_))));
    }
}
