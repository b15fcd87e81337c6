use std::path::Path;

use anyhow::{Context, Result};
use client_core::PdfUpload;

/// Reads a file the way a browser file input would present it: name,
/// extension-derived MIME type, and contents.
pub async fn read_pdf(path: &Path) -> Result<PdfUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string());
    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());
    Ok(PdfUpload::new(file_name, mime_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[tokio::test]
    async fn derives_mime_type_from_extension() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("notes2deck_upload_test_{suffix}"));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let pdf_path = dir.join("lecture.pdf");
        let txt_path = dir.join("lecture.txt");
        std::fs::write(&pdf_path, b"%PDF-1.4").expect("write pdf");
        std::fs::write(&txt_path, b"plain").expect("write txt");

        let pdf = read_pdf(&pdf_path).await.expect("read pdf");
        assert_eq!(pdf.file_name, "lecture.pdf");
        assert_eq!(pdf.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(pdf.size_bytes(), 8);
        assert!(pdf.validate().is_ok());

        let txt = read_pdf(&txt_path).await.expect("read txt");
        assert_eq!(txt.mime_type.as_deref(), Some("text/plain"));
        assert!(txt.validate().is_err());

        std::fs::remove_dir_all(dir).expect("cleanup");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = read_pdf(Path::new("/definitely/not/here.pdf"))
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("failed to read"));
    }
}
