use anyhow::Result;
use std::path::Path;

/// Extracts the concatenated page text of a PDF. Image-only pages yield
/// no text; the caller decides whether an empty result is an error.
pub fn extract_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| anyhow::anyhow!("pdf extraction failed for {}: {}", path.display(), e))?;
    Ok(text)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Builds a minimal single-page PDF. `text` renders as a Helvetica
    /// line; `None` produces a page with an empty content stream, the
    /// shape of a scanned/image-only document as far as text extraction
    /// is concerned.
    pub(crate) fn minimal_pdf(text: Option<&str>) -> Vec<u8> {
        let content = match text {
            Some(t) => format!("BT /F1 24 Tf 72 720 Td ({}) Tj ET", t),
            None => String::new(),
        };

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
                .to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();

        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }

        let xref_offset = out.len();
        out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
        out.push_str("0000000000 65535 f \n");
        for offset in &offsets {
            out.push_str(&format!("{:010} 00000 n \n", offset));
        }
        out.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        ));

        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::minimal_pdf;
    use super::*;

    #[test]
    fn extracts_text_from_a_simple_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("alpha.pdf");
        std::fs::write(&path, minimal_pdf(Some("Alpha"))).unwrap();

        let text = extract_text(&path).unwrap();
        assert!(text.contains("Alpha"));
    }

    #[test]
    fn image_only_pdf_yields_no_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scan.pdf");
        std::fs::write(&path, minimal_pdf(None)).unwrap();

        let text = extract_text(&path).unwrap();
        assert!(text.trim().is_empty());
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        assert!(extract_text(&path).is_err());
    }
}
