//! Reference documents. A PDF handed in as the article's knowledge base is
//! flattened to plain text before it reaches the prompt.

use lopdf::Document;
use ag_core::{Error, Result};

pub const NOT_A_PDF: &str = "PDFファイルを選択してください。";
pub const PDF_UNREADABLE: &str =
    "PDFの解析に失敗しました。ファイルが破損しているか、サポートされていない形式の可能性があります。";

const PDF_MAGIC: &[u8] = b"%PDF";

/// Page texts joined by a blank line. CPU bound; call it off the runtime.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(Error::InputValidation(NOT_A_PDF.to_string()));
    }

    let doc = Document::load_mem(bytes).map_err(unreadable)?;
    let mut pages = Vec::new();
    for (page_num, _page_id) in doc.get_pages() {
        let text = doc.extract_text(&[page_num]).map_err(unreadable)?;
        pages.push(text.trim().to_string());
    }

    let text = pages.join("\n\n").trim().to_string();
    tracing::debug!(pages = pages.len(), chars = text.chars().count(), "reference pdf extracted");
    Ok(text)
}

fn unreadable(e: lopdf::Error) -> Error {
    tracing::warn!(error = %e, "reference pdf rejected");
    Error::InputValidation(PDF_UNREADABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// A minimal document with one Courier text line per page.
    fn sample_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_extracts_every_page_in_order() {
        let text = extract_pdf_text(&sample_pdf(&["Filing deadlines", "Deductible expenses"])).unwrap();
        let first = text.find("Filing deadlines").unwrap();
        let second = text.find("Deductible expenses").unwrap();
        assert!(first < second);
        assert!(text[first..second].contains("\n\n"));
        assert_eq!(text, text.trim());
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let err = extract_pdf_text(b"plain notes, not a document").unwrap_err();
        assert!(matches!(err, Error::InputValidation(ref m) if m == NOT_A_PDF));
    }

    #[test]
    fn test_rejects_truncated_pdf() {
        let bytes = sample_pdf(&["Filing deadlines"]);
        let err = extract_pdf_text(&bytes[..40]).unwrap_err();
        assert!(matches!(err, Error::InputValidation(ref m) if m == PDF_UNREADABLE));
    }
}
