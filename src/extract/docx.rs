//! DOCX body-text extraction.
//!
//! A `.docx` file is a ZIP archive whose body lives in `word/document.xml` as
//! WordprocessingML. Text runs sit inside `<w:t>` elements; paragraph ends
//! (`</w:p>`) become line breaks. Formatting is discarded.

use super::ExtractError;
use std::io::{Cursor, Read};

pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let cursor = Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|error| ExtractError::Docx(format!("not a ZIP container: {error}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|error| ExtractError::Docx(format!("missing word/document.xml: {error}")))?
        .read_to_string(&mut xml)
        .map_err(|error| ExtractError::Docx(format!("unreadable document.xml: {error}")))?;

    Ok(text_from_document_xml(&xml))
}

/// Pull the visible text out of a WordprocessingML body.
///
/// Only `<w:t>` runs carry visible text; everything between other tags is
/// markup noise and is skipped.
fn text_from_document_xml(xml: &str) -> String {
    let mut text = String::new();
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        rest = &rest[open..];
        let Some(gt) = rest.find('>') else { break };
        let tag = &rest[1..gt];
        let after = &rest[gt + 1..];

        if let Some(tail) = tag.strip_prefix("w:t") {
            // Distinguish `<w:t>` / `<w:t xml:space="preserve">` from
            // `<w:tbl>`, `<w:tab/>`, and friends.
            let is_text_run = tail.is_empty() || tail.starts_with(' ') || tail == "/";
            if is_text_run && !tag.ends_with('/') {
                if let Some(close) = after.find("</w:t>") {
                    push_decoded(&mut text, &after[..close]);
                    rest = &after[close + "</w:t>".len()..];
                    continue;
                }
            }
        } else if tag == "w:tab/" || tag.starts_with("w:tab ") {
            text.push('\t');
        } else if tag == "w:br/" || tag.starts_with("w:br ") {
            text.push('\n');
        } else if tag == "/w:p" && !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }

        rest = after;
    }

    text.trim_end().to_string()
}

/// Append run text with the five predefined XML entities decoded.
fn push_decoded(out: &mut String, raw: &str) {
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let (replacement, consumed) = if rest.starts_with("&amp;") {
            ('&', 5)
        } else if rest.starts_with("&lt;") {
            ('<', 4)
        } else if rest.starts_with("&gt;") {
            ('>', 4)
        } else if rest.starts_with("&quot;") {
            ('"', 6)
        } else if rest.starts_with("&apos;") {
            ('\'', 6)
        } else {
            ('&', 1)
        };
        out.push(replacement);
        rest = &rest[consumed..];
    }
    out.push_str(rest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .expect("start file");
        writer
            .write_all(document_xml.as_bytes())
            .expect("write xml");
        writer.finish().expect("finish archive");
        cursor.into_inner()
    }

    #[test]
    fn extracts_runs_and_paragraph_breaks() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body>
            <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">Second </w:t></w:r><w:r><w:t>half.</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = extract_text(&docx_bytes(xml)).expect("docx extraction");
        assert_eq!(text, "First paragraph.\nSecond half.");
    }

    #[test]
    fn decodes_xml_entities() {
        let xml = "<w:document><w:body><w:p><w:r><w:t>a &amp; b &lt; c</w:t></w:r></w:p></w:body></w:document>";
        let text = extract_text(&docx_bytes(xml)).expect("docx extraction");
        assert_eq!(text, "a & b < c");
    }

    #[test]
    fn non_zip_bytes_are_rejected() {
        let error = extract_text(b"plain bytes").unwrap_err();
        assert!(matches!(error, ExtractError::Docx(_)));
    }

    #[test]
    fn archive_without_document_xml_is_rejected() {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        writer
            .start_file("unrelated.txt", SimpleFileOptions::default())
            .expect("start file");
        writer.write_all(b"nope").expect("write");
        writer.finish().expect("finish");

        let error = extract_text(&cursor.into_inner()).unwrap_err();
        assert!(matches!(error, ExtractError::Docx(_)));
    }
}
