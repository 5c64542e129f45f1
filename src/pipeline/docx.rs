//! DOCX paragraph extraction.
//!
//! A `.docx` file is a zip archive; the body text lives in
//! `word/document.xml` as a sequence of `<w:p>` paragraphs, each holding runs
//! of `<w:t>` text. We only need the plain text of each paragraph, so a full
//! XML parser is unnecessary: the OOXML body is regular enough to walk with a
//! handful of anchored regexes.
//!
//! Paragraph properties (`<w:pPr>`) are stripped before reading runs because
//! their `<w:tabs>` block declares tab *stops*, not tab characters.
//!
//! Paragraphs nest: a text box (`<w:txbxContent>`) anchored in a run holds
//! paragraphs of its own. Only top-level paragraphs are emitted; a text box's
//! text is read inline at its anchor, one line per nested paragraph.

use crate::error::FormServeError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::io::{Read, Seek};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// `<w:p …>`, `<w:p/>`, or `</w:p>`; the tag name must end right after `p`,
/// so `<w:pPr>` and `<w:proofErr>` never match.
static PARAGRAPH_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?w:p(?:\s[^>]*)?/?>").unwrap());

/// A nested paragraph closing into the next one, with any empty `<w:p/>`
/// between them captured in group 1.
static NESTED_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</w:p>\s*((?:<w:p(?:\s[^>]*)?/>\s*)*)<w:p(?:\s[^>]*[^/>])?>").unwrap()
});

static PARAGRAPH_PROPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<w:pPr>.*?</w:pPr>").unwrap());

/// Text runs, tabs, and line breaks, in document order.
static RUN_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:tab(?:\s[^>]*)?/>|<w:(?:br|cr)(?:\s[^>]*)?/>|<w:t(?:\s[^>]*)?>([^<]*)</w:t>")
        .unwrap()
});

static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|[a-z]+);").unwrap());

/// Read every paragraph's text from a DOCX archive.
pub fn extract_paragraphs<R: Read + Seek>(reader: R) -> Result<Vec<String>, FormServeError> {
    let mut archive = ZipArchive::new(reader).map_err(|e| FormServeError::DecodeFailed {
        kind: "DOCX",
        detail: format!("not a zip archive: {}", e),
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| FormServeError::DecodeFailed {
            kind: "DOCX",
            detail: format!("missing {}: {}", DOCUMENT_PART, e),
        })?
        .read_to_string(&mut xml)
        .map_err(|e| FormServeError::DecodeFailed {
            kind: "DOCX",
            detail: format!("unreadable {}: {}", DOCUMENT_PART, e),
        })?;

    Ok(paragraphs_from_xml(&xml))
}

/// Extract top-level paragraph texts from a `word/document.xml` body.
///
/// A paragraph left open at the end of the input is dropped.
pub fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for tag in PARAGRAPH_TAG.find_iter(xml) {
        let s = tag.as_str();
        if s.starts_with("</") {
            match depth {
                0 => {}
                1 => {
                    paragraphs.push(paragraph_text(&xml[start..tag.start()]));
                    depth = 0;
                }
                _ => depth -= 1,
            }
        } else if s.ends_with("/>") {
            if depth == 0 {
                paragraphs.push(String::new());
            }
        } else {
            if depth == 0 {
                start = tag.end();
            }
            depth += 1;
        }
    }

    paragraphs
}

fn paragraph_text(body: &str) -> String {
    let body = PARAGRAPH_PROPS.replace_all(body, "");
    let body = NESTED_BREAK.replace_all(&body, |caps: &Captures| {
        "<w:br/>".repeat(1 + caps[1].matches("<w:p").count())
    });
    let mut text = String::new();

    for token in RUN_TOKEN.captures_iter(&body) {
        match token.get(1) {
            Some(t) => text.push_str(&unescape(t.as_str())),
            None if token[0].starts_with("<w:tab") => text.push('\t'),
            None => text.push('\n'),
        }
    }

    text
}

fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    ENTITY
        .replace_all(s, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if name.starts_with("#x") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse::<u32>().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::{write::SimpleFileOptions, ZipWriter};

    /// Build a minimal DOCX whose body holds one `<w:p>` per entry.
    pub(crate) fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!(r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#, p))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_paragraphs_from_archive() {
        let docx = build_docx(&["Name: Asha", "Purpose: Admission"]);
        let paras = extract_paragraphs(Cursor::new(docx)).unwrap();
        assert_eq!(paras, vec!["Name: Asha", "Purpose: Admission"]);
    }

    #[test]
    fn joins_runs_and_keeps_empty_paragraphs() {
        let xml = r#"<w:body>
            <w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Hel</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>lo</w:t></w:r></w:p>
            <w:p/>
            <w:p w:rsidR="00AB"><w:r><w:t>world</w:t></w:r></w:p>
        </w:body>"#;
        assert_eq!(paragraphs_from_xml(xml), vec!["Hello", "", "world"]);
    }

    #[test]
    fn text_box_text_stays_in_its_paragraph() {
        let xml = r#"<w:body>
            <w:p><w:r><w:t xml:space="preserve">Name: </w:t></w:r><w:r><w:pict><v:textbox><w:txbxContent><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>Asha</w:t></w:r></w:p></w:txbxContent></v:textbox></w:pict></w:r><w:r><w:t xml:space="preserve"> Kumar</w:t></w:r></w:p>
            <w:p><w:r><w:t>Purpose</w:t></w:r></w:p>
        </w:body>"#;
        assert_eq!(paragraphs_from_xml(xml), vec!["Name: Asha Kumar", "Purpose"]);
    }

    #[test]
    fn multi_paragraph_text_box_keeps_line_breaks() {
        let xml = r#"<w:p><w:r><w:t>Phone:</w:t></w:r><w:r><w:txbxContent><w:p><w:r><w:t>98450</w:t></w:r></w:p><w:p/><w:p w:rsidR="01"><w:r><w:t>12345</w:t></w:r></w:p></w:txbxContent></w:r><w:r><w:t>end</w:t></w:r></w:p>"#;
        assert_eq!(paragraphs_from_xml(xml), vec!["Phone:98450\n\n12345end"]);
    }

    #[test]
    fn unclosed_paragraph_is_dropped() {
        let xml = r#"<w:p><w:r><w:t>done</w:t></w:r></w:p></w:p><w:p><w:r><w:t>cut"#;
        assert_eq!(paragraphs_from_xml(xml), vec!["done"]);
    }

    #[test]
    fn tab_stops_are_not_tabs() {
        let xml = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>"#;
        assert_eq!(paragraphs_from_xml(xml), vec!["a\tb\nc"]);
    }

    #[test]
    fn decodes_entities() {
        let xml = r#"<w:p><w:r><w:t>Tom &amp; Jerry &lt;3 &#233;&#x41; &bogus;</w:t></w:r></w:p>"#;
        assert_eq!(paragraphs_from_xml(xml), vec!["Tom & Jerry <3 éA &bogus;"]);
    }

    #[test]
    fn rejects_non_zip() {
        let err = extract_paragraphs(Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, FormServeError::DecodeFailed { kind: "DOCX", .. }));
    }
}
