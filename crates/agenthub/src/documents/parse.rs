use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use calamine::{open_workbook_auto_from_rs, Reader};
use regex::Regex;
use std::io::{Cursor, Read};
use url::Url;

use crate::models::document::ParsedDocument;

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
];

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "json"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// How a fetched file will be interpreted, decided by its extension alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    Image { mime_type: &'static str },
    Text,
    Pdf,
    Docx,
    Spreadsheet,
    Unsupported(String),
}

/// Lowercased extension of the last path segment; the query string never counts
pub fn extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Decoded last path segment, if any
pub fn filename(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())?;
    Some(
        urlencoding::decode(segment)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| segment.to_string()),
    )
}

pub fn classify(url: &Url) -> DocumentKind {
    let Some(ext) = extension(url) else {
        return DocumentKind::Unsupported(String::new());
    };

    if let Some((_, mime_type)) = IMAGE_TYPES.iter().find(|(known, _)| *known == ext) {
        return DocumentKind::Image { mime_type };
    }
    match ext.as_str() {
        "pdf" => DocumentKind::Pdf,
        "docx" => DocumentKind::Docx,
        ext if TEXT_EXTENSIONS.contains(&ext) => DocumentKind::Text,
        ext if SPREADSHEET_EXTENSIONS.contains(&ext) => DocumentKind::Spreadsheet,
        _ => DocumentKind::Unsupported(ext),
    }
}

/// Interpret already-fetched bytes. Never fails; problems become `ParsedDocument::Error`.
pub fn parse(kind: &DocumentKind, bytes: &[u8], filename: Option<String>) -> ParsedDocument {
    let text = match kind {
        DocumentKind::Image { mime_type } => {
            return ParsedDocument::Image {
                base64: BASE64.encode(bytes),
                mime_type: mime_type.to_string(),
                filename,
            }
        }
        DocumentKind::Text => {
            return ParsedDocument::Text {
                content: String::from_utf8_lossy(bytes).into_owned(),
                filename,
            }
        }
        DocumentKind::Unsupported(ext) if ext.is_empty() => {
            return ParsedDocument::error(filename, "Unsupported file type: no extension")
        }
        DocumentKind::Unsupported(ext) => {
            return ParsedDocument::error(filename, format!("Unsupported file type: .{}", ext))
        }
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Spreadsheet => extract_spreadsheet(bytes),
    };

    match text {
        Ok(content) => ParsedDocument::Text { content, filename },
        Err(err) => ParsedDocument::error(filename, format!("{:#}", err)),
    }
}

fn non_blank(text: String, what: &str) -> Result<String> {
    if text.trim().is_empty() {
        Err(anyhow!("No text could be extracted from this {}", what))
    } else {
        Ok(text)
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes).context("Could not read PDF")?;
    non_blank(text, "PDF")
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("Could not open Word document")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("Word document has no body")?
        .read_to_string(&mut xml)?;

    non_blank(docx_xml_to_text(&xml), "Word document")
}

/// Flatten WordprocessingML into plain text: text runs, tabs, line breaks and paragraphs
pub fn docx_xml_to_text(xml: &str) -> String {
    let tokens = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\s*/>|<w:br\s*/>|</w:p>")
        .expect("valid docx token pattern");

    let mut text = String::new();
    for token in tokens.captures_iter(xml) {
        match token.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None => match &token[0] {
                "</w:p>" => text.push('\n'),
                tag if tag.starts_with("<w:tab") => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }
    text.trim_end().to_string()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn extract_spreadsheet(bytes: &[u8]) -> Result<String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .context("Could not open spreadsheet")?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Could not read sheet {}", name))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        sheets.push((name, rows));
    }

    render_sheets(sheets).ok_or_else(|| anyhow!("Spreadsheet contains no data"))
}

/// Render sheets as `[Sheet: name]` blocks of tab-separated rows.
///
/// Blank rows are omitted and a sheet without any non-blank row is skipped entirely.
/// Returns `None` when nothing is left.
pub fn render_sheets<I>(sheets: I) -> Option<String>
where
    I: IntoIterator<Item = (String, Vec<Vec<String>>)>,
{
    let blocks: Vec<String> = sheets
        .into_iter()
        .filter_map(|(name, rows)| {
            let lines: Vec<String> = rows
                .iter()
                .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
                .map(|row| {
                    row.iter()
                        .map(|cell| cell.replace(['\t', '\r', '\n'], " "))
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect();
            if lines.is_empty() {
                return None;
            }
            Some(format!("[Sheet: {}]\n{}", name, lines.join("\n")))
        })
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}
