// ABOUTME: Text extraction from uploaded documents with MIME sniffing and a raw-decode fallback
// ABOUTME: Handles plain text, PDF, OOXML and RTF; everything else falls through to UTF-8 decoding

use anyhow::{anyhow, bail, Context};
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{AppError, Result};

pub const MAX_EXTRACTED_CHARS: usize = 8000;
const SNIFF_BYTES: u64 = 8192;

const MIME_PDF: &str = "application/pdf";
const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const MIME_PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
const MIME_OCTET: &str = "application/octet-stream";

const SUPPORTED_MIMES: &[&str] = &[
    MIME_PDF,
    "application/msword",
    MIME_DOCX,
    "application/vnd.ms-excel",
    MIME_XLSX,
    "application/vnd.ms-powerpoint",
    MIME_PPTX,
    "application/rtf",
    "application/x-rtf",
    "text/rtf",
];

/// Sniffs the MIME type from file content. Valid NUL-free UTF-8 that no
/// signature matches is reported as `text/plain`.
pub fn detect_mime(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(AppError::NotFound(format!("File not found: {}", path.display())));
    }

    let mut head = Vec::new();
    fs::File::open(path)?
        .take(SNIFF_BYTES)
        .read_to_end(&mut head)?;

    if head.starts_with(b"{\\rtf") {
        return Ok("application/rtf".to_string());
    }
    if let Some(kind) = infer::get(&head) {
        return Ok(kind.mime_type().to_string());
    }
    if looks_like_text(&head) {
        return Ok("text/plain".to_string());
    }
    Ok(MIME_OCTET.to_string())
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.is_empty() || head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window is still text.
        Err(e) => e.error_len().is_none(),
    }
}

pub fn is_supported_mime(mime: &str) -> bool {
    mime.starts_with("text/") || SUPPORTED_MIMES.contains(&mime)
}

pub fn is_supported(path: &Path) -> bool {
    match detect_mime(path) {
        Ok(mime) => is_supported_mime(&mime),
        Err(e) => {
            tracing::warn!("Error checking file type support for {}: {}", path.display(), e);
            false
        }
    }
}

/// Extracts and normalizes text using the parser for the detected MIME type.
pub fn extract(path: &Path) -> Result<String> {
    let mime = detect_mime(path)?;
    extract_as(path, &mime).map_err(|e| AppError::ExtractionFailed(format!("{:#}", e)))
}

/// Like [`extract`], but retries with a raw UTF-8 decode when the parser fails.
pub fn extract_with_fallback(path: &Path) -> Result<String> {
    let primary = match extract(path) {
        Ok(text) => return Ok(text),
        Err(AppError::ExtractionFailed(reason)) => reason,
        Err(other) => other.to_string(),
    };
    tracing::debug!("Parser extraction failed for {}, trying raw decode: {}", path.display(), primary);

    decode_plain_text(path).map_err(|fallback| {
        AppError::ExtractionFailed(format!(
            "All text extraction methods failed. Original error: {}, Fallback error: {}",
            primary, fallback
        ))
    })
}

/// Async wrapper that runs [`extract_with_fallback`] on the blocking pool.
pub async fn extract_text(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || extract_with_fallback(&path)).await?
}

pub async fn supported(path: PathBuf) -> bool {
    tokio::task::spawn_blocking(move || is_supported(&path))
        .await
        .unwrap_or(false)
}

/// Reads the whole file as UTF-8. Anything containing NUL, or whose decoded
/// character count differs from its byte length, is rejected as binary.
pub fn decode_plain_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    if content.contains('\0') || content.chars().count() != bytes.len() {
        return Err(AppError::BinaryFile);
    }
    Ok(normalize(&content))
}

/// Collapses whitespace runs to one space, keeps blank-line paragraph breaks
/// as `\n\n`, and caps the result at [`MAX_EXTRACTED_CHARS`].
pub fn normalize(text: &str) -> String {
    let paragraphs: Vec<String> = paragraph_break()
        .split(text)
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect();
    let joined = paragraphs.join("\n\n");

    if joined.chars().count() <= MAX_EXTRACTED_CHARS {
        return joined;
    }
    let cut: String = joined.chars().take(MAX_EXTRACTED_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t\r\f\v]*\n\s*").expect("valid paragraph regex"))
}

fn extract_as(path: &Path, mime: &str) -> anyhow::Result<String> {
    let raw = match mime {
        MIME_PDF => read_pdf_text(path)?,
        MIME_DOCX => read_ooxml_text(path, OoxmlKind::Document)?,
        MIME_PPTX => read_ooxml_text(path, OoxmlKind::Presentation)?,
        MIME_XLSX => read_ooxml_text(path, OoxmlKind::Spreadsheet)?,
        "application/rtf" | "application/x-rtf" | "text/rtf" => {
            let source = fs::read_to_string(path).context("reading RTF source")?;
            strip_rtf(&source)
        }
        m if m.starts_with("text/") => fs::read_to_string(path).context("reading text file")?,
        other => bail!("No parser available for {}", other),
    };

    if raw.trim().is_empty() {
        bail!("No text content could be extracted from the file");
    }
    Ok(normalize(&raw))
}

fn read_pdf_text(path: &Path) -> anyhow::Result<String> {
    let doc = lopdf::Document::load(path).context("parsing PDF")?;
    let mut out = String::new();

    for page_id in doc.get_pages().values() {
        let page = doc.get_page_content(*page_id)?;
        let content = lopdf::content::Content::decode(&page)?;
        for operation in content.operations {
            if operation.operator != "Tj" && operation.operator != "TJ" {
                continue;
            }
            for operand in &operation.operands {
                push_pdf_string(operand, &mut out);
            }
            out.push('\n');
        }
        out.push_str("\n\n");
    }
    Ok(out)
}

fn push_pdf_string(operand: &lopdf::Object, out: &mut String) {
    match operand {
        lopdf::Object::String(bytes, _) => match std::str::from_utf8(bytes) {
            Ok(text) => out.push_str(text),
            Err(_) => out.extend(bytes.iter().map(|&b| char::from(b))),
        },
        // TJ arrays interleave strings with kerning offsets.
        lopdf::Object::Array(items) => {
            for item in items {
                push_pdf_string(item, out);
            }
        }
        _ => {}
    }
}

#[derive(Debug, Clone, Copy)]
enum OoxmlKind {
    Document,
    Presentation,
    Spreadsheet,
}

fn read_ooxml_text(path: &Path, kind: OoxmlKind) -> anyhow::Result<String> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).context("opening OOXML package")?;

    let mut parts: Vec<String> = match kind {
        OoxmlKind::Document => vec!["word/document.xml".to_string()],
        OoxmlKind::Spreadsheet => vec!["xl/sharedStrings.xml".to_string()],
        OoxmlKind::Presentation => archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .map(str::to_string)
            .collect(),
    };
    parts.sort_by_key(|name| slide_number(name));
    if parts.is_empty() {
        return Err(anyhow!("OOXML package has no text parts"));
    }

    let mut out = String::new();
    for name in parts {
        let mut xml = String::new();
        archive
            .by_name(&name)
            .with_context(|| format!("missing part {}", name))?
            .read_to_string(&mut xml)?;
        out.push_str(&xml_to_text(&xml));
        out.push_str("\n\n");
    }
    Ok(out)
}

fn slide_number(name: &str) -> u32 {
    name.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(0)
}

/// Turns WordprocessingML/DrawingML/SpreadsheetML into plain text: paragraph
/// and shared-string ends become blank lines, tags are dropped, entities decoded.
fn xml_to_text(xml: &str) -> String {
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let breaks = BREAKS.get_or_init(|| {
        Regex::new(r"</(?:w:p|a:p|si)>|<w:br\s*/>|<w:tab\s*/>").expect("valid break regex")
    });
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

    let with_breaks = breaks.replace_all(xml, |caps: &regex::Captures| {
        if caps[0].starts_with("<w:tab") {
            " ".to_string()
        } else {
            "\n\n".to_string()
        }
    });
    let stripped = tags.replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Drops RTF header groups and control words, keeping paragraph structure.
pub fn strip_rtf(source: &str) -> String {
    static HEADER_GROUPS: OnceLock<Regex> = OnceLock::new();
    static PARAGRAPHS: OnceLock<Regex> = OnceLock::new();
    static HEX: OnceLock<Regex> = OnceLock::new();
    static CONTROL: OnceLock<Regex> = OnceLock::new();

    let header_groups = HEADER_GROUPS.get_or_init(|| {
        Regex::new(r"\{\\(?:fonttbl|colortbl|stylesheet|info|\*)[^{}]*(?:\{[^{}]*\}[^{}]*)*\}")
            .expect("valid rtf group regex")
    });
    let paragraphs =
        PARAGRAPHS.get_or_init(|| Regex::new(r"\\(?:par|line)\b ?").expect("valid rtf par regex"));
    let hex = HEX.get_or_init(|| Regex::new(r"\\'([0-9a-fA-F]{2})").expect("valid rtf hex regex"));
    let control = CONTROL
        .get_or_init(|| Regex::new(r"\\[a-zA-Z]+-?\d* ?").expect("valid rtf control regex"));

    let text = header_groups.replace_all(source, "");
    let text = paragraphs.replace_all(&text, "\n\n");
    let text = hex.replace_all(&text, |caps: &regex::Captures| {
        u8::from_str_radix(&caps[1], 16)
            .map(|b| char::from(b).to_string())
            .unwrap_or_default()
    });
    let text = control.replace_all(&text, "");

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(&escaped) = chars.peek() {
                    if matches!(escaped, '\\' | '{' | '}') {
                        out.push(escaped);
                        chars.next();
                    }
                }
            }
            '{' | '}' => {}
            _ => out.push(c),
        }
    }
    out
}
