//! MIME type sniffing from a blob's leading bytes.
//!
//! Follows the WHATWG MIME Sniffing algorithm in the same order browsers do:
//! markup first (after leading whitespace), then exact and masked binary
//! signatures, then a plain-text fallback when no binary bytes appear.

/// Number of leading bytes considered when sniffing.
pub const SNIFF_LEN: usize = 512;

/// Fallback type for unknown or unreadable content.
pub const OCTET_STREAM: &str = "application/octet-stream";

const TEXT_HTML: &str = "text/html; charset=utf-8";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Tags that identify HTML when they open the document (case-insensitive,
/// followed by a space or `>`).
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

struct Masked {
    mask: &'static [u8],
    pattern: &'static [u8],
    content_type: &'static str,
}

struct Exact {
    prefix: &'static [u8],
    content_type: &'static str,
}

const EXACT: &[Exact] = &[
    Exact { prefix: b"%PDF-", content_type: "application/pdf" },
    Exact { prefix: b"%!PS-Adobe-", content_type: "application/postscript" },
    Exact { prefix: b"\xFE\xFF", content_type: "text/plain; charset=utf-16be" },
    Exact { prefix: b"\xFF\xFE", content_type: "text/plain; charset=utf-16le" },
    Exact { prefix: b"\xEF\xBB\xBF", content_type: TEXT_PLAIN },
    Exact { prefix: b"GIF87a", content_type: "image/gif" },
    Exact { prefix: b"GIF89a", content_type: "image/gif" },
    Exact { prefix: b"\x89PNG\x0D\x0A\x1A\x0A", content_type: "image/png" },
    Exact { prefix: b"\xFF\xD8\xFF", content_type: "image/jpeg" },
    Exact { prefix: b"BM", content_type: "image/bmp" },
    Exact { prefix: b"\x00\x00\x01\x00", content_type: "image/x-icon" },
    Exact { prefix: b"\x00\x00\x02\x00", content_type: "image/x-icon" },
    Exact { prefix: b"ID3", content_type: "audio/mpeg" },
    Exact { prefix: b"OggS\x00", content_type: "application/ogg" },
    Exact { prefix: b"MThd\x00\x00\x00\x06", content_type: "audio/midi" },
    Exact { prefix: b"\x1A\x45\xDF\xA3", content_type: "video/webm" },
    Exact { prefix: b"\x00\x01\x00\x00", content_type: "font/ttf" },
    Exact { prefix: b"OTTO", content_type: "font/otf" },
    Exact { prefix: b"ttcf", content_type: "font/collection" },
    Exact { prefix: b"wOFF", content_type: "font/woff" },
    Exact { prefix: b"wOF2", content_type: "font/woff2" },
    Exact { prefix: b"\x1F\x8B\x08", content_type: "application/x-gzip" },
    Exact { prefix: b"PK\x03\x04", content_type: "application/zip" },
    Exact { prefix: b"Rar!\x1A\x07\x00", content_type: "application/x-rar-compressed" },
    Exact { prefix: b"Rar!\x1A\x07\x01\x00", content_type: "application/x-rar-compressed" },
    Exact { prefix: b"\x00asm", content_type: "application/wasm" },
];

const MASKED: &[Masked] = &[
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        content_type: "image/webp",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        content_type: "audio/aiff",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        content_type: "video/avi",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        content_type: "audio/wave",
    },
];

/// Infer a MIME type from the first bytes of some content.
///
/// Only the first [`SNIFF_LEN`] bytes are examined. Empty input yields
/// [`OCTET_STREAM`].
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    if data.is_empty() {
        return OCTET_STREAM;
    }
    let data = &data[..data.len().min(SNIFF_LEN)];

    let trimmed = skip_whitespace(data);
    if HTML_TAGS.iter().any(|tag| is_html_tag(trimmed, tag)) {
        return TEXT_HTML;
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if let Some(sig) = EXACT.iter().find(|sig| data.starts_with(sig.prefix)) {
        return sig.content_type;
    }
    if let Some(sig) = MASKED.iter().find(|sig| masked_match(data, sig)) {
        return sig.content_type;
    }
    if is_mp4(data) {
        return "video/mp4";
    }

    if data.iter().any(|&b| is_binary_byte(b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn is_html_tag(data: &[u8], tag: &[u8]) -> bool {
    if data.len() < tag.len() + 1 {
        return false;
    }
    let matches = data
        .iter()
        .zip(tag)
        .all(|(d, t)| d.to_ascii_uppercase() == *t);
    matches && matches!(data[tag.len()], b' ' | b'>')
}

fn masked_match(data: &[u8], sig: &Masked) -> bool {
    data.len() >= sig.pattern.len()
        && data
            .iter()
            .zip(sig.mask.iter().zip(sig.pattern))
            .all(|(d, (m, p))| d & m == *p)
}

/// ISO base media file: an `ftyp` box whose brands include `mp4`.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|&offset| offset != 12)
        .any(|offset| data.get(offset..offset + 3) == Some(b"mp4".as_slice()))
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
