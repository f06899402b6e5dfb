use lopdf::{Object, StringFormat};

/// Decode a PDF text string (outline titles, info entries).
pub fn decode_text_string(bytes: &[u8]) -> String {
    // Check for UTF-16 BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let u16_chars: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|chunk| {
                if chunk.len() == 2 {
                    Some(u16::from_be_bytes([chunk[0], chunk[1]]))
                } else {
                    None
                }
            })
            .collect();
        String::from_utf16_lossy(&u16_chars)
    } else if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        // PDF 2.0 allows UTF-8 with a BOM
        String::from_utf8_lossy(&bytes[3..]).into_owned()
    } else {
        // PDFDocEncoding / Latin-1 (simplified)
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Encode a title as a PDF text string.
///
/// Printable ASCII stays a literal string so the output remains readable;
/// anything else is written as UTF-16BE with a byte order mark, which every
/// viewer understands.
pub fn encode_text_string(text: &str) -> Object {
    if text.bytes().all(|b| (0x20..0x7F).contains(&b)) {
        return Object::string_literal(text);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Normalise a title read from any source before it reaches the outline.
///
/// Control characters are dropped and whitespace runs collapse to a single
/// space. Invalid byte sequences are expected to have been replaced with
/// U+FFFD already, at the point the text was decoded.
pub fn sanitize_title(raw: &str) -> String {
    let mut title = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.chars() {
        if ch.is_whitespace() {
            pending_space = !title.is_empty();
        } else if ch.is_control() {
            continue;
        } else {
            if pending_space {
                title.push(' ');
                pending_space = false;
            }
            title.push(ch);
        }
    }

    title
}

/// Decode a line-oriented text file, replacing invalid UTF-8 deterministically.
pub fn decode_utf8_lossy(bytes: &[u8]) -> (String, bool) {
    match String::from_utf8_lossy(bytes) {
        std::borrow::Cow::Borrowed(s) => (s.to_string(), false),
        std::borrow::Cow::Owned(s) => (s, true),
    }
}
