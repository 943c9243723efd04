//! Turning raw response bytes into the text or binary body a caller sees.

use std::borrow::Cow;
use std::io::{self, Read};

use encoding_rs::{Encoding, UTF_8};
use flate2::read::GzDecoder;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, TRANSFER_ENCODING};
use http::HeaderMap;

const OCTET_STREAM: &str = "application/octet-stream";
const CHARSET_MARKER: &str = "Charset";

// WHATWG folds these into windows-1252; here they keep their ISO meaning
const LATIN1_LABELS: [&str; 11] = [
    "iso-8859-1",
    "iso8859-1",
    "iso_8859-1",
    "iso_8859-1:1987",
    "iso8859_1",
    "latin1",
    "l1",
    "cp819",
    "ibm819",
    "iso-ir-100",
    "csisolatin1",
];

/// How body bytes become text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCharset {
    /// Every byte is the code point of the same value.
    Latin1,
    Encoding(&'static Encoding),
}

impl TextCharset {
    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        match self {
            Self::Latin1 => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Encoding(encoding) => {
                let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
                if had_errors {
                    log::debug!("malformed {} sequences replaced while decoding body", encoding.name());
                }
                text
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: http::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn is_octet_stream(headers: &HeaderMap) -> bool {
    header_str(headers, CONTENT_TYPE)
        .map(|content_type| content_type.to_ascii_lowercase().contains(OCTET_STREAM))
        .unwrap_or(false)
}

pub fn is_gzip(headers: &HeaderMap) -> bool {
    [CONTENT_ENCODING, TRANSFER_ENCODING]
        .into_iter()
        .filter_map(|name| header_str(headers, name))
        .any(|encoding| encoding.contains("gzip"))
}

/// Charset named after the `Charset` marker in `Content-Type`, UTF-8 otherwise.
pub fn charset(headers: &HeaderMap) -> io::Result<TextCharset> {
    let utf8 = Ok(TextCharset::Encoding(UTF_8));
    let Some(content_type) = header_str(headers, CONTENT_TYPE) else {
        return utf8;
    };
    let Some(position) = content_type.find(CHARSET_MARKER) else {
        return utf8;
    };

    // Skips the marker and the '=' after it
    let label = content_type.get(position + CHARSET_MARKER.len() + 1..).unwrap_or("").trim();
    if LATIN1_LABELS.iter().any(|latin1| latin1.eq_ignore_ascii_case(label)) {
        return Ok(TextCharset::Latin1);
    }
    Encoding::for_label(label.as_bytes())
        .map(TextCharset::Encoding)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("unsupported charset: {label}")))
}

/// Every line of `text` followed by `\n`, including the last one.
pub fn rejoin_lines(text: &str) -> String {
    let mut joined = String::with_capacity(text.len() + 1);
    let mut rest = text;

    while !rest.is_empty() {
        let (line, remainder) = match rest.find(['\n', '\r']) {
            Some(end) if rest[end..].starts_with("\r\n") => (&rest[..end], &rest[end + 2..]),
            Some(end) => (&rest[..end], &rest[end + 1..]),
            None => (rest, ""),
        };
        joined.push_str(line);
        joined.push('\n');
        rest = remainder;
    }

    joined
}

/// Gunzips if the headers say so, decodes with the declared charset and re-joins lines.
pub fn decode_text(headers: &HeaderMap, raw: Vec<u8>) -> io::Result<String> {
    let bytes = if is_gzip(headers) {
        let mut inflated = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
        inflated
    } else {
        raw
    };

    let text = charset(headers)?.decode(&bytes);
    Ok(rejoin_lines(&text))
}
