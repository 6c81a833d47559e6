//! Text decoding for form-field sections.

use encoding_rs::{Encoding, UTF_8};

use crate::header::ParamHeader;

/// Labels of UTF-7, which is never honored. It can smuggle `<`, `"` and
/// CR/LF past ASCII-level checks.
const UTF7_LABELS: &[&str] = &[
    "utf-7",
    "utf7",
    "csunicode11utf7",
    "unicode-1-1-utf-7",
    "unicode-2-0-utf-7",
    "x-unicode20utf7",
];

/// Pick the encoding for a section from its Content-Type.
///
/// Labels are resolved through the WHATWG Encoding Standard, so aliases map
/// to their registry encoding: `iso-8859-1`, `latin1` and `us-ascii` all
/// resolve to windows-1252, where byte 0x80 decodes to U+20AC rather than
/// U+0080. Falls back to UTF-8 when the header is missing or unparsable,
/// declares no charset, declares UTF-7, or names a label the registry does
/// not know.
#[must_use]
pub fn resolve_charset(content_type: Option<&str>) -> &'static Encoding {
    let Some(label) = content_type
        .and_then(ParamHeader::parse)
        .and_then(|h| h.param("charset").map(|c| c.trim().to_string()))
    else {
        return UTF_8;
    };
    if UTF7_LABELS.iter().any(|l| l.eq_ignore_ascii_case(&label)) {
        return UTF_8;
    }
    Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8)
}

/// Decode a complete field value. A leading byte-order mark overrides
/// `encoding`; malformed sequences become U+FFFD.
#[must_use]
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
