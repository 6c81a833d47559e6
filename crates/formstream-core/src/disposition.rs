//! Content-Disposition classification.
//!
//! Format: `form-data; name="field"; filename="file.txt"`

use encoding_rs::Encoding;

use crate::header::ParamHeader;

/// How a section should be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDisposition {
    /// A file upload: a `filename` (or `filename*`) parameter is present,
    /// possibly empty.
    FileField {
        /// Field name, when the client sent one.
        name: Option<String>,
        /// Client-supplied file name. Never used to build a storage path.
        filename: String,
    },
    /// An ordinary named form value.
    FormField {
        /// Field name.
        name: String,
    },
    /// Missing, unparsable, or not `form-data`. Skipped by the driver.
    Other,
}

impl ContentDisposition {
    /// Classify a section's Content-Disposition header.
    ///
    /// Never fails: anything unrecognized becomes [`ContentDisposition::Other`].
    #[must_use]
    pub fn parse(header: Option<&str>) -> Self {
        let Some(parsed) = header.and_then(ParamHeader::parse) else {
            return Self::Other;
        };
        if !parsed.value().eq_ignore_ascii_case("form-data") {
            return Self::Other;
        }

        let name = parsed.param("name").map(str::to_string);
        let filename = parsed
            .param("filename*")
            .and_then(decode_ext_value)
            .or_else(|| parsed.param("filename").map(str::to_string));

        match (name, filename) {
            (name, Some(filename)) => Self::FileField { name, filename },
            (Some(name), None) => Self::FormField { name },
            (None, None) => Self::Other,
        }
    }

    /// The field name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::FileField { name, .. } => name.as_deref(),
            Self::FormField { name } => Some(name),
            Self::Other => None,
        }
    }

    /// Returns true if this section is a file upload.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::FileField { .. })
    }

    /// Returns true if this section is a regular form field.
    #[must_use]
    pub fn is_form_field(&self) -> bool {
        matches!(self, Self::FormField { .. })
    }
}

/// Decode an RFC 5987 `ext-value`: `charset'[language]'percent-encoded`.
fn decode_ext_value(raw: &str) -> Option<String> {
    let mut pieces = raw.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;

    let encoding = Encoding::for_label(charset.trim().as_bytes())?;
    let bytes = percent_decode(encoded)?;
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes);
    (!had_errors).then(|| text.into_owned())
}

/// Percent-decode strictly: a stray `%` makes the whole value invalid.
fn percent_decode(s: &str) -> Option<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_digit(*bytes.get(i + 1)?)?;
            let lo = hex_digit(*bytes.get(i + 2)?)?;
            out.push(hi << 4 | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_field() {
        assert_eq!(
            ContentDisposition::parse(Some(r#"form-data; name="Name""#)),
            ContentDisposition::FormField {
                name: "Name".to_string()
            }
        );
    }

    #[test]
    fn file_field_with_mixed_case_params() {
        let d = ContentDisposition::parse(Some(r#"Form-Data; Name="file"; FileName="a.txt""#));
        assert_eq!(
            d,
            ContentDisposition::FileField {
                name: Some("file".to_string()),
                filename: "a.txt".to_string()
            }
        );
        assert!(d.is_file());
        assert_eq!(d.name(), Some("file"));
    }

    #[test]
    fn empty_filename_is_still_a_file() {
        let d = ContentDisposition::parse(Some(r#"form-data; name="upload"; filename="""#));
        assert!(d.is_file());
    }

    #[test]
    fn unquoted_tokens_are_accepted() {
        assert_eq!(
            ContentDisposition::parse(Some("form-data; name=age")),
            ContentDisposition::FormField {
                name: "age".to_string()
            }
        );
    }

    #[test]
    fn filename_star_is_preferred() {
        let d = ContentDisposition::parse(Some(
            "form-data; name=doc; filename=\"fallback.txt\"; filename*=UTF-8''na%C3%AFve.txt",
        ));
        assert_eq!(
            d,
            ContentDisposition::FileField {
                name: Some("doc".to_string()),
                filename: "naïve.txt".to_string()
            }
        );
    }

    #[test]
    fn broken_filename_star_falls_back() {
        let d = ContentDisposition::parse(Some(
            "form-data; name=doc; filename=plain.txt; filename*=UTF-8''bad%zz",
        ));
        assert_eq!(
            d,
            ContentDisposition::FileField {
                name: Some("doc".to_string()),
                filename: "plain.txt".to_string()
            }
        );
    }

    #[test]
    fn unrecognized_headers_are_other() {
        assert_eq!(ContentDisposition::parse(None), ContentDisposition::Other);
        assert_eq!(
            ContentDisposition::parse(Some("form-data; name=\"open")),
            ContentDisposition::Other
        );
        assert_eq!(
            ContentDisposition::parse(Some("attachment; filename=a.txt")),
            ContentDisposition::Other
        );
        assert_eq!(
            ContentDisposition::parse(Some("form-data")),
            ContentDisposition::Other
        );
        assert_eq!(ContentDisposition::Other.name(), None);
    }
}
