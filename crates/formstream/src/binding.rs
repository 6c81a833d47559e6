//! Typed binding of accumulated form fields.
//!
//! Validation errors follow the FastAPI shape:
//!
//! ```json
//! {"detail": [{"type": "missing", "loc": ["form", "Name"], "msg": "Field required"}]}
//! ```

use std::collections::HashMap;
use std::fmt;

use formstream_core::FormFields;
use serde::{Serialize, Serializer};

/// One segment of an error location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocItem {
    /// Field name.
    Field(String),
    /// Position among repeated values.
    Index(usize),
}

impl LocItem {
    /// Create a field location item.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Create an index location item.
    #[must_use]
    pub fn index(idx: usize) -> Self {
        Self::Index(idx)
    }
}

impl From<&str> for LocItem {
    fn from(s: &str) -> Self {
        Self::Field(s.to_owned())
    }
}

impl From<usize> for LocItem {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl Serialize for LocItem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Field(s) => serializer.serialize_str(s),
            Self::Index(i) => serializer.serialize_u64(*i as u64),
        }
    }
}

/// Location of a form field: `["form", name]`.
#[must_use]
pub fn form_loc(name: &str) -> Vec<LocItem> {
    vec![LocItem::field("form"), LocItem::field(name)]
}

/// Error type identifiers.
pub mod error_types {
    /// Required field absent or empty.
    pub const MISSING: &str = "missing";
    /// Text was not an integer.
    pub const INT_PARSING: &str = "int_parsing";
    /// String longer than allowed.
    pub const STRING_TOO_LONG: &str = "string_too_long";
    /// Below the minimum.
    pub const GREATER_THAN_EQUAL: &str = "greater_than_equal";
    /// Above the maximum.
    pub const LESS_THAN_EQUAL: &str = "less_than_equal";
}

/// A single field validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Error type identifier, e.g. `missing`.
    #[serde(rename = "type")]
    pub error_type: &'static str,
    /// Where the failure occurred.
    pub loc: Vec<LocItem>,
    /// Human-readable message.
    pub msg: String,
    /// The offending input, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Constraint parameters, e.g. `{"le": "150"}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<HashMap<String, serde_json::Value>>,
}

impl ValidationError {
    /// Create an error with the default message for `error_type`.
    #[must_use]
    pub fn new(error_type: &'static str, loc: Vec<LocItem>) -> Self {
        let msg = match error_type {
            error_types::MISSING => "Field required",
            error_types::INT_PARSING => {
                "Input should be a valid integer, unable to parse string as an integer"
            }
            error_types::STRING_TOO_LONG => "String too long",
            _ => "Validation error",
        };
        Self {
            error_type,
            loc,
            msg: msg.to_owned(),
            input: None,
            ctx: None,
        }
    }

    /// Required field missing.
    #[must_use]
    pub fn missing(loc: Vec<LocItem>) -> Self {
        Self::new(error_types::MISSING, loc)
    }

    /// Text that should have been an integer.
    #[must_use]
    pub fn int_parsing(loc: Vec<LocItem>, input: &str) -> Self {
        Self::new(error_types::INT_PARSING, loc).with_input(serde_json::json!(input))
    }

    /// String longer than `max_length` characters.
    #[must_use]
    pub fn string_too_long(loc: Vec<LocItem>, max_length: usize) -> Self {
        Self::new(error_types::STRING_TOO_LONG, loc)
            .with_msg(format!(
                "String should have at most {max_length} character{}",
                if max_length == 1 { "" } else { "s" }
            ))
            .with_ctx_value("max_length", serde_json::json!(max_length))
    }

    /// Value below `min`.
    #[must_use]
    pub fn greater_than_equal<T: fmt::Display>(loc: Vec<LocItem>, min: T) -> Self {
        let min = min.to_string();
        Self::new(error_types::GREATER_THAN_EQUAL, loc)
            .with_msg(format!("Input should be greater than or equal to {min}"))
            .with_ctx_value("ge", serde_json::json!(min))
    }

    /// Value above `max`.
    #[must_use]
    pub fn less_than_equal<T: fmt::Display>(loc: Vec<LocItem>, max: T) -> Self {
        let max = max.to_string();
        Self::new(error_types::LESS_THAN_EQUAL, loc)
            .with_msg(format!("Input should be less than or equal to {max}"))
            .with_ctx_value("le", serde_json::json!(max))
    }

    /// Set the message.
    #[must_use]
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = msg.into();
        self
    }

    /// Set the offending input.
    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Add a context entry.
    #[must_use]
    pub fn with_ctx_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.ctx
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// All validation failures for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    /// The collected errors.
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create empty validation errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error.
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if there are any errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get an iterator over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// `{"detail": [...]}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "detail": self.errors })
    }

    /// `Err(self)` if any error was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error", self.errors.len())?;
        if self.errors.len() != 1 {
            write!(f, "s")?;
        }
        for error in &self.errors {
            let loc: Vec<String> = error
                .loc
                .iter()
                .map(|item| match item {
                    LocItem::Field(s) => s.clone(),
                    LocItem::Index(i) => i.to_string(),
                })
                .collect();
            write!(f, "\n  {}: {}", loc.join("."), error.msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Types that can be built from accumulated form fields.
pub trait FromFormFields: Sized {
    /// Bind and validate. All failures are reported together.
    fn from_form_fields(fields: &FormFields) -> Result<Self, ValidationErrors>;
}

/// First non-empty value for `name`. Empty text counts as absent.
fn non_empty<'a>(fields: &'a FormFields, name: &str) -> Option<&'a str> {
    fields.get(name).filter(|v| !v.is_empty())
}

/// The form sent alongside an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUploadRequest {
    /// Required, non-empty.
    pub name: String,
    /// Optional, `0..=150`.
    pub age: Option<i32>,
    /// Optional, at most [`Self::ZIPCODE_MAX_LEN`] characters.
    pub zipcode: Option<String>,
}

impl FileUploadRequest {
    /// Oldest accepted age.
    pub const AGE_MAX: i32 = 150;
    /// Longest accepted zipcode.
    pub const ZIPCODE_MAX_LEN: usize = 10;
}

impl FromFormFields for FileUploadRequest {
    fn from_form_fields(fields: &FormFields) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = non_empty(fields, "Name").map(str::to_owned);
        if name.is_none() {
            errors.push(ValidationError::missing(form_loc("Name")));
        }

        let age = match non_empty(fields, "Age").map(str::trim) {
            None => None,
            Some(raw) => match raw.parse::<i32>() {
                Ok(age) if age < 0 => {
                    errors.push(
                        ValidationError::greater_than_equal(form_loc("Age"), 0)
                            .with_input(serde_json::json!(raw)),
                    );
                    None
                }
                Ok(age) if age > Self::AGE_MAX => {
                    errors.push(
                        ValidationError::less_than_equal(form_loc("Age"), Self::AGE_MAX)
                            .with_input(serde_json::json!(raw)),
                    );
                    None
                }
                Ok(age) => Some(age),
                Err(_) => {
                    errors.push(ValidationError::int_parsing(form_loc("Age"), raw));
                    None
                }
            },
        };

        let zipcode = non_empty(fields, "Zipcode").map(str::to_owned);
        if zipcode
            .as_deref()
            .is_some_and(|z| z.chars().count() > Self::ZIPCODE_MAX_LEN)
        {
            errors.push(
                ValidationError::string_too_long(form_loc("Zipcode"), Self::ZIPCODE_MAX_LEN)
                    .with_input(serde_json::json!(zipcode)),
            );
        }

        errors.into_result()?;
        Ok(Self {
            name: name.unwrap_or_default(),
            age,
            zipcode,
        })
    }
}
