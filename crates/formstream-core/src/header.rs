//! Parameterized header values.
//!
//! Content-Type and Content-Disposition share one grammar:
//! `value *( ";" name "=" ( token / quoted-string ) )`. Parameter names are
//! case-insensitive. Quoted strings may contain `;` and backslash escapes.

/// A header value split into its leading value and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamHeader {
    value: String,
    params: Vec<(String, String)>,
}

impl ParamHeader {
    /// Parse a header value. Returns `None` when the text does not follow the
    /// grammar (empty leading value, unterminated quote, parameter without
    /// `=`, and so on).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let mut cursor = Cursor::new(input);
        cursor.skip_whitespace();
        let value = cursor.take_while(|c| c != ';').trim();
        if value.is_empty() || value.contains(|c: char| c == '"' || c.is_whitespace()) {
            return None;
        }

        let mut params = Vec::new();
        loop {
            cursor.skip_whitespace();
            match cursor.next() {
                None => break,
                Some(';') => {}
                Some(_) => return None,
            }
            cursor.skip_whitespace();
            if cursor.is_empty() {
                // Trailing semicolon.
                break;
            }

            let name = cursor.take_while(|c| c != '=' && c != ';' && !c.is_whitespace());
            if name.is_empty() {
                return None;
            }
            cursor.skip_whitespace();
            if cursor.next() != Some('=') {
                return None;
            }
            cursor.skip_whitespace();
            let param_value = if cursor.peek() == Some('"') {
                cursor.quoted_string()?
            } else {
                let token = cursor.take_while(|c| c != ';' && !c.is_whitespace());
                if token.contains('"') {
                    return None;
                }
                token.to_string()
            };
            params.push((name.to_string(), param_value));
        }

        Some(Self {
            value: value.to_string(),
            params,
        })
    }

    /// The leading value, e.g. `multipart/form-data` or `form-data`.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Look up a parameter by name (case-insensitive). The first occurrence
    /// wins.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(name, value)` pairs in declaration order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.rest = &self.rest[c.len_utf8()..];
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn take_while(&mut self, mut keep: impl FnMut(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !keep(c))
            .map_or(self.rest.len(), |(i, _)| i);
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        taken
    }

    /// Consume a quoted string, including both quotes, and return its
    /// unescaped content.
    fn quoted_string(&mut self) -> Option<String> {
        if self.next() != Some('"') {
            return None;
        }
        let mut out = String::new();
        loop {
            match self.next()? {
                '"' => return Some(out),
                '\\' => out.push(self.next()?),
                c => out.push(c),
            }
        }
    }
}
