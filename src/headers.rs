//! Header fields and the incremental header-line parser.

use indexmap::IndexMap;

use crate::{Error, Result};

pub(crate) const CRLF: &[u8] = b"\r\n";

/// An insertion-ordered set of header fields.
///
/// Names are matched case-insensitively. Fields parsed off the wire are stored
/// under their lower-cased name; fields set by a handler keep the spelling
/// they were given, which is the spelling written to the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: IndexMap<String, Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    value: String,
}

impl Headers {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field value, ignoring the case of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(|field| field.value.as_str())
    }

    /// Add a field. When the name is already present the new value is
    /// appended to the existing one, separated by `", "`.
    ///
    /// Fails with [`Error::MalformedHeader`] if `name` is not a non-empty
    /// token or `value` contains CR or LF; the headers are left unchanged.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        check_name(&name)?;
        check_value(&value)?;
        self.merge(name, value);
        Ok(())
    }

    /// Set a field, replacing any existing value under the same name.
    ///
    /// A replaced field keeps its position. Validates like
    /// [`insert`](Self::insert).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        check_name(&name)?;
        check_value(&value)?;
        self.replace(name, value);
        Ok(())
    }

    fn merge(&mut self, name: String, value: String) {
        match self.fields.get_mut(&name.to_ascii_lowercase()) {
            Some(field) => {
                field.value.push_str(", ");
                field.value.push_str(&value);
            }
            None => {
                self.fields.insert(name.to_ascii_lowercase(), Field { name, value });
            }
        }
    }

    /// [`set`](Self::set) for fields the crate builds from known-good parts.
    pub(crate) fn replace(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        debug_assert!(check_name(&name).is_ok() && check_value(&value).is_ok());
        self.fields
            .insert(name.to_ascii_lowercase(), Field { name, value });
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields
            .shift_remove(&name.to_ascii_lowercase())
            .map(|field| field.value)
    }

    /// The number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .values()
            .map(|field| (field.name.as_str(), field.value.as_str()))
    }

    /// Parse one header line from the front of `data`.
    ///
    /// Returns how many bytes were consumed and whether the blank line that
    /// ends the header section was reached. `Ok((0, false))` means `data`
    /// does not hold a complete line yet. A malformed line consumes nothing.
    ///
    /// ```
    /// use wire_h1::Headers;
    ///
    /// let mut headers = Headers::new();
    /// let data = b"Host: localhost:42069\r\n\r\n";
    ///
    /// assert_eq!(headers.parse(data).unwrap(), (23, false));
    /// assert_eq!(headers.parse(&data[23..]).unwrap(), (2, true));
    /// assert_eq!(headers.get("host"), Some("localhost:42069"));
    /// ```
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool)> {
        let line_len = match find_crlf(data) {
            Some(idx) => idx,
            None => return Ok((0, false)),
        };

        if line_len == 0 {
            return Ok((CRLF.len(), true));
        }

        let (name, value) = parse_field(&data[..line_len])?;
        self.merge(name, value);

        Ok((line_len + CRLF.len(), false))
    }

    /// Serialize every field as `name: value\r\n`, followed by the blank
    /// terminator line.
    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        for (name, value) in self.iter() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(CRLF);
        }
        buf.extend_from_slice(CRLF);
    }
}

impl<N, V, const LEN: usize> TryFrom<[(N, V); LEN]> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    type Error = Error;

    /// Build headers from `(name, value)` pairs with [`Headers::insert`].
    fn try_from(pairs: [(N, V); LEN]) -> Result<Self> {
        let mut headers = Headers::new();
        for (name, value) in pairs {
            headers.insert(name, value)?;
        }
        Ok(headers)
    }
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|window| window == CRLF)
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::MalformedHeader(
            "field name must be at least one character long".to_owned(),
        ));
    }
    if !name.bytes().all(is_token) {
        return Err(Error::MalformedHeader(format!("invalid field name {:?}", name)));
    }
    Ok(())
}

fn check_value(value: &str) -> Result<()> {
    if value.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(Error::MalformedHeader(format!(
            "field value must not contain CR or LF: {:?}",
            value
        )));
    }
    Ok(())
}

fn parse_field(line: &[u8]) -> Result<(String, String)> {
    let colon = line.iter().position(|&b| b == b':').ok_or_else(|| {
        Error::MalformedHeader(format!(
            "expected a name: value pair but found {:?}",
            String::from_utf8_lossy(line)
        ))
    })?;

    let raw_name = &line[..colon];
    if raw_name.last().copied().map_or(false, is_ows) {
        return Err(Error::MalformedHeader(format!(
            "field name must not have whitespace before colon: {:?}",
            String::from_utf8_lossy(raw_name)
        )));
    }

    let name = trim_ows_start(raw_name);
    if name.is_empty() {
        return Err(Error::MalformedHeader(
            "field name must be at least one character long".to_owned(),
        ));
    }
    if !name.iter().copied().all(is_token) {
        return Err(Error::MalformedHeader(format!(
            "invalid field name {:?}",
            String::from_utf8_lossy(name)
        )));
    }
    let name = name
        .iter()
        .map(|b| char::from(b.to_ascii_lowercase()))
        .collect();

    let value = trim_ows_end(trim_ows_start(&line[colon + 1..]));
    let value = std::str::from_utf8(value)
        .map_err(|_| Error::MalformedHeader("field value is not valid UTF-8".to_owned()))?;
    check_value(value)?;

    Ok((name, value.to_owned()))
}

fn is_ows(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn trim_ows_start(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !is_ows(*first) {
            break;
        }
        bytes = rest;
    }
    bytes
}

fn trim_ows_end(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., last] = bytes {
        if !is_ows(*last) {
            break;
        }
        bytes = rest;
    }
    bytes
}
