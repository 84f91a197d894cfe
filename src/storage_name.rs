//! Storage file names for attribute-bound uploads.
//!
//! A stored file is named `{attribute}~{position}~{originalName}`. While a
//! save is in progress the name carries a leading `.`, which hides it from
//! listings that drop hidden entries.

use std::fmt;
use std::str::FromStr;

use crate::StoreError;

/// Separator between the fields of a storage name.
pub const FIELD_SEPARATOR: char = '~';

/// Parsed storage file name.
///
/// ```rust
/// use anystore::StorageName;
///
/// let name: StorageName = "avatar~0~me.png".parse().unwrap();
/// assert_eq!(name.attribute(), "avatar");
/// assert_eq!(name.position(), 0);
/// assert_eq!(name.original_name(), "me.png");
/// assert_eq!(name.to_transient().to_string(), ".avatar~0~me.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageName {
    attribute: String,
    position: u32,
    original_name: String,
    transient: bool,
}

impl StorageName {
    /// Final name for the upload at `position` of `attribute`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidPath`] if a field is empty, or contains a
    ///   separator the grammar reserves
    pub fn new(
        attribute: impl Into<String>,
        position: u32,
        original_name: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let name = Self {
            attribute: attribute.into(),
            position,
            original_name: original_name.into(),
            transient: false,
        };
        name.validate()?;
        Ok(name)
    }

    fn validate(&self) -> Result<(), StoreError> {
        let invalid = |reason| StoreError::InvalidPath {
            path: self.to_string(),
            reason,
        };
        if self.attribute.is_empty() || self.attribute.starts_with('.') {
            return Err(invalid("attribute must be non-empty and not start with '.'"));
        }
        if self.attribute.contains([FIELD_SEPARATOR, '/']) {
            return Err(invalid("attribute may not contain '~' or '/'"));
        }
        if self.original_name.is_empty() || self.original_name.contains(['/', '\0']) {
            return Err(invalid("original name must be a single non-empty segment"));
        }
        Ok(())
    }

    /// Parse a file name.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidPath`] if `input` does not follow the grammar
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        let malformed = || StoreError::InvalidPath {
            path: input.to_owned(),
            reason: "expected {attribute}~{position}~{name}",
        };
        let (transient, body) = match input.strip_prefix('.') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let mut fields = body.splitn(3, FIELD_SEPARATOR);
        let attribute = fields.next().ok_or_else(malformed)?;
        let position = fields.next().ok_or_else(malformed)?;
        let original_name = fields.next().ok_or_else(malformed)?;
        if position.is_empty() || !position.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if position.len() > 1 && position.starts_with('0') {
            return Err(malformed());
        }
        let position = position.parse().map_err(|_| malformed())?;
        let mut name = Self::new(attribute, position, original_name).map_err(|_| malformed())?;
        name.transient = transient;
        Ok(name)
    }

    /// Attribute the file belongs to.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Position among the attribute's files.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Name the file was uploaded with.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Returns `true` while a save is in progress.
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// The in-progress form of this name.
    pub fn to_transient(&self) -> Self {
        Self {
            transient: true,
            ..self.clone()
        }
    }

    /// The committed form of this name.
    pub fn to_final(&self) -> Self {
        Self {
            transient: false,
            ..self.clone()
        }
    }

    /// Same file at another position.
    pub fn with_position(&self, position: u32) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

impl fmt::Display for StorageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.transient {
            f.write_str(".")?;
        }
        write!(
            f,
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
            self.attribute, self.position, self.original_name
        )
    }
}

impl FromStr for StorageName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StorageName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StorageName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips() {
        for raw in ["photo~3~holiday.jpg", ".doc~0~a~b.pdf", "x~12~y"] {
            assert_eq!(StorageName::parse(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn original_name_may_contain_separator() {
        let name = StorageName::parse("doc~1~draft~v2.txt").unwrap();
        assert_eq!(name.original_name(), "draft~v2.txt");
    }

    #[test]
    fn transient_prefix() {
        let name = StorageName::parse(".img~2~a.png").unwrap();
        assert!(name.is_transient());
        assert_eq!(name.to_final().to_string(), "img~2~a.png");
        assert_eq!(name.to_final().to_transient(), name);
    }

    #[test]
    fn malformed_names_are_rejected() {
        for raw in ["", "plain.txt", "a~b~c", "a~~c", "~1~c", "a~1~", "..a~1~c", "a/b~1~c"] {
            assert!(StorageName::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn position_has_one_spelling() {
        for raw in ["a~007~c", "a~00~c", ".a~01~c"] {
            assert!(StorageName::parse(raw).is_err(), "accepted {raw:?}");
        }
        assert_eq!(StorageName::parse("a~0~c").unwrap().position(), 0);
        assert_eq!(StorageName::parse("a~10~c").unwrap().position(), 10);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_goes_through_parse() {
        let name = StorageName::parse(".photo~3~a.jpg").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, r#"".photo~3~a.jpg""#);
        assert_eq!(serde_json::from_str::<StorageName>(&json).unwrap(), name);
        for raw in [r#""a~007~c""#, r#""plain.txt""#, r#""a~1~x/y""#] {
            assert!(serde_json::from_str::<StorageName>(raw).is_err(), "accepted {raw}");
        }
    }

    #[test]
    fn new_rejects_nested_names() {
        assert!(StorageName::new("a", 0, "dir/file").is_err());
        assert!(StorageName::new("a~b", 0, "file").is_err());
    }

    #[test]
    fn with_position_keeps_other_fields() {
        let name = StorageName::new("gallery", 0, "a.jpg").unwrap().with_position(7);
        assert_eq!(name.to_string(), "gallery~7~a.jpg");
    }
}
