use std::fmt;

/// A scalar header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Bool(true) => f.write_str("T"),
            HeaderValue::Bool(false) => f.write_str("F"),
            HeaderValue::Int(v) => write!(f, "{v}"),
            HeaderValue::Float(v) => write!(f, "{v:?}"),
            HeaderValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<i32> for HeaderValue {
    fn from(v: i32) -> Self {
        HeaderValue::Int(v.into())
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Str(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Str(v)
    }
}

/// A keyword with its value and optional inline comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub key: String,
    pub value: HeaderValue,
    pub comment: Option<String>,
}

/// Ordered keyword/value pairs plus the free-text COMMENT and HISTORY sequences of one HDU.
///
/// Keywords are unique; inserting an existing keyword replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
    comment: Vec<String>,
    history: Vec<String>,
}

impl Header {
    #[must_use]
    pub fn new() -> Header {
        Header::default()
    }

    /// Insert or replace `key`, keeping any existing comment.
    pub fn insert<V: Into<HeaderValue>>(&mut self, key: &str, value: V) {
        let value = value.into();
        match self.cards.iter_mut().find(|c| c.key == key) {
            Some(c) => c.value = value,
            None => self.cards.push(Card {
                key: key.to_string(),
                value,
                comment: None,
            }),
        }
    }

    /// Insert or replace `key` together with its inline comment.
    pub fn insert_with_comment<V: Into<HeaderValue>>(&mut self, key: &str, value: V, comment: &str) {
        self.insert(key, value);
        self.set_comment(key, comment);
    }

    /// Attach an inline comment to an existing keyword. Empty comments clear it.
    /// Returns `false` if the keyword does not exist.
    pub fn set_comment(&mut self, key: &str, comment: &str) -> bool {
        match self.cards.iter_mut().find(|c| c.key == key) {
            Some(c) => {
                c.comment = if comment.is_empty() {
                    None
                } else {
                    Some(comment.to_string())
                };
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.card(key).map(|c| &c.value)
    }

    #[must_use]
    pub fn card(&self, key: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.key == key)
    }

    #[must_use]
    pub fn comment_of(&self, key: &str) -> Option<&str> {
        self.card(key).and_then(|c| c.comment.as_deref())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.card(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Card> {
        let i = self.cards.iter().position(|c| c.key == key)?;
        Some(self.cards.remove(i))
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|c| c.key.as_str())
    }

    /// Number of keywords. COMMENT and HISTORY lines are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// `true` without keywords, like [`len`](Header::len) it ignores COMMENT and HISTORY.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// `true` without keywords, COMMENT and HISTORY lines.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.is_empty() && self.comment.is_empty() && self.history.is_empty()
    }

    pub fn add_comment(&mut self, line: &str) {
        self.comment.push(line.to_string());
    }

    pub fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }

    #[must_use]
    pub fn comment(&self) -> &[String] {
        &self.comment
    }

    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_replaces() {
        let mut h = Header::new();
        h.insert("OBJECT", "M31");
        h.insert_with_comment("EXPTIME", 30.0, "seconds");
        h.insert("OBJECT", "M33");

        assert_eq!(h.keys().collect::<Vec<_>>(), vec!["OBJECT", "EXPTIME"]);
        assert_eq!(h.get("OBJECT"), Some(&HeaderValue::from("M33")));
        assert_eq!(h.comment_of("EXPTIME"), Some("seconds"));
        assert_eq!(h.comment_of("OBJECT"), None);
    }

    #[test]
    fn comment_requires_key() {
        let mut h = Header::new();
        assert!(!h.set_comment("MISSING", "nope"));
        h.insert("A", 1);
        assert!(h.set_comment("A", "one"));
        assert!(h.set_comment("A", ""));
        assert_eq!(h.comment_of("A"), None);
    }

    #[test]
    fn comment_and_history() {
        let mut h = Header::new();
        assert!(h.is_blank());
        h.add_history("created");
        h.add_comment("first");
        h.add_comment("second");
        assert_eq!(h.history(), &["created".to_string()]);
        assert_eq!(h.comment().len(), 2);
        assert_eq!(h.len(), 0);
        assert!(h.is_empty());
        assert!(!h.is_blank());

        h.insert("A", 1);
        assert_eq!(h.len(), 1);
        assert!(!h.is_empty());
    }

    #[test]
    fn display() {
        assert_eq!(HeaderValue::Bool(true).to_string(), "T");
        assert_eq!(HeaderValue::Float(1.0).to_string(), "1.0");
        assert_eq!(HeaderValue::Int(-3).to_string(), "-3");
    }
}
