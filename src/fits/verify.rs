//! Checks a [`Header`] against the FITS keyword rules before it is written.
//!
//! Problems cfitsio can live with are fixed with a warning (lower-case keywords, control
//! characters in comments). Values that cannot be represented in a FITS card are an error naming
//! the HDU.

use log::warn;

use super::keywords::{self, COMMENT_SUFFIX};
use crate::hdu::{Header, HeaderValue};

/// Longest keyword written as a plain card, longer ones use the HIERARCH convention.
pub const KEYWORD_LEN: usize = 8;

/// A keyword ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword<'a> {
    pub key: String,
    pub value: &'a HeaderValue,
    pub comment: Option<String>,
}

impl Keyword<'_> {
    /// Keywords that do not fit in the eight character name field.
    #[must_use]
    pub fn is_hierarch(&self) -> bool {
        self.key.len() > KEYWORD_LEN || !self.key.bytes().all(is_standard_char)
    }
}

/// The writable content of a header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verified<'a> {
    pub keywords: Vec<Keyword<'a>>,
    pub comment: Vec<String>,
    pub history: Vec<String>,
}

fn is_standard_char(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_' || b == b'-'
}

fn is_printable(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

/// Replace characters a card cannot hold.
fn printable(hdu: &str, what: &str, s: &str) -> String {
    if is_printable(s) {
        return s.to_string();
    }

    warn!("{hdu}: replacing non-printable characters in {what}");
    s.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

fn check_key(hdu: &str, key: &str) -> Result<String, anyhow::Error> {
    let trimmed = key.trim();
    ensure!(!trimmed.is_empty(), "HDU {}: empty keyword", hdu);

    let upper = trimmed.to_ascii_uppercase();
    if upper != key {
        warn!("{hdu}: keyword {key:?} written as {upper:?}");
    }

    // Spaces and dots only occur in HIERARCH keywords.
    ensure!(
        upper.bytes().all(|b| is_standard_char(b) || b == b' ' || b == b'.'),
        "HDU {}: keyword {:?} contains illegal characters",
        hdu,
        key
    );

    Ok(upper)
}

fn check_value(hdu: &str, key: &str, value: &HeaderValue) -> Result<(), anyhow::Error> {
    match value {
        HeaderValue::Float(v) => ensure!(
            v.is_finite(),
            "HDU {}: keyword {} has non-finite value {}",
            hdu,
            key,
            v
        ),
        HeaderValue::Str(s) => ensure!(
            is_printable(s),
            "HDU {}: keyword {} has a value with non-printable or non-ASCII characters",
            hdu,
            key
        ),
        HeaderValue::Bool(_) | HeaderValue::Int(_) => (),
    }

    Ok(())
}

/// Verify and fix the header of HDU `hdu`. Reserved keywords, commentary keywords and stray
/// `<KEY>_COMMENT` entries are left out, the writer derives or handles those itself.
pub fn verify<'a>(hdu: &str, header: &'a Header) -> Result<Verified<'a>, anyhow::Error> {
    let mut out = Verified::default();

    for card in header.cards() {
        let key = check_key(hdu, &card.key)?;

        if keywords::is_reserved(&key) || keywords::is_commentary(&key) {
            continue;
        }
        if key.ends_with(COMMENT_SUFFIX) {
            continue;
        }
        if out.keywords.iter().any(|k| k.key == key) {
            warn!("{hdu}: duplicate keyword {key} after upper-casing, keeping the first");
            continue;
        }

        check_value(hdu, &key, &card.value)?;

        let comment = card
            .comment
            .as_deref()
            .map(|c| printable(hdu, &format!("comment of {key}"), c));

        out.keywords.push(Keyword {
            key,
            value: &card.value,
            comment,
        });
    }

    out.comment = header
        .comment()
        .iter()
        .map(|c| printable(hdu, "COMMENT", c))
        .collect();
    out.history = header
        .history()
        .iter()
        .map(|h| printable(hdu, "HISTORY", h))
        .collect();

    Ok(out)
}
