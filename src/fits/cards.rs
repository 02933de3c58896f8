//! Parsing of 80 character FITS header cards.

use log::warn;

use super::keywords;
use crate::hdu::{Header, HeaderValue};

pub const CARD_LEN: usize = 80;

/// One parsed header card.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Blank,
    End,
    Comment(String),
    History(String),
    /// A `CONTINUE` card of the long string convention.
    Continue(String, Option<String>),
    /// `None` value for undefined keywords (`KEY =` with nothing after it).
    Keyword {
        key: String,
        value: Option<HeaderValue>,
        comment: Option<String>,
    },
}

/// Split a value field (everything after `= `) into value and comment.
fn parse_value_field(field: &str) -> (Option<HeaderValue>, Option<String>) {
    let trimmed = field.trim_start();

    let (value, rest) = if let Some(quoted) = trimmed.strip_prefix('\'') {
        let (s, rest) = parse_quoted(quoted);
        (Some(HeaderValue::Str(s)), rest)
    } else {
        match trimmed.find('/') {
            Some(i) => (parse_token(&trimmed[..i]), &trimmed[i..]),
            None => (parse_token(trimmed), ""),
        }
    };

    let comment = rest
        .trim_start()
        .strip_prefix('/')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    (value, comment)
}

/// Read a quoted string (opening quote already stripped), `''` is an escaped quote. Returns the
/// string with trailing blanks removed and the remainder of the field after the closing quote.
fn parse_quoted(s: &str) -> (String, &str) {
    let mut out = String::new();
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if let Some((_, '\'')) = chars.peek() {
                out.push('\'');
                chars.next();
            } else {
                return (out.trim_end().to_string(), &s[i + 1..]);
            }
        } else {
            out.push(c);
        }
    }

    // Unterminated string, keep what we have.
    (out.trim_end().to_string(), "")
}

fn parse_token(token: &str) -> Option<HeaderValue> {
    let token = token.trim();

    if token.is_empty() {
        return None;
    }

    Some(match token {
        "T" => HeaderValue::Bool(true),
        "F" => HeaderValue::Bool(false),
        _ => {
            if let Ok(v) = token.parse::<i64>() {
                HeaderValue::Int(v)
            } else if let Ok(v) = token.replace(['D', 'd'], "E").parse::<f64>() {
                HeaderValue::Float(v)
            } else {
                // Complex values and anything else non-standard.
                HeaderValue::Str(token.to_string())
            }
        }
    })
}

/// Parse a single card. Cards shorter than 80 characters are treated as blank padded.
#[must_use]
pub fn parse_card(card: &str) -> Record {
    let card = card.trim_end_matches(['\0', '\n']);
    let name = card.get(..8).unwrap_or(card).trim_end();
    let rest = card.get(8..).unwrap_or("");

    match name {
        "" => {
            if rest.trim().is_empty() {
                Record::Blank
            } else {
                Record::Comment(rest.trim_end().to_string())
            }
        }
        "END" => Record::End,
        "COMMENT" => Record::Comment(rest.trim_end().to_string()),
        "HISTORY" => Record::History(rest.trim_end().to_string()),
        "CONTINUE" => match parse_value_field(rest) {
            (Some(HeaderValue::Str(s)), comment) => Record::Continue(s, comment),
            _ => Record::Comment(rest.trim_end().to_string()),
        },
        "HIERARCH" => match rest.split_once('=') {
            Some((key, field)) => {
                let (value, comment) = parse_value_field(field);
                Record::Keyword {
                    key: key.trim().to_string(),
                    value,
                    comment,
                }
            }
            None => Record::Comment(card.trim_end().to_string()),
        },
        key => match rest.strip_prefix("= ").or_else(|| rest.strip_prefix('=')) {
            Some(field) => {
                let (value, comment) = parse_value_field(field);
                Record::Keyword {
                    key: key.to_string(),
                    value,
                    comment,
                }
            }
            // Keyword without value indicator: commentary text.
            None => Record::Comment(rest.trim_end().to_string()),
        },
    }
}

/// Parse a sequence of cards, stopping at `END` and joining long strings continued with `&`.
#[must_use]
pub fn parse_cards<I, S>(cards: I) -> Vec<Record>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<Record> = Vec::new();

    for card in cards {
        let r = parse_card(card.as_ref());

        match r {
            Record::End => break,
            Record::Continue(s, comment) => {
                if let Some(Record::Keyword {
                    value: Some(HeaderValue::Str(v)),
                    comment: c,
                    ..
                }) = out.last_mut()
                {
                    if let Some(head) = v.strip_suffix('&') {
                        *v = format!("{head}{s}");
                        if let Some(comment) = comment {
                            *c = Some(match c.take() {
                                Some(prev) => format!("{prev} {comment}"),
                                None => comment,
                            });
                        }
                        continue;
                    }
                }
                warn!("CONTINUE card without a preceding long string, kept as comment");
                out.push(Record::Comment(s));
            }
            r => out.push(r),
        }
    }

    out
}

/// Look up the value of a keyword among parsed records.
#[must_use]
pub fn find<'a>(records: &'a [Record], key: &str) -> Option<&'a HeaderValue> {
    records.iter().find_map(|r| match r {
        Record::Keyword {
            key: k,
            value: Some(v),
            ..
        } if k == key => Some(v),
        _ => None,
    })
}

#[must_use]
pub fn find_str<'a>(records: &'a [Record], key: &str) -> Option<&'a str> {
    match find(records, key) {
        Some(HeaderValue::Str(s)) => Some(s.as_str()),
        _ => None,
    }
}

#[must_use]
pub fn find_int(records: &[Record], key: &str) -> Option<i64> {
    match find(records, key) {
        Some(HeaderValue::Int(v)) => Some(*v),
        _ => None,
    }
}

/// Build a [`Header`] from parsed records: reserved keywords, blank cards and undefined values
/// are dropped, COMMENT and HISTORY go to their own sequences.
#[must_use]
pub fn to_header(records: &[Record]) -> Header {
    let mut header = Header::new();

    for r in records {
        match r {
            Record::Comment(c) if keywords::is_standard_comment(c) => (),
            Record::Comment(c) => header.add_comment(c.trim()),
            Record::History(h) => header.add_history(h.trim()),
            Record::Keyword {
                key,
                value: Some(value),
                comment,
            } if !keywords::is_reserved(key) => {
                header.insert(key, value.clone());
                if let Some(c) = comment {
                    header.set_comment(key, c);
                }
            }
            _ => (),
        }
    }

    header
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(s: &str) -> String {
        format!("{s:<80}")
    }

    #[test]
    fn values() {
        assert_eq!(
            parse_card(&card("SIMPLE  =                    T / conforms to FITS standard")),
            Record::Keyword {
                key: "SIMPLE".into(),
                value: Some(HeaderValue::Bool(true)),
                comment: Some("conforms to FITS standard".into())
            }
        );
        assert_eq!(
            parse_card(&card("NAXIS1  =                 1024")),
            Record::Keyword {
                key: "NAXIS1".into(),
                value: Some(HeaderValue::Int(1024)),
                comment: None
            }
        );
        assert_eq!(
            parse_card(&card("EXPTIME =              1.5D+02 / seconds")),
            Record::Keyword {
                key: "EXPTIME".into(),
                value: Some(HeaderValue::Float(150.0)),
                comment: Some("seconds".into())
            }
        );
        assert_eq!(
            parse_card(&card("UNDEF   =")),
            Record::Keyword {
                key: "UNDEF".into(),
                value: None,
                comment: None
            }
        );
    }

    #[test]
    fn strings() {
        assert_eq!(
            parse_card(&card("OBJECT  = 'M31 / core'         / target, with / slash")),
            Record::Keyword {
                key: "OBJECT".into(),
                value: Some(HeaderValue::Str("M31 / core".into())),
                comment: Some("target, with / slash".into())
            }
        );
        assert_eq!(
            parse_card(&card("OBSERVER= 'O''Hara  '")),
            Record::Keyword {
                key: "OBSERVER".into(),
                value: Some(HeaderValue::Str("O'Hara".into())),
                comment: None
            }
        );
    }

    #[test]
    fn commentary() {
        assert_eq!(
            parse_card(&card("COMMENT   some text")),
            Record::Comment("  some text".into())
        );
        assert_eq!(
            parse_card(&card("HISTORY  processed")),
            Record::History(" processed".into())
        );
        assert_eq!(parse_card(&card("")), Record::Blank);
        assert_eq!(parse_card(&card("END")), Record::End);
    }

    #[test]
    fn hierarch() {
        assert_eq!(
            parse_card(&card("HIERARCH ESO DET CHIP = 'CCD1' / chip")),
            Record::Keyword {
                key: "ESO DET CHIP".into(),
                value: Some(HeaderValue::Str("CCD1".into())),
                comment: Some("chip".into())
            }
        );
    }

    #[test]
    fn long_strings_are_joined() {
        let records = parse_cards([
            card("LONGSTR = 'This is a &'  / first"),
            card("CONTINUE  'long value'      / second"),
            card("END"),
            card("IGNORED = 1"),
        ]);

        assert_eq!(
            records,
            vec![Record::Keyword {
                key: "LONGSTR".into(),
                value: Some(HeaderValue::Str("This is a long value".into())),
                comment: Some("first second".into())
            }]
        );
    }

    #[test]
    fn header_excludes_reserved() {
        let records = parse_cards([
            card("XTENSION= 'BINTABLE'"),
            card("BITPIX  =                    8"),
            card("NAXIS   =                    2"),
            card("NAXIS1  =                    8"),
            card("TFIELDS =                    1"),
            card("TTYPE1  = 'X       '"),
            card("TFORM1  = 'J       '"),
            card("TUNIT1  = 'm       '"),
            card("EXTNAME = 'EVENTS  '"),
            card("TELESCOP= 'HST     '           / telescope"),
            card("HISTORY step one"),
            card("COMMENT note"),
            card("COMMENT   FITS (Flexible Image Transport System) format is defined in 'Astronomy"),
            card(""),
            card("END"),
        ]);

        assert_eq!(find_str(&records, "TTYPE1"), Some("X"));
        assert_eq!(find_int(&records, "NAXIS1"), Some(8));

        let h = to_header(&records);
        assert_eq!(h.keys().collect::<Vec<_>>(), vec!["TELESCOP"]);
        assert_eq!(h.comment_of("TELESCOP"), Some("telescope"));
        assert_eq!(h.history(), &["step one".to_string()]);
        assert_eq!(h.comment(), &["note".to_string()]);
    }
}
