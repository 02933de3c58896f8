//! Normalization of free-form unit strings.
//!
//! FITS files in the wild often spell units out (`METERS`, `Degrees`, `HZ`). Each `/` separated
//! term is looked up case-insensitively, also without a trailing plural `s`, and replaced by the
//! standard FITS symbol. Unknown terms are kept as written, so `mJy/beam` and `Jy` pass through
//! unchanged.

use log::debug;

const LOOKUP: &[(&str, &str)] = &[
    ("meters", "m"),
    ("meter", "m"),
    ("metres", "m"),
    ("metre", "m"),
    ("degrees", "deg"),
    ("degree", "deg"),
    ("hz", "Hz"),
    ("hertz", "Hz"),
    ("second", "s"),
    ("sec", "s"),
    ("secs", "s"),
    ("days", "d"),
    ("day", "d"),
    ("steradians", "sr"),
    ("steradian", "sr"),
    ("radians", "rad"),
    ("radian", "rad"),
    ("jy", "Jy"),
    ("au", "AU"),
];

fn lookup(term: &str) -> Option<&'static str> {
    let lower = term.to_lowercase();

    let find = |t: &str| LOOKUP.iter().find(|(k, _)| *k == t).map(|(_, v)| *v);

    find(&lower).or_else(|| match lower.strip_suffix('s') {
        Some(singular) if !singular.is_empty() => find(singular),
        _ => None,
    })
}

/// Normalize a unit string, `None` for blank input.
#[must_use]
pub fn normalize(unit: &str) -> Option<String> {
    let unit = unit.trim();
    if unit.is_empty() {
        return None;
    }

    let normalized = unit
        .split('/')
        .map(|term| {
            let term = term.trim();
            lookup(term).unwrap_or(term)
        })
        .collect::<Vec<_>>()
        .join("/");

    if normalized != unit {
        debug!("unit {unit:?} normalized to {normalized:?}");
    }

    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
    }

    #[test]
    fn case_is_preserved() {
        assert_eq!(normalize("Jy").as_deref(), Some("Jy"));
        assert_eq!(normalize("mJy/beam").as_deref(), Some("mJy/beam"));
        assert_eq!(normalize("km/s").as_deref(), Some("km/s"));
    }

    #[test]
    fn spelled_out_units() {
        assert_eq!(normalize("METERS").as_deref(), Some("m"));
        assert_eq!(normalize("Degrees").as_deref(), Some("deg"));
        assert_eq!(normalize("JY").as_deref(), Some("Jy"));
        assert_eq!(normalize("hz").as_deref(), Some("Hz"));
        assert_eq!(normalize("meters / seconds").as_deref(), Some("m/s"));
        assert_eq!(normalize("radians/day").as_deref(), Some("rad/d"));
    }

    #[test]
    fn single_s_is_seconds() {
        assert_eq!(normalize("s").as_deref(), Some("s"));
        assert_eq!(normalize("m/s").as_deref(), Some("m/s"));
    }
}
