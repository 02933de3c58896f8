//! Keywords that are derived from the data when a FITS HDU is written.
//!
//! They are never carried as ordinary header entries: the reader drops them and the writer
//! ignores them.

/// Structural keywords, matched exactly.
pub const STRUCTURAL: &[&str] = &[
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "PCOUNT", "GCOUNT", "GROUPS", "EXTEND", "TFIELDS",
    "EXTNAME", "END", "BSCALE", "BZERO", "BLANK", "THEAP", "CHECKSUM", "DATASUM", "ZIMAGE",
    "ZBITPIX", "ZNAXIS", "ZCMPTYPE", "ZSIMPLE", "ZTENSION", "ZEXTEND", "ZPCOUNT", "ZGCOUNT",
    "ZQUANTIZ", "ZDITHER0", "ZHECKSUM", "ZDATASUM", "ZBLOCKED",
];

/// Per-axis and per-field keyword stems, matched when followed by nothing but digits.
pub const INDEXED: &[&str] = &[
    "NAXIS", "TDISP", "TUNIT", "TTYPE", "TFORM", "TBCOL", "TNULL", "TSCAL", "TZERO", "TDIM",
    "PTYPE", "PSCAL", "PZERO", "ZTILE", "ZNAME", "ZVAL", "ZNAXIS",
];

/// Suffix of header entries holding the inline comment of another entry.
pub const COMMENT_SUFFIX: &str = "_COMMENT";

/// `true` if `stem` followed by zero or more digits spells `key`.
fn is_indexed(key: &str, stem: &str) -> bool {
    key.strip_prefix(stem)
        .is_some_and(|rest| rest.bytes().all(|b| b.is_ascii_digit()))
}

#[must_use]
pub fn is_reserved(key: &str) -> bool {
    let key = key.trim();

    STRUCTURAL.contains(&key) || INDEXED.iter().any(|stem| is_indexed(key, stem))
}

/// COMMENT lines cfitsio puts into every primary header it creates.
pub const STANDARD_COMMENTS: &[&str] = &[
    "FITS (Flexible Image Transport System) format is defined in 'Astronomy",
    "and Astrophysics', volume 376, page 359; bibcode: 2001A&A...376..359H",
];

/// `true` for the boilerplate COMMENT lines written along with a new primary header.
#[must_use]
pub fn is_standard_comment(line: &str) -> bool {
    let line = line.trim();
    STANDARD_COMMENTS.iter().any(|c| line == *c)
}

/// Keywords carrying free text rather than a value.
#[must_use]
pub fn is_commentary(key: &str) -> bool {
    matches!(key.trim(), "COMMENT" | "HISTORY" | "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural() {
        for k in ["SIMPLE", "XTENSION", "BITPIX", "EXTNAME", "PCOUNT", "GROUPS", "BZERO"] {
            assert!(is_reserved(k), "{k}");
        }
    }

    #[test]
    fn indexed() {
        for k in ["NAXIS", "NAXIS1", "NAXIS12", "TTYPE3", "TFORM1", "TUNIT10", "TDIM2", "PTYPE4"] {
            assert!(is_reserved(k), "{k}");
        }
    }

    #[test]
    fn ordinary() {
        for k in ["OBJECT", "TELESCOP", "NAXISX", "TUNITS", "DATE-OBS", "TTYPE1A", "EXPTIME"] {
            assert!(!is_reserved(k), "{k}");
        }
    }

    #[test]
    fn standard_comments() {
        assert!(is_standard_comment(
            "  FITS (Flexible Image Transport System) format is defined in 'Astronomy"
        ));
        assert!(!is_standard_comment("FITS is a format"));
    }

    #[test]
    fn commentary() {
        assert!(is_commentary("COMMENT"));
        assert!(is_commentary("HISTORY"));
        assert!(is_commentary("  "));
        assert!(!is_commentary("OBJECT"));
    }
}
