//! Header entries and markers as HDF5 attributes.
//!
//! Values are written as scalar attributes: booleans, 64-bit integers, doubles and variable length
//! UTF-8 strings. On read any scalar (or single element) integer, float, boolean or string
//! attribute is accepted, whatever its width or padding.

use std::collections::HashSet;
use std::ffi::c_void;
use std::str::FromStr;

use anyhow::Context;
use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Datatype, Location};
use hdf5_sys::h5a::H5Aread;
use log::warn;

use super::{order, CLASS};
use crate::fits::keywords::COMMENT_SUFFIX;
use crate::hdu::{trim_nul, Header, HeaderValue};

/// Write a scalar string attribute.
pub fn write_str(loc: &Location, name: &str, value: &str) -> Result<(), anyhow::Error> {
    let value = VarLenUnicode::from_str(value)
        .map_err(|e| anyhow!("Invalid value for attribute {}: {}", name, e))?;
    loc.new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;

    Ok(())
}

/// Write a header value as a scalar attribute.
pub fn write_value(loc: &Location, name: &str, value: &HeaderValue) -> Result<(), anyhow::Error> {
    match value {
        HeaderValue::Bool(v) => loc.new_attr::<bool>().create(name)?.write_scalar(v)?,
        HeaderValue::Int(v) => loc.new_attr::<i64>().create(name)?.write_scalar(v)?,
        HeaderValue::Float(v) => loc.new_attr::<f64>().create(name)?.write_scalar(v)?,
        HeaderValue::Str(s) => write_str(loc, name, s)?,
    }

    Ok(())
}

/// Write the keywords of `header` in order, each inline comment as a `<KEY>_COMMENT` attribute
/// right after its keyword. Keywords clashing with `CLASS` or an earlier attribute are skipped.
pub fn write_header(loc: &Location, header: &Header) -> Result<(), anyhow::Error> {
    let mut written = HashSet::new();
    written.insert(CLASS.to_string());

    let mut claim = |name: &str| {
        let fresh = written.insert(name.to_string());
        if !fresh {
            warn!("{}: attribute {} already written, skipping", loc.name(), name);
        }
        fresh
    };

    for card in header.cards() {
        if card.key.is_empty() {
            warn!("{}: skipping keyword without a name", loc.name());
            continue;
        }

        if claim(&card.key) {
            write_value(loc, &card.key, &card.value)
                .with_context(|| format!("Failed to write keyword {}", card.key))?;
        }

        if let Some(comment) = &card.comment {
            let name = format!("{}{COMMENT_SUFFIX}", card.key);
            if claim(&name) {
                write_str(loc, &name, comment)
                    .with_context(|| format!("Failed to write comment of {}", card.key))?;
            }
        }
    }

    Ok(())
}

fn first<T>(v: Vec<T>) -> Result<T, anyhow::Error> {
    v.into_iter()
        .next()
        .ok_or_else(|| anyhow!("Attribute is empty"))
}

/// Fixed length strings, read through a memory type of the same width and character set.
fn read_fixed(attr: &Attribute, td: &TypeDescriptor, width: usize) -> Result<String, anyhow::Error> {
    let mut buf = vec![0u8; attr.size() * width];
    if buf.is_empty() {
        return Ok(String::new());
    }

    let mem = Datatype::from_descriptor(td)?;
    let e = hdf5::sync::sync(|| unsafe {
        H5Aread(attr.id(), mem.id(), buf.as_mut_ptr() as *mut c_void)
    });
    ensure!(e >= 0, "Failed to read attribute {}", attr.name());

    Ok(trim_nul(&buf[..width]))
}

/// Read a scalar or single element attribute as a header value.
pub fn read_value(attr: &Attribute) -> Result<HeaderValue, anyhow::Error> {
    ensure!(attr.size() == 1, "not a scalar ({} values)", attr.size());

    let td = attr.dtype()?.to_descriptor()?;

    Ok(match &td {
        TypeDescriptor::Boolean => HeaderValue::Bool(first(attr.read_raw::<bool>()?)?),
        TypeDescriptor::Integer(_) => HeaderValue::Int(first(attr.read_raw::<i64>()?)?),
        TypeDescriptor::Unsigned(_) => {
            let v = first(attr.read_raw::<u64>()?)?;
            i64::try_from(v)
                .map(HeaderValue::Int)
                .unwrap_or(HeaderValue::Float(v as f64))
        }
        TypeDescriptor::Float(_) => HeaderValue::Float(first(attr.read_raw::<f64>()?)?),
        TypeDescriptor::VarLenUnicode => {
            HeaderValue::Str(first(attr.read_raw::<VarLenUnicode>()?)?.as_str().to_string())
        }
        TypeDescriptor::VarLenAscii => {
            HeaderValue::Str(first(attr.read_raw::<VarLenAscii>()?)?.as_str().to_string())
        }
        TypeDescriptor::FixedAscii(n) | TypeDescriptor::FixedUnicode(n) => {
            HeaderValue::Str(read_fixed(attr, &td, *n)?)
        }
        _ => bail!("unsupported type {:?}", td),
    })
}

/// Read a string attribute, `None` if it is missing or not a string.
pub fn read_str(loc: &Location, name: &str) -> Option<String> {
    let attr = loc.attr(name).ok()?;

    match read_value(&attr) {
        Ok(HeaderValue::Str(s)) => Some(s),
        _ => None,
    }
}

/// Read an integer attribute, `None` if it is missing or not an integer.
pub fn read_int(loc: &Location, name: &str) -> Option<i64> {
    let attr = loc.attr(name).ok()?;

    match read_value(&attr) {
        Ok(HeaderValue::Int(v)) => Some(v),
        _ => None,
    }
}

/// Read all attributes except `CLASS` into a header, in creation order when it is tracked.
/// `<KEY>_COMMENT` attributes become the inline comment of `<KEY>` when that keyword exists.
pub fn read_header(loc: &Location) -> Result<Header, anyhow::Error> {
    let mut header = Header::new();

    for name in order::attr_names(loc)? {
        if name == CLASS {
            continue;
        }

        match loc.attr(&name).map_err(anyhow::Error::from).and_then(|a| read_value(&a)) {
            Ok(v) => header.insert(&name, v),
            Err(e) => warn!("{}: skipping attribute {}: {}", loc.name(), name, e),
        }
    }

    let comments: Vec<String> = header
        .keys()
        .filter(|k| k.ends_with(COMMENT_SUFFIX))
        .map(String::from)
        .collect();

    for ck in comments {
        let key = &ck[..ck.len() - COMMENT_SUFFIX.len()];
        if !header.contains_key(key) {
            continue;
        }

        if let Some(HeaderValue::Str(comment)) = header.get(&ck).cloned() {
            header.set_comment(key, &comment);
            header.remove(&ck);
        }
    }

    Ok(header)
}
