//! Creation order of groups and attributes.
//!
//! HDF5 lists links and attributes by name unless the file tracks their creation order. HDU order
//! matters (the first HDU becomes the FITS primary) and header order is worth keeping, so files
//! are created with tracking enabled and read back in creation order when it is available.

use std::ffi::CString;
use std::os::raw::{c_char, c_uint};
use std::path::Path;
use std::ptr;

use hdf5::{File, Group, Location};
use hdf5_sys::h5::{hsize_t, H5_index_t, H5_iter_order_t, H5open};
use hdf5_sys::h5a::H5Aget_name_by_idx;
use hdf5_sys::h5f::{H5Fclose, H5Fcreate, H5F_ACC_TRUNC};
use hdf5_sys::h5g::{H5Gclose, H5Gcreate2};
use hdf5_sys::h5i::hid_t;
use hdf5_sys::h5l::H5Lget_name_by_idx;
use hdf5_sys::h5p::{
    H5Pclose, H5Pcreate, H5Pset_attr_creation_order, H5Pset_link_creation_order,
    H5P_CLS_FILE_CREATE, H5P_CLS_GROUP_CREATE, H5P_CRT_ORDER_INDEXED, H5P_CRT_ORDER_TRACKED,
    H5P_DEFAULT,
};

const TRACKED: c_uint = H5P_CRT_ORDER_TRACKED | H5P_CRT_ORDER_INDEXED;

/// Property list for files or groups with tracked link and attribute creation order.
fn tracking_plist(class: hid_t) -> Result<hid_t, anyhow::Error> {
    let plist = unsafe { H5Pcreate(class) };
    ensure!(plist >= 0, "Failed to create property list");

    let e = unsafe { H5Pset_link_creation_order(plist, TRACKED) }
        .min(unsafe { H5Pset_attr_creation_order(plist, TRACKED) });
    if e < 0 {
        unsafe { H5Pclose(plist) };
        bail!("Failed to set creation order tracking");
    }

    Ok(plist)
}

/// Create (truncate) an HDF5 file that tracks creation order, and open it for writing.
pub fn create_file(path: &Path) -> Result<File, anyhow::Error> {
    let cpath = CString::new(path.to_string_lossy().as_bytes())?;

    let fid = hdf5::sync::sync(|| -> Result<hid_t, anyhow::Error> {
        // The property list classes are only set up once the library is open.
        unsafe { H5open() };
        let fcpl = tracking_plist(unsafe { *H5P_CLS_FILE_CREATE })?;
        let fid = unsafe { H5Fcreate(cpath.as_ptr(), H5F_ACC_TRUNC, fcpl, H5P_DEFAULT) };
        unsafe { H5Pclose(fcpl) };
        Ok(fid)
    })?;
    ensure!(fid >= 0, "Failed to create {}", path.display());

    hdf5::sync::sync(|| unsafe { H5Fclose(fid) });

    Ok(File::open_rw(path)?)
}

/// Create a group that tracks creation order.
pub fn create_group(parent: &Group, name: &str) -> Result<Group, anyhow::Error> {
    let cname = CString::new(name)?;

    let gid = hdf5::sync::sync(|| -> Result<hid_t, anyhow::Error> {
        let gcpl = tracking_plist(unsafe { *H5P_CLS_GROUP_CREATE })?;
        let gid = unsafe { H5Gcreate2(parent.id(), cname.as_ptr(), H5P_DEFAULT, gcpl, H5P_DEFAULT) };
        unsafe { H5Pclose(gcpl) };
        Ok(gid)
    })?;
    ensure!(gid >= 0, "Failed to create group {}", name);

    hdf5::sync::sync(|| unsafe { H5Gclose(gid) });

    Ok(parent.group(name)?)
}

/// Read a name through one of the `*_get_name_by_idx` calls: the first call gives the length.
fn name_by_idx<F>(get: F) -> Option<String>
where
    F: Fn(*mut c_char, usize) -> isize,
{
    let len = get(ptr::null_mut(), 0);
    if len < 0 {
        return None;
    }

    let mut buf = vec![0 as c_char; len as usize + 1];
    if get(buf.as_mut_ptr(), buf.len()) < 0 {
        return None;
    }

    let bytes: Vec<u8> = buf.iter().take_while(|c| **c != 0).map(|c| *c as u8).collect();
    String::from_utf8(bytes).ok()
}

/// Names of the members of a group in creation order, or by name if creation order is not
/// tracked.
pub fn member_names(group: &Group) -> Result<Vec<String>, anyhow::Error> {
    let n = group.len() as hsize_t;
    let dot = CString::new(".")?;

    let names: Option<Vec<String>> = hdf5::sync::sync(|| {
        (0..n)
            .map(|i| {
                name_by_idx(|buf, size| unsafe {
                    H5Lget_name_by_idx(
                        group.id(),
                        dot.as_ptr(),
                        H5_index_t::H5_INDEX_CRT_ORDER,
                        H5_iter_order_t::H5_ITER_INC,
                        i,
                        buf,
                        size,
                        H5P_DEFAULT,
                    ) as isize
                })
            })
            .collect()
    });

    match names {
        Some(names) => Ok(names),
        None => Ok(group.member_names()?),
    }
}

/// Names of the attributes of an object in creation order, or by name if creation order is not
/// tracked.
pub fn attr_names(loc: &Location) -> Result<Vec<String>, anyhow::Error> {
    let by_name = loc.attr_names()?;
    let n = by_name.len() as hsize_t;
    let dot = CString::new(".")?;

    let names: Option<Vec<String>> = hdf5::sync::sync(|| {
        (0..n)
            .map(|i| {
                name_by_idx(|buf, size| unsafe {
                    H5Aget_name_by_idx(
                        loc.id(),
                        dot.as_ptr(),
                        H5_index_t::H5_INDEX_CRT_ORDER,
                        H5_iter_order_t::H5_ITER_INC,
                        i,
                        buf,
                        size,
                        H5P_DEFAULT,
                    ) as isize
                })
            })
            .collect()
    });

    Ok(names.unwrap_or(by_name))
}
