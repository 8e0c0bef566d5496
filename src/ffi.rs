//! C interface for writing a single unstructured mesh.
//!
//! ```c
//! GridMeshInfo mesh = { points, 4, connectivity, 4, offsets, 1, types, 1 };
//! GridWriteOptions options = { 0, 64, "Base", NULL };
//! if (gridwrite_write_unstructured(&mesh, "tet.grid", &options) != 0) {
//!     fprintf(stderr, "%s\n", gridwrite_last_error());
//! }
//! ```

use crate::mesh::{IndexBuffer, Points, UnstructuredMesh};
use crate::options::{IndexWidth, WriteOptions};
use crate::{record_outcome, ContainerFormat, Error};

use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;

use parking_lot::Mutex;

/// Borrowed description of an unstructured mesh in compressed row form
#[repr(C)]
pub struct GridMeshInfo {
    /// `x0, y0, z0, x1, y1, z1, ...`
    pub points: *const f64,
    pub num_points: i64,
    /// `i32` or `i64` node ids depending on `use_64bit_ids`
    pub connectivity: *const c_void,
    pub connectivity_size: i64,
    /// `num_cells + 1` offsets into `connectivity`, same width as `connectivity`
    pub offsets: *const c_void,
    pub num_cells: i64,
    /// one VTK cell code per cell
    pub types: *const u8,
    pub use_64bit_ids: c_int,
}

/// Output options. Null names select the defaults.
#[repr(C)]
pub struct GridWriteOptions {
    /// 0 for xml, 1 for binary
    pub format: c_int,
    /// 32 or 64, 0 for the default
    pub index_width: c_int,
    /// defaults to `Base`
    pub base_name: *const c_char,
    /// defaults to `Zone0`
    pub zone_name: *const c_char,
}

static LAST_ERROR_C: Mutex<Option<CString>> = parking_lot::const_mutex(None);

static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Write `mesh` to `output_path`. Returns 0 on success and 1 on failure, in which case
/// [`gridwrite_last_error`] describes the failure.
///
/// # Safety
///
/// `mesh` must point to a valid [`GridMeshInfo`] whose arrays hold at least the
/// number of elements it declares. `output_path` must be a nul terminated string.
/// `options` may be null; otherwise its names must be null or nul terminated strings.
#[no_mangle]
pub unsafe extern "C" fn gridwrite_write_unstructured(
    mesh: *const GridMeshInfo,
    output_path: *const c_char,
    options: *const GridWriteOptions,
) -> c_int {
    let result = convert_arguments(mesh, output_path, options).and_then(
        |(mesh, path, zone_name, options)| {
            crate::write_grid::write_named_unstructured(mesh, &zone_name, &path, &options)
        },
    );

    // argument errors never reach the writer
    record_outcome(&result);

    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// The message of the most recent failure, or an empty string.
///
/// The pointer stays valid until the next call into this library.
#[no_mangle]
pub extern "C" fn gridwrite_last_error() -> *const c_char {
    let message = crate::last_error().replace('\0', " ");
    let message = CString::new(message).unwrap_or_default();

    let mut stored = LAST_ERROR_C.lock();
    stored.insert(message).as_ptr()
}

/// The version of this library as a nul terminated string
#[no_mangle]
pub extern "C" fn gridwrite_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

unsafe fn convert_arguments(
    mesh: *const GridMeshInfo,
    output_path: *const c_char,
    options: *const GridWriteOptions,
) -> Result<(UnstructuredMesh, PathBuf, String, WriteOptions), Error> {
    let info = mesh
        .as_ref()
        .ok_or_else(|| Error::InvalidInput("mesh description is null".into()))?;

    let path = optional_str(output_path, "output path")?
        .ok_or_else(|| Error::InvalidInput("output path is null".into()))?;

    let mut write_options = WriteOptions::default();
    let mut zone_name = None;

    if let Some(options) = options.as_ref() {
        write_options.format = match options.format {
            0 => ContainerFormat::Xml,
            1 => ContainerFormat::Binary,
            other => {
                return Err(Error::InvalidInput(format!(
                    "unknown container format {other}"
                )))
            }
        };
        write_options.index_width = match options.index_width {
            0 => IndexWidth::default(),
            32 => IndexWidth::I32,
            64 => IndexWidth::I64,
            other => return Err(Error::InvalidInput(format!("unknown index width {other}"))),
        };
        if let Some(base_name) = optional_str(options.base_name, "base name")? {
            write_options.base_name = base_name;
        }
        zone_name = optional_str(options.zone_name, "zone name")?;
    }

    let zone_name = zone_name.unwrap_or_else(|| format!("{}0", write_options.zone_prefix()));
    let mesh = mesh_from_info(info)?;

    Ok((mesh, PathBuf::from(path), zone_name, write_options))
}

unsafe fn optional_str(ptr: *const c_char, what: &str) -> Result<Option<String>, Error> {
    if ptr.is_null() {
        return Ok(None);
    }

    CStr::from_ptr(ptr)
        .to_str()
        .map(|s| Some(s.to_string()))
        .map_err(|_| Error::InvalidInput(format!("{what} is not valid utf-8")))
}

unsafe fn mesh_from_info(info: &GridMeshInfo) -> Result<UnstructuredMesh, Error> {
    if info.points.is_null()
        || info.connectivity.is_null()
        || info.offsets.is_null()
        || info.types.is_null()
    {
        return Err(Error::InvalidInput("null array in mesh description".into()));
    }

    if info.num_points <= 0 || info.num_cells <= 0 || info.connectivity_size < 0 {
        return Err(Error::InvalidInput(format!(
            "invalid mesh sizes: {} points, {} cells, {} connectivity entries",
            info.num_points, info.num_cells, info.connectivity_size
        )));
    }

    let num_points = info.num_points as usize;
    let num_cells = info.num_cells as usize;
    let connectivity_size = info.connectivity_size as usize;

    let points = std::slice::from_raw_parts(info.points, num_points * 3).to_vec();
    let types = std::slice::from_raw_parts(info.types, num_cells).to_vec();

    let (offsets, connectivity) = if info.use_64bit_ids != 0 {
        (
            IndexBuffer::I64(index_slice::<i64>(info.offsets, num_cells + 1)),
            IndexBuffer::I64(index_slice::<i64>(info.connectivity, connectivity_size)),
        )
    } else {
        (
            IndexBuffer::I32(index_slice::<i32>(info.offsets, num_cells + 1)),
            IndexBuffer::I32(index_slice::<i32>(info.connectivity, connectivity_size)),
        )
    };

    UnstructuredMesh::from_csr(Points::from_flat3(points)?, offsets, connectivity, types)
}

unsafe fn index_slice<T: Copy>(ptr: *const c_void, len: usize) -> Vec<T> {
    std::slice::from_raw_parts(ptr as *const T, len).to_vec()
}
