#![doc = include_str!("../README.md")]

pub mod array;
pub mod backend;
pub mod ffi;
mod flatten;
pub mod mesh;
mod options;
pub mod parse;
pub mod prelude;
mod section;
pub mod shape;
mod solution;
mod transaction;
mod validate;
mod write_grid;
mod zone;

pub use array::{Attributes, FieldArray, FieldData};
pub use backend::{BackendError, ContainerFormat, GridBackend, GridLocation, GridTree, ZoneSize};
pub use flatten::{flatten_zones, ZoneInput};
pub use mesh::{
    DataObject, Dataset, ImageData, IndexBuffer, MeshIndex, Points, RectilinearGrid,
    StructuredGrid, UnstructuredMesh,
};
pub use options::{ArrayEncoding, GhostLengthPolicy, IndexWidth, UnsupportedPolicy, WriteOptions};
pub use section::{build_sections, CellToElementMap, ElementSection, SectionLayout};
pub use shape::{map_shape, CellShape, ElementType, ShapeInfo};
pub use solution::component_field_name;
pub use transaction::FileTransaction;
pub use validate::{validate_topology, CellDisposition, ValidatedTopology, ValidationPolicy};
pub use write_grid::{write_grid, write_to_backend, write_unstructured, WriteSummary};
pub use zone::{
    cell_dimension, classify, extract_coordinates, physical_dimension, Coordinates, ZoneKind,
};

#[cfg(feature = "derive")]
pub use gridwrite_derive::FieldData;

use derive_more::Display;
use parking_lot::Mutex;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed topology in cell {cell}: {violation}")]
    MalformedTopology {
        cell: usize,
        violation: TopologyViolation,
    },
    #[error("unsupported cell shape code {0}")]
    UnsupportedShape(u8),
    #[error("could not open `{}` for writing: {source}", .path.display())]
    FileOpenFailed {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    UnderlyingWriteFailed {
        context: String,
        source: BackendError,
    },
    #[error("Error while parsing input mesh: {0}")]
    Parse(#[from] parse::ParseError),
}

/// The way a cell broke the topology rules
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum TopologyViolation {
    #[display(
        fmt = "offsets {start}..{end} are out of order or exceed the connectivity length {connectivity_len}"
    )]
    BadOffsets {
        start: MeshIndex,
        end: MeshIndex,
        connectivity_len: usize,
    },
    #[display(fmt = "cell has {actual} nodes, its shape requires {expected}")]
    NodeCountMismatch { expected: usize, actual: usize },
    #[display(fmt = "node id {node} is outside of [0, {points})")]
    NodeOutOfRange { node: MeshIndex, points: usize },
}

static LAST_ERROR: Mutex<String> = parking_lot::const_mutex(String::new());

/// The message of the most recent failed write, or an empty string if the most
/// recent write succeeded.
///
/// Every call to [`write_grid`], [`write_unstructured`] or [`write_to_backend`]
/// overwrites this value.
pub fn last_error() -> String {
    LAST_ERROR.lock().clone()
}

pub(crate) fn record_outcome<T>(result: &Result<T, Error>) {
    let mut last = LAST_ERROR.lock();
    last.clear();
    if let Err(e) = result {
        last.push_str(&e.to_string());
    }
}
