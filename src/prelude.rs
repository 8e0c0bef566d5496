//! Common traits and types that are useful for writing grid files

pub use crate::array::{Attributes, FieldArray, FieldData};
pub use crate::backend::{ContainerFormat, GridBackend, MemoryBackend};
pub use crate::mesh::{
    DataObject, Dataset, ImageData, Points, RectilinearGrid, StructuredGrid, UnstructuredMesh,
};
pub use crate::options::{ArrayEncoding, IndexWidth, WriteOptions};
pub use crate::parse::{parse_data_object, read_data_object};
pub use crate::shape::CellShape;
pub use crate::write_grid::{write_grid, write_to_backend, write_unstructured, WriteSummary};
pub use crate::Error;
