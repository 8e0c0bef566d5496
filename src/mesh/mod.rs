//! # Mesh Information
//!
//! The input side of the writer. A [`DataObject`] is either a single [`Dataset`] or a
//! composite tree of them. Each dataset is one of:
//!
//! * [`UnstructuredMesh`]: explicit points and cell topology in compressed (CSR) form,
//!   an `offsets` array with one entry per cell plus a trailing end marker, a flat
//!   `connectivity` array of zero-based point indices, and one VTK shape code per cell.
//! * [`ImageData`]: a uniform grid whose point locations are implied by an origin
//!   and a spacing.
//! * [`RectilinearGrid`]: a tensor-product grid described by one coordinate array per
//!   axis.
//! * [`StructuredGrid`]: a curvilinear grid with an `[nx, ny, nz]` extent and one
//!   explicit point per grid vertex.
//!
//! The last three carry an implicit i/j/k extent and are written as structured zones.
//!
//! ## Index width
//!
//! Mesh sources hand over topology with either 32 or 64 bit indices. Both are accepted
//! through [`IndexBuffer`] and widened once to [`MeshIndex`] when the mesh is built,
//! so nothing past construction ever has to care about the original width.

mod structured;
mod unstructured;

pub use structured::{structured_cell_count, vertex_count, ImageData, RectilinearGrid, StructuredGrid};
pub(crate) use structured::check_extent;
pub use unstructured::UnstructuredMesh;

use crate::array::Attributes;
use crate::Error;
use derive_more::From;
use num_traits::PrimInt;

/// The single index type used for offsets and connectivity once a mesh is built
pub type MeshIndex = i64;

/// Offsets or connectivity in the width the mesh source produced them
#[derive(Debug, Clone, PartialEq, From)]
pub enum IndexBuffer {
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl IndexBuffer {
    /// convert the buffer to the internal index type
    pub fn widen(self) -> Result<Vec<MeshIndex>, Error> {
        match self {
            IndexBuffer::I32(values) => widen_indices(&values),
            IndexBuffer::I64(values) => Ok(values),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::I32(values) => values.len(),
            IndexBuffer::I64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_wide(&self) -> bool {
        matches!(self, IndexBuffer::I64(_))
    }
}

/// Widen any primitive integer slice into mesh indices.
///
/// Fails for unsigned values that do not fit in a `MeshIndex`.
pub fn widen_indices<T: PrimInt>(values: &[T]) -> Result<Vec<MeshIndex>, Error> {
    values
        .iter()
        .enumerate()
        .map(|(position, value)| {
            value.to_i64().ok_or_else(|| {
                Error::InvalidInput(format!(
                    "index at position {position} does not fit in a 64 bit signed integer"
                ))
            })
        })
        .collect()
}

/// Point coordinates stored as a flat, tuple-major array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Points {
    components: usize,
    values: Vec<f64>,
}

impl Points {
    /// Create a point array with `components` coordinates per point.
    ///
    /// `values.len()` must be a multiple of `components`, and `components` must be at
    /// least one.
    pub fn new(components: usize, values: Vec<f64>) -> Result<Self, Error> {
        if components == 0 {
            return Err(Error::InvalidInput(
                "points must have at least one coordinate component".into(),
            ));
        }

        if values.len() % components != 0 {
            return Err(Error::InvalidInput(format!(
                "{} coordinate values cannot be split into {components} component points",
                values.len()
            )));
        }

        Ok(Self { components, values })
    }

    /// points from `[x, y, z, x, y, z, ...]`
    pub fn from_flat3(values: Vec<f64>) -> Result<Self, Error> {
        Self::new(3, values)
    }

    pub fn from_xyz(points: &[[f64; 3]]) -> Self {
        Self {
            components: 3,
            values: points.iter().flatten().copied().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len() / self.components.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// coordinate `axis` of point `index`, 0.0 if the points do not store that axis
    pub fn coordinate(&self, index: usize, axis: usize) -> f64 {
        if axis < self.components {
            self.values[index * self.components + axis]
        } else {
            0.0
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A single leaf dataset
#[derive(Debug, Clone, PartialEq, From)]
pub enum Dataset {
    Unstructured(UnstructuredMesh),
    Image(ImageData),
    Rectilinear(RectilinearGrid),
    Curvilinear(StructuredGrid),
}

impl Dataset {
    pub fn point_count(&self) -> usize {
        match self {
            Dataset::Unstructured(mesh) => mesh.points.len(),
            Dataset::Image(image) => vertex_count(image.dims).unwrap_or(usize::MAX),
            Dataset::Rectilinear(grid) => vertex_count(grid.dims()).unwrap_or(usize::MAX),
            Dataset::Curvilinear(grid) => grid.points.len(),
        }
    }

    pub fn cell_count(&self) -> usize {
        match self {
            Dataset::Unstructured(mesh) => mesh.cell_count(),
            Dataset::Image(image) => structured_cell_count(image.dims),
            Dataset::Rectilinear(grid) => structured_cell_count(grid.dims()),
            Dataset::Curvilinear(grid) => structured_cell_count(grid.dims),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Dataset::Unstructured(mesh) => &mesh.attributes,
            Dataset::Image(image) => &image.attributes,
            Dataset::Rectilinear(grid) => &grid.attributes,
            Dataset::Curvilinear(grid) => &grid.attributes,
        }
    }

    /// the i/j/k vertex extent, if the dataset has one
    pub fn extent(&self) -> Option<[usize; 3]> {
        match self {
            Dataset::Unstructured(_) => None,
            Dataset::Image(image) => Some(image.dims),
            Dataset::Rectilinear(grid) => Some(grid.dims()),
            Dataset::Curvilinear(grid) => Some(grid.dims),
        }
    }

    /// short name of the dataset kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Dataset::Unstructured(_) => "unstructured",
            Dataset::Image(_) => "image",
            Dataset::Rectilinear(_) => "rectilinear",
            Dataset::Curvilinear(_) => "curvilinear",
        }
    }
}

/// The input handed to the writer: one dataset or a composite tree of datasets
#[derive(Debug, Clone, PartialEq)]
pub enum DataObject {
    Dataset(Dataset),
    /// Child blocks in traversal order. `None` marks an empty block.
    Composite(Vec<Option<DataObject>>),
}

macro_rules! data_object_from {
    ($($source:ty),*) => {
        $(
            impl From<$source> for DataObject {
                fn from(x: $source) -> Self {
                    DataObject::Dataset(Dataset::from(x))
                }
            }
        )*
    };
}

data_object_from!(UnstructuredMesh, ImageData, RectilinearGrid, StructuredGrid);

impl From<Dataset> for DataObject {
    fn from(x: Dataset) -> Self {
        DataObject::Dataset(x)
    }
}

impl DataObject {
    /// build a composite from a list of datasets, with no empty blocks
    pub fn composite<I, T>(blocks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<DataObject>,
    {
        DataObject::Composite(blocks.into_iter().map(|b| Some(b.into())).collect())
    }
}
