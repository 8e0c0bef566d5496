//! Zone classification, dimensionality and coordinate extraction.

use crate::mesh::{Dataset, ImageData, Points, RectilinearGrid};
use crate::shape::CellShape;
use ndarray::Array3;

/// How a dataset is laid out as a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// vertex extent along i, j and k
    Structured { dims: [usize; 3] },
    /// input counts, before any cell is dropped
    Unstructured {
        vertex_count: usize,
        cell_count: usize,
    },
}

impl ZoneKind {
    pub fn is_structured(&self) -> bool {
        matches!(self, ZoneKind::Structured { .. })
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            ZoneKind::Structured { .. } => "Structured",
            ZoneKind::Unstructured { .. } => "Unstructured",
        }
    }
}

/// Classify a dataset. Datasets with an implicit i/j/k extent are structured, all
/// others are unstructured, regardless of the cell types they contain.
pub fn classify(dataset: &Dataset) -> ZoneKind {
    match dataset.extent() {
        Some(dims) => ZoneKind::Structured { dims },
        None => ZoneKind::Unstructured {
            vertex_count: dataset.point_count(),
            cell_count: dataset.cell_count(),
        },
    }
}

/// Number of coordinate axes to write, between 1 and 3.
///
/// Datasets with explicit points use the number of point components. Datasets whose
/// points are implied (image and rectilinear grids) are always three dimensional.
pub fn physical_dimension(dataset: &Dataset) -> u32 {
    let components = match dataset {
        Dataset::Unstructured(mesh) => mesh.points.components(),
        Dataset::Curvilinear(grid) => grid.points.components(),
        Dataset::Image(_) | Dataset::Rectilinear(_) => return 3,
    };

    components.clamp(1, 3) as u32
}

/// Topological dimension of the cells in a dataset.
///
/// For unstructured datasets this is the highest dimension of any cell with a known
/// shape. For structured datasets it is the number of axes with more than one vertex.
/// Either way, a result of zero (no cells, or only vertices) is reported as 3.
pub fn cell_dimension(dataset: &Dataset) -> u32 {
    let dimension = match dataset {
        Dataset::Unstructured(mesh) => mesh
            .types
            .iter()
            .filter_map(|&code| CellShape::from_code(code).ok())
            .map(|shape| shape.info().topological_dimension)
            .max()
            .unwrap_or(0),
        other => other
            .extent()
            .map(|dims| dims.iter().filter(|&&d| d > 1).count() as u32)
            .unwrap_or(0),
    };

    if dimension > 0 {
        dimension
    } else {
        3
    }
}

/// One flat array per coordinate axis, one entry per vertex
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coordinates {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl Coordinates {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// the three arrays with the names they are written under
    pub fn named(&self) -> [(&'static str, &[f64]); 3] {
        [
            ("CoordinateX", self.x.as_slice()),
            ("CoordinateY", self.y.as_slice()),
            ("CoordinateZ", self.z.as_slice()),
        ]
    }
}

/// Flatten the vertex locations of a dataset.
///
/// Structured grids are written with `i` varying fastest, then `j`, then `k`, so the
/// vertex `(i, j, k)` lands at `i + nx * (j + ny * k)`. Axes at or beyond `phys_dim`
/// are filled with zeros.
pub fn extract_coordinates(dataset: &Dataset, phys_dim: u32) -> Coordinates {
    let coordinates = match dataset {
        Dataset::Unstructured(mesh) => from_points(&mesh.points),
        Dataset::Curvilinear(grid) => from_points(&grid.points),
        Dataset::Rectilinear(grid) => from_rectilinear(grid),
        Dataset::Image(image) => from_image(image),
    };

    truncate_axes(coordinates, phys_dim)
}

fn from_points(points: &Points) -> Coordinates {
    let n = points.len();
    Coordinates {
        x: (0..n).map(|id| points.coordinate(id, 0)).collect(),
        y: (0..n).map(|id| points.coordinate(id, 1)).collect(),
        z: (0..n).map(|id| points.coordinate(id, 2)).collect(),
    }
}

/// shape of a structured array indexed as `[k, j, i]`
fn kji_shape(dims: [usize; 3]) -> (usize, usize, usize) {
    (dims[2], dims[1], dims[0])
}

fn from_rectilinear(grid: &RectilinearGrid) -> Coordinates {
    let shape = kji_shape(grid.dims());

    // standard layout with `i` as the last axis puts `i` fastest in memory
    let x = Array3::from_shape_fn(shape, |(_, _, i)| grid.x[i]);
    let y = Array3::from_shape_fn(shape, |(_, j, _)| grid.y[j]);
    let z = Array3::from_shape_fn(shape, |(k, _, _)| grid.z[k]);

    Coordinates {
        x: x.into_raw_vec(),
        y: y.into_raw_vec(),
        z: z.into_raw_vec(),
    }
}

fn from_image(image: &ImageData) -> Coordinates {
    let shape = kji_shape(image.dims);

    let axis = |a: usize| {
        Array3::from_shape_fn(shape, |(k, j, i)| image.point(i, j, k)[a]).into_raw_vec()
    };

    Coordinates {
        x: axis(0),
        y: axis(1),
        z: axis(2),
    }
}

fn truncate_axes(mut coordinates: Coordinates, phys_dim: u32) -> Coordinates {
    if phys_dim < 2 {
        coordinates.y.iter_mut().for_each(|v| *v = 0.0);
    }
    if phys_dim < 3 {
        coordinates.z.iter_mut().for_each(|v| *v = 0.0);
    }
    coordinates
}
