use super::Points;
use crate::array::Attributes;
use crate::Error;

/// A uniform grid. Point `(i, j, k)` sits at `origin + (i, j, k) * spacing`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub dims: [usize; 3],
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub attributes: Attributes,
}

impl ImageData {
    pub fn new(dims: [usize; 3], origin: [f64; 3], spacing: [f64; 3]) -> Self {
        Self {
            dims,
            origin,
            spacing,
            attributes: Attributes::default(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// location of the grid vertex `(i, j, k)`
    pub fn point(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        [
            self.origin[0] + i as f64 * self.spacing[0],
            self.origin[1] + j as f64 * self.spacing[1],
            self.origin[2] + k as f64 * self.spacing[2],
        ]
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        check_extent(self.dims)?;
        if self
            .origin
            .iter()
            .chain(self.spacing.iter())
            .any(|value| !value.is_finite())
        {
            return Err(Error::InvalidInput(
                "image origin and spacing must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// A tensor-product grid given by one coordinate array per axis
#[derive(Debug, Clone, PartialEq)]
pub struct RectilinearGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub attributes: Attributes,
}

impl RectilinearGrid {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        Self {
            x,
            y,
            z,
            attributes: Attributes::default(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// the vertex extent, one entry per axis
    pub fn dims(&self) -> [usize; 3] {
        [self.x.len(), self.y.len(), self.z.len()]
    }
}

/// A curvilinear grid: an i/j/k extent plus one explicit point per vertex, stored
/// with `i` varying fastest
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredGrid {
    pub dims: [usize; 3],
    pub points: Points,
    pub attributes: Attributes,
}

impl StructuredGrid {
    pub fn new(dims: [usize; 3], points: Points) -> Self {
        Self {
            dims,
            points,
            attributes: Attributes::default(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        let expected = check_extent(self.dims)?;
        if self.points.len() != expected {
            return Err(Error::InvalidInput(format!(
                "structured grid with extent {:?} needs {expected} points, got {}",
                self.dims,
                self.points.len()
            )));
        }
        Ok(())
    }
}

/// Number of cells in a structured grid with the given vertex extent.
///
/// Axes with a single vertex do not contribute a cell layer. A grid made of a single
/// vertex has one (vertex) cell, and an empty extent has none.
pub fn structured_cell_count(dims: [usize; 3]) -> usize {
    if dims.iter().any(|&d| d == 0) {
        return 0;
    }

    dims.iter()
        .filter(|&&d| d > 1)
        .fold(1usize, |count, &d| count.saturating_mul(d - 1))
}

/// Number of vertices in the given extent, `None` when it does not fit in a `usize`
pub fn vertex_count(dims: [usize; 3]) -> Option<usize> {
    dims.iter().try_fold(1usize, |count, &d| count.checked_mul(d))
}

pub(crate) fn check_extent(dims: [usize; 3]) -> Result<usize, Error> {
    vertex_count(dims).ok_or_else(|| {
        Error::InvalidInput(format!("extent {dims:?} holds more vertices than can be addressed"))
    })
}
