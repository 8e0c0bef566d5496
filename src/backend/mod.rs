//! # Grid file backends
//!
//! The conversion engine talks to the output file through the narrow
//! [`GridBackend`] interface: one call per node of the file hierarchy,
//!
//! ```text
//! base
//! └── zone
//!     ├── coordinates (CoordinateX, CoordinateY, CoordinateZ)
//!     ├── element sections (unstructured zones only)
//!     └── solutions (PointData at vertices, CellData at cell centers)
//!         └── fields
//! ```
//!
//! Backends are single writer and strictly in order: a zone can only be written to
//! while it is the most recently created zone, and a field can only be added to the
//! most recently created solution of that zone. Calls that break the order, or arrays
//! whose length does not match their zone, fail with a [`BackendError`] instead of
//! producing a file that cannot be read back.
//!
//! Handles returned by the `write_*` calls are one-based and count nodes of the same
//! kind under the same parent.
//!
//! Two container formats are available for files ([`ContainerFormat`]), plus an
//! in-memory backend that builds a [`GridTree`].

mod binary;
mod memory;
mod xml;

pub use binary::BinaryBackend;
pub use memory::{BaseNode, DataNode, GridTree, MemoryBackend, SectionNode, SolutionNode, ZoneNode};
pub use xml::XmlBackend;

use crate::mesh::{structured_cell_count, MeshIndex};
use crate::options::IndexWidth;
use crate::section::ElementSection;

/// Errors raised by a backend, with the backend's own diagnostics
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Could not write XML data to file: `{0}`")]
    Xml(#[from] quick_xml::Error),
    #[error("out of order write: {0}")]
    OutOfOrder(String),
    #[error("index {0} does not fit the configured index width")]
    IndexOverflow(MeshIndex),
    #[error("array `{name}` has {actual} values, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// The container used for grid files on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerFormat {
    /// a streamed xml document with inline arrays
    #[default]
    Xml,
    /// a record oriented little endian binary file
    Binary,
}

/// Where the values of a solution live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLocation {
    Vertex,
    CellCenter,
}

impl GridLocation {
    pub fn label(self) -> &'static str {
        match self {
            GridLocation::Vertex => "Vertex",
            GridLocation::CellCenter => "CellCenter",
        }
    }
}

/// Size record of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSize {
    Structured {
        vertices: [usize; 3],
        cells: [usize; 3],
    },
    Unstructured {
        vertices: usize,
        cells: usize,
    },
}

impl ZoneSize {
    /// size of a structured zone with the given vertex extent. Cell extents are one
    /// less than the vertex extents, clamped at zero.
    pub fn structured(vertices: [usize; 3]) -> Self {
        ZoneSize::Structured {
            vertices,
            cells: vertices.map(|n| n.saturating_sub(1)),
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            ZoneSize::Structured { vertices, .. } => vertices.iter().product(),
            ZoneSize::Unstructured { vertices, .. } => *vertices,
        }
    }

    /// number of values a cell centered field of this zone holds
    pub fn cell_count(&self) -> usize {
        match self {
            ZoneSize::Structured { vertices, .. } => structured_cell_count(*vertices),
            ZoneSize::Unstructured { cells, .. } => *cells,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ZoneSize::Structured { .. } => "Structured",
            ZoneSize::Unstructured { .. } => "Unstructured",
        }
    }

    /// the flat size array: vertex, cell and boundary vertex sizes
    pub fn as_array(&self) -> Vec<usize> {
        match self {
            ZoneSize::Structured { vertices, cells } => vertices
                .iter()
                .chain(cells.iter())
                .copied()
                .chain([0, 0, 0])
                .collect(),
            ZoneSize::Unstructured { vertices, cells } => vec![*vertices, *cells, 0],
        }
    }
}

/// The primitives a grid file library offers to the conversion engine
pub trait GridBackend {
    /// create a base and return its handle
    fn write_base(&mut self, name: &str, cell_dim: u32, phys_dim: u32)
        -> Result<usize, BackendError>;

    /// create a zone in `base` and return its handle
    fn write_zone(&mut self, base: usize, name: &str, size: &ZoneSize)
        -> Result<usize, BackendError>;

    /// write one coordinate array with one value per vertex
    fn write_coordinate(
        &mut self,
        base: usize,
        zone: usize,
        name: &str,
        data: &[f64],
    ) -> Result<(), BackendError>;

    /// write an element section of an unstructured zone
    fn write_section(
        &mut self,
        base: usize,
        zone: usize,
        section: &ElementSection,
    ) -> Result<(), BackendError>;

    /// create a solution and return its handle
    fn write_solution(
        &mut self,
        base: usize,
        zone: usize,
        name: &str,
        location: GridLocation,
    ) -> Result<usize, BackendError>;

    /// write one scalar field into `solution`
    fn write_field(
        &mut self,
        base: usize,
        zone: usize,
        solution: usize,
        name: &str,
        data: &[f64],
    ) -> Result<(), BackendError>;

    /// finish the file. Closing twice is not an error.
    fn close(&mut self) -> Result<(), BackendError>;
}

/// Attach the name of the failed call to a backend error
pub(crate) trait WriteContext<T> {
    fn context<F: FnOnce() -> String>(self, call: F) -> Result<T, crate::Error>;
}

impl<T> WriteContext<T> for Result<T, BackendError> {
    fn context<F: FnOnce() -> String>(self, call: F) -> Result<T, crate::Error> {
        self.map_err(|source| crate::Error::UnderlyingWriteFailed {
            context: call(),
            source,
        })
    }
}

/// check that an index fits into the configured width
pub(crate) fn narrow_index(value: MeshIndex, width: IndexWidth) -> Result<MeshIndex, BackendError> {
    match width {
        IndexWidth::I64 => Ok(value),
        IndexWidth::I32 => {
            if i32::try_from(value).is_ok() {
                Ok(value)
            } else {
                Err(BackendError::IndexOverflow(value))
            }
        }
    }
}

/// the zone currently open for writing
#[derive(Debug, Clone)]
struct OpenZone {
    base: usize,
    id: usize,
    size: ZoneSize,
    /// last element id written by a section
    last_element: MeshIndex,
    solutions: usize,
    solution: Option<(usize, GridLocation)>,
}

/// Bookkeeping shared by every backend to enforce in-order writes and array sizes.
#[derive(Debug, Clone, Default)]
pub(crate) struct WriteOrder {
    bases: usize,
    zones_in_base: usize,
    zone: Option<OpenZone>,
    closed: bool,
}

impl WriteOrder {
    fn check_open(&self) -> Result<(), BackendError> {
        if self.closed {
            return Err(BackendError::OutOfOrder("the file is already closed".into()));
        }
        Ok(())
    }

    pub(crate) fn base(&mut self) -> Result<usize, BackendError> {
        self.check_open()?;
        self.bases += 1;
        self.zones_in_base = 0;
        self.zone = None;
        Ok(self.bases)
    }

    pub(crate) fn zone(&mut self, base: usize, size: &ZoneSize) -> Result<usize, BackendError> {
        self.check_open()?;
        if base == 0 || base != self.bases {
            return Err(BackendError::OutOfOrder(format!(
                "zone written to base {base}, but the current base is {}",
                self.bases
            )));
        }

        self.zones_in_base += 1;
        self.zone = Some(OpenZone {
            base,
            id: self.zones_in_base,
            size: *size,
            last_element: 0,
            solutions: 0,
            solution: None,
        });

        Ok(self.zones_in_base)
    }

    fn open_zone(&mut self, base: usize, zone: usize) -> Result<&mut OpenZone, BackendError> {
        self.check_open()?;
        match self.zone.as_mut() {
            Some(open) if open.base == base && open.id == zone => Ok(open),
            _ => Err(BackendError::OutOfOrder(format!(
                "zone {zone} of base {base} is not the zone being written"
            ))),
        }
    }

    pub(crate) fn coordinate(
        &mut self,
        base: usize,
        zone: usize,
        name: &str,
        len: usize,
    ) -> Result<(), BackendError> {
        let open = self.open_zone(base, zone)?;
        if open.solutions > 0 {
            return Err(BackendError::OutOfOrder(format!(
                "coordinate `{name}` written after a solution"
            )));
        }
        expect_len(name, open.size.vertex_count(), len)
    }

    pub(crate) fn section(
        &mut self,
        base: usize,
        zone: usize,
        section: &ElementSection,
    ) -> Result<(), BackendError> {
        let open = self.open_zone(base, zone)?;

        let cells = match open.size {
            ZoneSize::Unstructured { cells, .. } => cells as MeshIndex,
            ZoneSize::Structured { .. } => {
                return Err(BackendError::OutOfOrder(format!(
                    "section `{}` written to a structured zone",
                    section.name
                )))
            }
        };

        if open.solutions > 0 {
            return Err(BackendError::OutOfOrder(format!(
                "section `{}` written after a solution",
                section.name
            )));
        }

        let (start, end) = section.range;
        if start != open.last_element + 1 || end < start || end > cells {
            return Err(BackendError::OutOfOrder(format!(
                "section `{}` has element range {start}..={end}, expected it to start at {} and end by {cells}",
                section.name,
                open.last_element + 1
            )));
        }

        let elements = (end - start + 1) as usize;
        expect_len(
            &section.name,
            elements * section.nodes_per_element,
            section.connectivity.len(),
        )?;

        open.last_element = end;
        Ok(())
    }

    pub(crate) fn solution(
        &mut self,
        base: usize,
        zone: usize,
        location: GridLocation,
    ) -> Result<usize, BackendError> {
        let open = self.open_zone(base, zone)?;
        open.solutions += 1;
        open.solution = Some((open.solutions, location));
        Ok(open.solutions)
    }

    pub(crate) fn field(
        &mut self,
        base: usize,
        zone: usize,
        solution: usize,
        name: &str,
        len: usize,
    ) -> Result<(), BackendError> {
        let open = self.open_zone(base, zone)?;
        let location = match open.solution {
            Some((current, location)) if current == solution => location,
            _ => {
                return Err(BackendError::OutOfOrder(format!(
                    "field `{name}` written to solution {solution}, which is not the current solution"
                )))
            }
        };

        let expected = match location {
            GridLocation::Vertex => open.size.vertex_count(),
            GridLocation::CellCenter => open.size.cell_count(),
        };
        expect_len(name, expected, len)
    }

    /// returns `false` if the file was already closed
    pub(crate) fn close(&mut self) -> bool {
        let was_open = !self.closed;
        self.closed = true;
        self.zone = None;
        was_open
    }
}

fn expect_len(name: &str, expected: usize, actual: usize) -> Result<(), BackendError> {
    if expected != actual {
        return Err(BackendError::LengthMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
