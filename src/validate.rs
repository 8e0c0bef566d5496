//! Topology checks that run before anything is written.
//!
//! A mesh that fails here never reaches a backend, so a bad mesh cannot leave a
//! truncated grid file behind.

use crate::mesh::{check_extent, Dataset, MeshIndex, UnstructuredMesh};
use crate::options::{GhostLengthPolicy, UnsupportedPolicy};
use crate::shape::CellShape;
use crate::{Error, TopologyViolation};

/// Which cells are dropped and how strict to be about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub skip_ghost_cells: bool,
    pub ghost_length: GhostLengthPolicy,
    pub unsupported: UnsupportedPolicy,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            skip_ghost_cells: true,
            ghost_length: GhostLengthPolicy::Ignore,
            unsupported: UnsupportedPolicy::Fail,
        }
    }
}

/// What happens to a single input cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellDisposition {
    Kept(CellShape),
    Ghost,
    /// the cell code has no element type and the policy allows dropping it
    Unsupported(u8),
}

/// A mesh whose topology passed every check, together with the fate of each cell.
///
/// This is the only way to feed [`build_sections`](crate::build_sections).
#[derive(Debug, Clone)]
pub struct ValidatedTopology<'a> {
    mesh: &'a UnstructuredMesh,
    cells: Vec<CellDisposition>,
    max_dimension: u32,
}

impl<'a> ValidatedTopology<'a> {
    pub fn mesh(&self) -> &'a UnstructuredMesh {
        self.mesh
    }

    pub fn dispositions(&self) -> &[CellDisposition] {
        &self.cells
    }

    /// the highest topological dimension over the kept cells, 0 if none are kept
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn kept_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, CellDisposition::Kept(_)))
            .count()
    }

    /// node slice of a cell, only valid for cells that passed the offset checks
    pub(crate) fn cell_nodes(&self, cell: usize) -> &'a [MeshIndex] {
        self.mesh.cell_nodes(cell)
    }
}

/// Check the compressed topology of `mesh`.
///
/// Every cell must have ordered offsets inside the connectivity array. Every cell that
/// is kept must have a supported shape, exactly as many nodes as that shape requires,
/// and node ids inside `[0, points)`. The first violation ends the check.
pub fn validate_topology<'a>(
    mesh: &'a UnstructuredMesh,
    policy: &ValidationPolicy,
) -> Result<ValidatedTopology<'a>, Error> {
    let cells = mesh.types.len();
    let points = mesh.points.len();
    let connectivity_len = mesh.connectivity.len();

    if mesh.offsets.len() != cells + 1 {
        return Err(Error::InvalidInput(format!(
            "{} offsets given for {cells} cells, expected {}",
            mesh.offsets.len(),
            cells + 1
        )));
    }

    let ghost = ghost_mask(mesh, policy)?;

    let mut dispositions = Vec::with_capacity(cells);
    let mut max_dimension = 0;
    let mut skipped_unsupported = 0usize;

    for cell in 0..cells {
        let start = mesh.offsets[cell];
        let end = mesh.offsets[cell + 1];

        if start < 0 || end < start || end as usize > connectivity_len {
            return Err(Error::MalformedTopology {
                cell,
                violation: TopologyViolation::BadOffsets {
                    start,
                    end,
                    connectivity_len,
                },
            });
        }

        if ghost.map(|g| g[cell] != 0).unwrap_or(false) {
            dispositions.push(CellDisposition::Ghost);
            continue;
        }

        let shape = match CellShape::from_code(mesh.types[cell]) {
            Ok(shape) => shape,
            Err(e) => match policy.unsupported {
                UnsupportedPolicy::Fail => return Err(e),
                UnsupportedPolicy::Skip => {
                    skipped_unsupported += 1;
                    dispositions.push(CellDisposition::Unsupported(mesh.types[cell]));
                    continue;
                }
            },
        };

        let info = shape.info();
        let actual = (end - start) as usize;
        if actual != info.nodes_per_element {
            return Err(Error::MalformedTopology {
                cell,
                violation: TopologyViolation::NodeCountMismatch {
                    expected: info.nodes_per_element,
                    actual,
                },
            });
        }

        if let Some(&node) = mesh.connectivity[start as usize..end as usize]
            .iter()
            .find(|&&node| node < 0 || node as usize >= points)
        {
            return Err(Error::MalformedTopology {
                cell,
                violation: TopologyViolation::NodeOutOfRange { node, points },
            });
        }

        max_dimension = max_dimension.max(info.topological_dimension);
        dispositions.push(CellDisposition::Kept(shape));
    }

    if skipped_unsupported > 0 {
        tracing::warn!("dropped {skipped_unsupported} cells with unsupported shapes");
    }

    Ok(ValidatedTopology {
        mesh,
        cells: dispositions,
        max_dimension,
    })
}

/// the ghost indicator to filter with, if any
fn ghost_mask<'a>(
    mesh: &'a UnstructuredMesh,
    policy: &ValidationPolicy,
) -> Result<Option<&'a [u8]>, Error> {
    if !policy.skip_ghost_cells {
        return Ok(None);
    }

    let ghost = match &mesh.ghost {
        Some(ghost) => ghost,
        None => return Ok(None),
    };

    if ghost.len() == mesh.cell_count() {
        return Ok(Some(ghost.as_slice()));
    }

    match policy.ghost_length {
        GhostLengthPolicy::Ignore => {
            tracing::warn!(
                "ghost indicator has {} entries for {} cells, keeping every cell",
                ghost.len(),
                mesh.cell_count()
            );
            Ok(None)
        }
        GhostLengthPolicy::Reject => Err(Error::InvalidInput(format!(
            "ghost indicator has {} entries for {} cells",
            ghost.len(),
            mesh.cell_count()
        ))),
    }
}

/// Run every pre-write check for one dataset.
///
/// Returns the validated topology for unstructured datasets.
pub(crate) fn validate_dataset<'a>(
    dataset: &'a Dataset,
    policy: &ValidationPolicy,
) -> Result<Option<ValidatedTopology<'a>>, Error> {
    let topology = match dataset {
        Dataset::Unstructured(mesh) => Some(validate_topology(mesh, policy)?),
        Dataset::Image(image) => {
            image.check()?;
            None
        }
        Dataset::Rectilinear(grid) => {
            check_extent(grid.dims())?;
            None
        }
        Dataset::Curvilinear(grid) => {
            grid.check()?;
            None
        }
    };

    dataset
        .attributes()
        .check(dataset.point_count(), dataset.cell_count())?;

    Ok(topology)
}
