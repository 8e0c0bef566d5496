use super::{IndexBuffer, MeshIndex, Points};
use crate::array::Attributes;
use crate::shape::CellShape;
use crate::Error;

/// Points plus cell topology in compressed form.
///
/// Nothing about the topology is checked at construction beyond the index width;
/// offsets, node counts and node ranges are checked by
/// [`validate_topology`](crate::validate_topology) before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct UnstructuredMesh {
    pub points: Points,
    /// start of each cell in `connectivity`, followed by the end of the last cell
    pub offsets: Vec<MeshIndex>,
    /// zero-based point indices of every cell, back to back
    pub connectivity: Vec<MeshIndex>,
    /// VTK cell shape code of every cell
    pub types: Vec<u8>,
    /// optional ghost indicator, non-zero marks a ghost cell
    pub ghost: Option<Vec<u8>>,
    pub attributes: Attributes,
}

impl UnstructuredMesh {
    /// A mesh without any cells
    pub fn new(points: Points) -> Self {
        Self {
            points,
            offsets: vec![0],
            connectivity: Vec::new(),
            types: Vec::new(),
            ghost: None,
            attributes: Attributes::default(),
        }
    }

    /// Build a mesh from CSR buffers in whatever width the source produced.
    ///
    /// Offsets and connectivity must share a width.
    pub fn from_csr(
        points: Points,
        offsets: IndexBuffer,
        connectivity: IndexBuffer,
        types: Vec<u8>,
    ) -> Result<Self, Error> {
        if offsets.is_wide() != connectivity.is_wide() {
            return Err(Error::InvalidInput(
                "offsets and connectivity must use the same index width".into(),
            ));
        }

        Ok(Self {
            points,
            offsets: offsets.widen()?,
            connectivity: connectivity.widen()?,
            types,
            ghost: None,
            attributes: Attributes::default(),
        })
    }

    /// append a cell of the given shape
    pub fn push_cell(&mut self, shape: CellShape, nodes: &[MeshIndex]) {
        self.push_cell_code(shape.code(), nodes)
    }

    /// append a cell by raw VTK code, the code is not checked here
    pub fn push_cell_code(&mut self, code: u8, nodes: &[MeshIndex]) {
        if self.offsets.is_empty() {
            self.offsets.push(0);
        }
        self.connectivity.extend_from_slice(nodes);
        self.offsets.push(self.connectivity.len() as MeshIndex);
        self.types.push(code);
    }

    pub fn with_cell(mut self, shape: CellShape, nodes: &[MeshIndex]) -> Self {
        self.push_cell(shape, nodes);
        self
    }

    pub fn with_ghost(mut self, ghost: Vec<u8>) -> Self {
        self.ghost = Some(ghost);
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn cell_count(&self) -> usize {
        self.types.len()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// the node slice of cell `index`, assuming offsets have been validated
    pub(crate) fn cell_nodes(&self, index: usize) -> &[MeshIndex] {
        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        &self.connectivity[start..end]
    }
}
