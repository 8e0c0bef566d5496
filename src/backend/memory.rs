use super::{narrow_index, BackendError, GridBackend, GridLocation, WriteOrder, ZoneSize};
use crate::mesh::MeshIndex;
use crate::options::IndexWidth;
use crate::section::ElementSection;
use crate::shape::ElementType;

/// A named array of values
#[derive(Debug, Clone, PartialEq)]
pub struct DataNode {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionNode {
    pub name: String,
    pub element_type: ElementType,
    pub range: (MeshIndex, MeshIndex),
    pub connectivity: Vec<MeshIndex>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionNode {
    pub name: String,
    pub location: GridLocation,
    pub fields: Vec<DataNode>,
}

impl SolutionNode {
    pub fn field(&self, name: &str) -> Option<&DataNode> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneNode {
    pub name: String,
    pub size: ZoneSize,
    pub coordinates: Vec<DataNode>,
    pub sections: Vec<SectionNode>,
    pub solutions: Vec<SolutionNode>,
}

impl ZoneNode {
    pub fn coordinate(&self, name: &str) -> Option<&DataNode> {
        self.coordinates.iter().find(|c| c.name == name)
    }

    pub fn section(&self, name: &str) -> Option<&SectionNode> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn solution(&self, name: &str) -> Option<&SolutionNode> {
        self.solutions.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseNode {
    pub name: String,
    pub cell_dimension: u32,
    pub physical_dimension: u32,
    pub zones: Vec<ZoneNode>,
}

impl BaseNode {
    pub fn zone(&self, name: &str) -> Option<&ZoneNode> {
        self.zones.iter().find(|z| z.name == name)
    }
}

/// The complete content of a grid file, as built by [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridTree {
    pub bases: Vec<BaseNode>,
}

/// Collects every write into a [`GridTree`] instead of a file
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tree: GridTree,
    index_width: IndexWidth,
    order: WriteOrder,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// reject element ids that would not fit into a file with this index width
    pub fn with_index_width(index_width: IndexWidth) -> Self {
        Self {
            index_width,
            ..Self::default()
        }
    }

    pub fn tree(&self) -> &GridTree {
        &self.tree
    }

    pub fn into_tree(self) -> GridTree {
        self.tree
    }

    // the write order has already checked that these nodes exist
    fn base_mut(&mut self) -> Result<&mut BaseNode, BackendError> {
        self.tree
            .bases
            .last_mut()
            .ok_or_else(|| BackendError::OutOfOrder("no base has been written".into()))
    }

    fn zone_mut(&mut self) -> Result<&mut ZoneNode, BackendError> {
        self.base_mut()?
            .zones
            .last_mut()
            .ok_or_else(|| BackendError::OutOfOrder("no zone has been written".into()))
    }
}

impl GridBackend for MemoryBackend {
    fn write_base(
        &mut self,
        name: &str,
        cell_dim: u32,
        phys_dim: u32,
    ) -> Result<usize, BackendError> {
        let id = self.order.base()?;
        self.tree.bases.push(BaseNode {
            name: name.to_string(),
            cell_dimension: cell_dim,
            physical_dimension: phys_dim,
            zones: Vec::new(),
        });
        Ok(id)
    }

    fn write_zone(
        &mut self,
        base: usize,
        name: &str,
        size: &ZoneSize,
    ) -> Result<usize, BackendError> {
        let id = self.order.zone(base, size)?;
        self.base_mut()?.zones.push(ZoneNode {
            name: name.to_string(),
            size: *size,
            coordinates: Vec::new(),
            sections: Vec::new(),
            solutions: Vec::new(),
        });
        Ok(id)
    }

    fn write_coordinate(
        &mut self,
        base: usize,
        zone: usize,
        name: &str,
        data: &[f64],
    ) -> Result<(), BackendError> {
        self.order.coordinate(base, zone, name, data.len())?;
        self.zone_mut()?.coordinates.push(DataNode {
            name: name.to_string(),
            values: data.to_vec(),
        });
        Ok(())
    }

    fn write_section(
        &mut self,
        base: usize,
        zone: usize,
        section: &ElementSection,
    ) -> Result<(), BackendError> {
        self.order.section(base, zone, section)?;

        let width = self.index_width;
        let connectivity = section
            .connectivity
            .iter()
            .map(|&node| narrow_index(node, width))
            .collect::<Result<Vec<_>, _>>()?;
        let range = (
            narrow_index(section.range.0, width)?,
            narrow_index(section.range.1, width)?,
        );

        self.zone_mut()?.sections.push(SectionNode {
            name: section.name.clone(),
            element_type: section.element_type,
            range,
            connectivity,
        });
        Ok(())
    }

    fn write_solution(
        &mut self,
        base: usize,
        zone: usize,
        name: &str,
        location: GridLocation,
    ) -> Result<usize, BackendError> {
        let id = self.order.solution(base, zone, location)?;
        self.zone_mut()?.solutions.push(SolutionNode {
            name: name.to_string(),
            location,
            fields: Vec::new(),
        });
        Ok(id)
    }

    fn write_field(
        &mut self,
        base: usize,
        zone: usize,
        solution: usize,
        name: &str,
        data: &[f64],
    ) -> Result<(), BackendError> {
        self.order.field(base, zone, solution, name, data.len())?;

        let solution = self
            .zone_mut()?
            .solutions
            .last_mut()
            .ok_or_else(|| BackendError::OutOfOrder("no solution has been written".into()))?;
        solution.fields.push(DataNode {
            name: name.to_string(),
            values: data.to_vec(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.order.close();
        Ok(())
    }
}
