//! Grouping of cells into homogeneously typed element sections.
//!
//! Sections appear in the order their shape is first seen in the cell array, and
//! elements are numbered section by section starting at 1. Cell-located field data is
//! scattered through the resulting [`CellToElementMap`], so element ids must stay dense
//! and contiguous per section.

use crate::mesh::MeshIndex;
use crate::shape::{CellShape, ElementType};
use crate::validate::{CellDisposition, ValidatedTopology};

/// A contiguous run of elements sharing one element type
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSection {
    pub element_type: ElementType,
    pub name: String,
    pub nodes_per_element: usize,
    /// one-based node ids, `nodes_per_element` per element
    pub connectivity: Vec<MeshIndex>,
    /// first and last element id of the section, inclusive
    pub range: (MeshIndex, MeshIndex),
    /// the input cell each element came from
    cells: Vec<usize>,
}

impl ElementSection {
    fn new(shape: CellShape) -> Self {
        let info = shape.info();
        Self {
            element_type: info.element_type,
            name: info.element_type.default_section_name().to_string(),
            nodes_per_element: info.nodes_per_element,
            connectivity: Vec::new(),
            range: (0, 0),
            cells: Vec::new(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.cells.len()
    }

    /// input cell indices in element order
    pub fn source_cells(&self) -> &[usize] {
        &self.cells
    }
}

/// Element id assigned to each input cell, `None` for cells that were dropped
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellToElementMap {
    entries: Vec<Option<MeshIndex>>,
}

impl CellToElementMap {
    /// every cell is kept and numbered in input order
    pub fn identity(cells: usize) -> Self {
        Self {
            entries: (1..=cells as MeshIndex).map(Some).collect(),
        }
    }

    /// the element id of `cell`, or `None` if it was dropped
    pub fn get(&self, cell: usize) -> Option<MeshIndex> {
        self.entries.get(cell).copied().flatten()
    }

    pub fn is_dropped(&self, cell: usize) -> bool {
        self.get(cell).is_none()
    }

    /// number of input cells
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// number of cells that received an element id
    pub fn kept(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<MeshIndex>> + '_ {
        self.entries.iter().copied()
    }
}

/// The sections of one unstructured zone and the numbering they imply
#[derive(Debug, Clone, PartialEq)]
pub struct SectionLayout {
    pub sections: Vec<ElementSection>,
    pub cell_to_element: CellToElementMap,
}

impl SectionLayout {
    /// total number of elements over all sections
    pub fn element_count(&self) -> usize {
        self.sections.iter().map(ElementSection::element_count).sum()
    }
}

/// Group the kept cells of a validated mesh into element sections.
pub fn build_sections(topology: &ValidatedTopology<'_>) -> SectionLayout {
    let dispositions = topology.dispositions();

    let mut sections: Vec<ElementSection> = Vec::new();
    // section index of each shape, in the order shapes were first seen
    let mut slots: [Option<usize>; CellShape::COUNT] = [None; CellShape::COUNT];

    for (cell, disposition) in dispositions.iter().enumerate() {
        let shape = match disposition {
            CellDisposition::Kept(shape) => *shape,
            CellDisposition::Ghost | CellDisposition::Unsupported(_) => continue,
        };

        let index = *slots[shape.slot()].get_or_insert_with(|| {
            sections.push(ElementSection::new(shape));
            sections.len() - 1
        });

        let section = &mut sections[index];
        section.cells.push(cell);
        section
            .connectivity
            .extend(topology.cell_nodes(cell).iter().map(|node| node + 1));
    }

    sections.retain(|section| !section.cells.is_empty());

    let mut entries = vec![None; dispositions.len()];
    let mut next: MeshIndex = 1;

    for section in sections.iter_mut() {
        let start = next;
        for (position, &cell) in section.cells.iter().enumerate() {
            entries[cell] = Some(start + position as MeshIndex);
        }
        next = start + section.cells.len() as MeshIndex;
        section.range = (start, next - 1);
    }

    SectionLayout {
        sections,
        cell_to_element: CellToElementMap { entries },
    }
}
