//! # Cell shapes
//!
//! The fixed vocabulary of linear cell shapes that can be translated into element
//! sections. Source meshes identify shapes by their VTK cell code; the grid file
//! identifies them by [`ElementType`]. Every supported shape appears exactly once in
//! [`CellShape::from_code`] and [`CellShape::info`], so adding a shape means adding a
//! variant and letting the compiler point at the matches that need a new arm.

use crate::Error;

/// A linear cell shape with a fixed node count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellShape {
    Point,
    Line2,
    Tri3,
    Quad4,
    Tet4,
    Pyramid5,
    Wedge6,
    Hex8,
}

/// Element types of the output format, one per [`CellShape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Node,
    Bar2,
    Tri3,
    Quad4,
    Tetra4,
    Pyra5,
    Penta6,
    Hexa8,
}

/// Everything the section builder needs to know about a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeInfo {
    pub element_type: ElementType,
    pub nodes_per_element: usize,
    pub topological_dimension: u32,
}

impl CellShape {
    /// number of distinct shapes, used to size per-shape lookup tables
    pub const COUNT: usize = 8;

    /// every shape, in declaration order
    pub const ALL: [CellShape; Self::COUNT] = [
        CellShape::Point,
        CellShape::Line2,
        CellShape::Tri3,
        CellShape::Quad4,
        CellShape::Tet4,
        CellShape::Pyramid5,
        CellShape::Wedge6,
        CellShape::Hex8,
    ];

    /// Look up the shape for a VTK cell code.
    ///
    /// Only the eight linear shapes are accepted. Polygons, poly-lines, pixels,
    /// voxels and higher order cells all produce [`Error::UnsupportedShape`].
    pub fn from_code(code: u8) -> Result<Self, Error> {
        let shape = match code {
            1 => CellShape::Point,
            3 => CellShape::Line2,
            5 => CellShape::Tri3,
            9 => CellShape::Quad4,
            10 => CellShape::Tet4,
            12 => CellShape::Hex8,
            13 => CellShape::Wedge6,
            14 => CellShape::Pyramid5,
            other => return Err(Error::UnsupportedShape(other)),
        };

        Ok(shape)
    }

    /// the VTK cell code for this shape
    pub fn code(self) -> u8 {
        match self {
            CellShape::Point => 1,
            CellShape::Line2 => 3,
            CellShape::Tri3 => 5,
            CellShape::Quad4 => 9,
            CellShape::Tet4 => 10,
            CellShape::Hex8 => 12,
            CellShape::Wedge6 => 13,
            CellShape::Pyramid5 => 14,
        }
    }

    pub fn info(self) -> ShapeInfo {
        let (element_type, nodes_per_element, topological_dimension) = match self {
            CellShape::Point => (ElementType::Node, 1, 0),
            CellShape::Line2 => (ElementType::Bar2, 2, 1),
            CellShape::Tri3 => (ElementType::Tri3, 3, 2),
            CellShape::Quad4 => (ElementType::Quad4, 4, 2),
            CellShape::Tet4 => (ElementType::Tetra4, 4, 3),
            CellShape::Pyramid5 => (ElementType::Pyra5, 5, 3),
            CellShape::Wedge6 => (ElementType::Penta6, 6, 3),
            CellShape::Hex8 => (ElementType::Hexa8, 8, 3),
        };

        ShapeInfo {
            element_type,
            nodes_per_element,
            topological_dimension,
        }
    }

    /// position of this shape in [`CellShape::ALL`]
    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl ElementType {
    /// Name given to a section holding only elements of this type
    pub fn default_section_name(self) -> &'static str {
        match self {
            ElementType::Node => "Nodes",
            ElementType::Bar2 => "Bars",
            ElementType::Tri3 => "Tris",
            ElementType::Quad4 => "Quads",
            ElementType::Tetra4 => "Tets",
            ElementType::Pyra5 => "Pyrs",
            ElementType::Penta6 => "Wedges",
            ElementType::Hexa8 => "Hexes",
        }
    }

    /// Identifier written into the grid file for this element type
    pub fn label(self) -> &'static str {
        match self {
            ElementType::Node => "NODE",
            ElementType::Bar2 => "BAR_2",
            ElementType::Tri3 => "TRI_3",
            ElementType::Quad4 => "QUAD_4",
            ElementType::Tetra4 => "TETRA_4",
            ElementType::Pyra5 => "PYRA_5",
            ElementType::Penta6 => "PENTA_6",
            ElementType::Hexa8 => "HEXA_8",
        }
    }
}

/// Map a source cell code to its element type, node count and topological dimension
pub fn map_shape(code: u8) -> Result<ShapeInfo, Error> {
    CellShape::from_code(code).map(CellShape::info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_node_counts_and_dimensions() {
        let expected = [
            (1, ElementType::Node, 1, 0, "Nodes"),
            (3, ElementType::Bar2, 2, 1, "Bars"),
            (5, ElementType::Tri3, 3, 2, "Tris"),
            (9, ElementType::Quad4, 4, 2, "Quads"),
            (10, ElementType::Tetra4, 4, 3, "Tets"),
            (14, ElementType::Pyra5, 5, 3, "Pyrs"),
            (13, ElementType::Penta6, 6, 3, "Wedges"),
            (12, ElementType::Hexa8, 8, 3, "Hexes"),
        ];

        for (code, ty, nodes, dim, name) in expected {
            let info = map_shape(code).unwrap();
            assert_eq!(info.element_type, ty);
            assert_eq!(info.nodes_per_element, nodes);
            assert_eq!(info.topological_dimension, dim);
            assert_eq!(ty.default_section_name(), name);
        }
    }

    #[test]
    fn codes_round_trip_through_shapes() {
        for shape in CellShape::ALL {
            assert_eq!(CellShape::from_code(shape.code()).unwrap(), shape);
            assert_eq!(CellShape::ALL[shape.slot()], shape);
        }
    }

    #[test]
    fn polygon_is_rejected() {
        // 7 is VTK_POLYGON
        match map_shape(7) {
            Err(Error::UnsupportedShape(7)) => (),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(map_shape(0).is_err());
        assert!(map_shape(255).is_err());
    }
}
