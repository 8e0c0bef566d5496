use super::{narrow_index, BackendError, GridBackend, GridLocation, WriteOrder, ZoneSize};
use crate::options::IndexWidth;
use crate::section::ElementSection;
use crate::shape::ElementType;

use std::io::Write;

/// leading bytes of every binary grid file
pub const MAGIC: &[u8; 8] = b"GRIDBIN\0";
/// layout version written after the magic bytes
pub const VERSION: u32 = 1;

/// Tag byte at the start of each record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    End = 0,
    Base = 1,
    Zone = 2,
    Coordinate = 3,
    Section = 4,
    Solution = 5,
    Field = 6,
}

/// numeric element type identifiers stored in section records
pub fn element_type_code(element_type: ElementType) -> u8 {
    match element_type {
        ElementType::Node => 2,
        ElementType::Bar2 => 3,
        ElementType::Tri3 => 5,
        ElementType::Quad4 => 7,
        ElementType::Tetra4 => 10,
        ElementType::Pyra5 => 12,
        ElementType::Penta6 => 14,
        ElementType::Hexa8 => 17,
    }
}

/// Writes a grid file as a flat sequence of little endian records.
///
/// The file starts with [`MAGIC`], the [`VERSION`] as `u32` and the index width in
/// bytes as `u8`. Every record then has the layout
///
/// | field   | type              |
/// |---------|-------------------|
/// | kind    | `u8`              |
/// | node    | `u32`             |
/// | parent  | `u32`, 0 for none |
/// | name    | `u32` length + utf8 bytes |
/// | payload | `u64` length + bytes |
///
/// Node ids count every record from 1, so readers can rebuild the hierarchy from the
/// parent ids alone. The file ends with a single [`RecordKind::End`] record.
pub struct BinaryBackend<W: Write> {
    inner: W,
    index_width: IndexWidth,
    order: WriteOrder,
    next_node: u32,
    base_node: u32,
    zone_node: u32,
    solution_node: u32,
}

impl<W: Write> BinaryBackend<W> {
    pub fn new(mut inner: W, index_width: IndexWidth) -> Result<Self, BackendError> {
        inner.write_all(MAGIC)?;
        inner.write_all(&VERSION.to_le_bytes())?;
        inner.write_all(&[index_width.bytes() as u8])?;

        Ok(Self {
            inner,
            index_width,
            order: WriteOrder::default(),
            next_node: 0,
            base_node: 0,
            zone_node: 0,
            solution_node: 0,
        })
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn record(
        &mut self,
        kind: RecordKind,
        parent: u32,
        name: &str,
        payload: &[u8],
    ) -> Result<u32, BackendError> {
        self.next_node += 1;
        let node = self.next_node;

        self.inner.write_all(&[kind as u8])?;
        self.inner.write_all(&node.to_le_bytes())?;
        self.inner.write_all(&parent.to_le_bytes())?;
        self.inner.write_all(&(name.len() as u32).to_le_bytes())?;
        self.inner.write_all(name.as_bytes())?;
        self.inner.write_all(&(payload.len() as u64).to_le_bytes())?;
        self.inner.write_all(payload)?;

        Ok(node)
    }

    fn push_index(&self, payload: &mut Vec<u8>, value: i64) -> Result<(), BackendError> {
        let value = narrow_index(value, self.index_width)?;
        match self.index_width {
            IndexWidth::I32 => payload.extend_from_slice(&(value as i32).to_le_bytes()),
            IndexWidth::I64 => payload.extend_from_slice(&value.to_le_bytes()),
        }
        Ok(())
    }
}

fn float_payload(data: &[f64]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8 + data.len() * 8);
    payload.extend_from_slice(&(data.len() as u64).to_le_bytes());
    data.iter()
        .for_each(|x| payload.extend_from_slice(&x.to_le_bytes()));
    payload
}

impl<W: Write> GridBackend for BinaryBackend<W> {
    fn write_base(
        &mut self,
        name: &str,
        cell_dim: u32,
        phys_dim: u32,
    ) -> Result<usize, BackendError> {
        let id = self.order.base()?;

        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&cell_dim.to_le_bytes());
        payload.extend_from_slice(&phys_dim.to_le_bytes());
        self.base_node = self.record(RecordKind::Base, 0, name, &payload)?;

        Ok(id)
    }

    fn write_zone(
        &mut self,
        base: usize,
        name: &str,
        size: &ZoneSize,
    ) -> Result<usize, BackendError> {
        let id = self.order.zone(base, size)?;

        let sizes = size.as_array();
        let mut payload = Vec::with_capacity(1 + sizes.len() * 8);
        payload.push(size_kind(size));
        sizes
            .iter()
            .for_each(|n| payload.extend_from_slice(&(*n as u64).to_le_bytes()));
        self.zone_node = self.record(RecordKind::Zone, self.base_node, name, &payload)?;

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
        self.record(RecordKind::Coordinate, self.zone_node, name, &float_payload(data))?;
        Ok(())
    }

    fn write_section(
        &mut self,
        base: usize,
        zone: usize,
        section: &ElementSection,
    ) -> Result<(), BackendError> {
        self.order.section(base, zone, section)?;

        let width = self.index_width.bytes();
        let mut payload = Vec::with_capacity(2 + width * (2 + section.connectivity.len()) + 8);
        payload.push(element_type_code(section.element_type));
        payload.push(section.nodes_per_element as u8);
        self.push_index(&mut payload, section.range.0)?;
        self.push_index(&mut payload, section.range.1)?;
        payload.extend_from_slice(&(section.connectivity.len() as u64).to_le_bytes());
        for &node in &section.connectivity {
            self.push_index(&mut payload, node)?;
        }

        self.record(RecordKind::Section, self.zone_node, &section.name, &payload)?;
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

        let location = match location {
            GridLocation::Vertex => 0u8,
            GridLocation::CellCenter => 1u8,
        };
        self.solution_node = self.record(RecordKind::Solution, self.zone_node, name, &[location])?;

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
        self.record(RecordKind::Field, self.solution_node, name, &float_payload(data))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        if !self.order.close() {
            return Ok(());
        }

        self.record(RecordKind::End, 0, "", &[])?;
        self.inner.flush()?;
        Ok(())
    }
}

fn size_kind(size: &ZoneSize) -> u8 {
    match size {
        ZoneSize::Structured { .. } => 0,
        ZoneSize::Unstructured { .. } => 1,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// a decoded record, used to inspect files in tests
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Record {
        pub(crate) kind: u8,
        pub(crate) node: u32,
        pub(crate) parent: u32,
        pub(crate) name: String,
        pub(crate) payload: Vec<u8>,
    }

    fn take<'a>(bytes: &mut &'a [u8], n: usize) -> &'a [u8] {
        let (head, tail) = bytes.split_at(n);
        *bytes = tail;
        head
    }

    fn take_u32(bytes: &mut &[u8]) -> u32 {
        u32::from_le_bytes(take(bytes, 4).try_into().unwrap())
    }

    fn take_u64(bytes: &mut &[u8]) -> u64 {
        u64::from_le_bytes(take(bytes, 8).try_into().unwrap())
    }

    /// split a whole file into its records, checking the header on the way
    pub(crate) fn records(mut bytes: &[u8]) -> (u8, Vec<Record>) {
        assert_eq!(take(&mut bytes, 8), MAGIC);
        assert_eq!(take_u32(&mut bytes), VERSION);
        let width = take(&mut bytes, 1)[0];

        let mut records = Vec::new();
        while !bytes.is_empty() {
            let kind = take(&mut bytes, 1)[0];
            let node = take_u32(&mut bytes);
            let parent = take_u32(&mut bytes);
            let name_len = take_u32(&mut bytes) as usize;
            let name = String::from_utf8(take(&mut bytes, name_len).to_vec()).unwrap();
            let payload_len = take_u64(&mut bytes) as usize;
            let payload = take(&mut bytes, payload_len).to_vec();

            records.push(Record {
                kind,
                node,
                parent,
                name,
                payload,
            });
        }

        (width, records)
    }

    #[test]
    fn hierarchy_through_parent_ids() {
        let mut backend = BinaryBackend::new(Vec::new(), IndexWidth::I32).unwrap();
        let base = backend.write_base("Base", 3, 3).unwrap();
        let zone = backend
            .write_zone(base, "Zone0", &ZoneSize::structured([2, 1, 1]))
            .unwrap();
        backend
            .write_coordinate(base, zone, "CoordinateX", &[0., 1.])
            .unwrap();
        let solution = backend
            .write_solution(base, zone, "PointData", GridLocation::Vertex)
            .unwrap();
        backend
            .write_field(base, zone, solution, "T", &[300., 310.])
            .unwrap();
        backend.close().unwrap();
        backend.close().unwrap();

        let (width, records) = records(&backend.into_inner());
        assert_eq!(width, 4);

        let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::Base as u8,
                RecordKind::Zone as u8,
                RecordKind::Coordinate as u8,
                RecordKind::Solution as u8,
                RecordKind::Field as u8,
                RecordKind::End as u8
            ]
        );

        // zone under base, coordinate and solution under zone, field under solution
        assert_eq!(records[1].parent, records[0].node);
        assert_eq!(records[2].parent, records[1].node);
        assert_eq!(records[3].parent, records[1].node);
        assert_eq!(records[4].parent, records[3].node);

        let mut field = records[4].payload.as_slice();
        assert_eq!(take_u64(&mut field), 2);
        assert_eq!(f64::from_le_bytes(field[8..16].try_into().unwrap()), 310.);
    }

    #[test]
    fn section_payload() {
        let mut backend = BinaryBackend::new(Vec::new(), IndexWidth::I64).unwrap();
        let base = backend.write_base("Base", 1, 3).unwrap();
        let zone = backend
            .write_zone(base, "Zone0", &ZoneSize::Unstructured { vertices: 2, cells: 1 })
            .unwrap();

        let mesh = crate::UnstructuredMesh::new(crate::Points::from_xyz(&[[0.; 3]; 2]))
            .with_cell(crate::CellShape::Line2, &[1, 0]);
        let validated =
            crate::validate_topology(&mesh, &crate::ValidationPolicy::default()).unwrap();
        let layout = crate::build_sections(&validated);
        backend.write_section(base, zone, &layout.sections[0]).unwrap();

        let (_, records) = records(&backend.into_inner());
        let section = &records[2];
        assert_eq!(section.name, "Bars");
        assert_eq!(section.payload[0], element_type_code(ElementType::Bar2));
        assert_eq!(section.payload[1], 2);

        let mut rest = &section.payload[2..];
        let ids: Vec<_> = (0..5).map(|_| take_u64(&mut rest)).collect();
        // start, end, count, then the one based nodes
        assert_eq!(ids, vec![1, 1, 2, 2, 1]);
    }
}
