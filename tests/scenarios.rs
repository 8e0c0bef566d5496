use gridwrite::backend::MemoryBackend;
use gridwrite::{
    build_sections, validate_topology, write_to_backend, BackendError, CellShape, DataObject,
    Dataset, ElementSection, Error, FieldArray, GridBackend, GridLocation, IndexBuffer, Points,
    RectilinearGrid, TopologyViolation, UnstructuredMesh, UnsupportedPolicy, ValidationPolicy,
    WriteOptions, ZoneSize,
};

fn unit_points(count: usize) -> Points {
    let xyz: Vec<[f64; 3]> = (0..count).map(|i| [i as f64, (i % 2) as f64, 0.]).collect();
    Points::from_xyz(&xyz)
}

fn write(mesh: UnstructuredMesh) -> Result<(gridwrite::WriteSummary, MemoryBackend), Error> {
    let mut backend = MemoryBackend::new();
    let summary = write_to_backend(&DataObject::from(mesh), &mut backend, &WriteOptions::default())?;
    Ok((summary, backend))
}

#[test]
fn single_tet() {
    let mesh = UnstructuredMesh::new(unit_points(4)).with_cell(CellShape::Tet4, &[0, 1, 2, 3]);
    let (summary, backend) = write(mesh).unwrap();

    assert_eq!(summary.zone_count(), 1);

    let base = &backend.tree().bases[0];
    assert_eq!(base.name, "Base");
    assert_eq!(base.cell_dimension, 3);

    let zone = base.zone("Zone0").unwrap();
    assert_eq!(zone.sections.len(), 1);

    let tets = zone.section("Tets").unwrap();
    assert_eq!(tets.range, (1, 1));
    assert_eq!(tets.connectivity, vec![1, 2, 3, 4]);

    // both solutions exist even without any arrays
    assert!(zone.solution("PointData").unwrap().fields.is_empty());
    assert!(zone.solution("CellData").unwrap().fields.is_empty());
}

#[test]
fn sections_follow_first_appearance() {
    let mesh = UnstructuredMesh::new(unit_points(5))
        .with_cell(CellShape::Tri3, &[0, 1, 2])
        .with_cell(CellShape::Quad4, &[1, 2, 3, 4]);
    let (_, backend) = write(mesh).unwrap();

    let zone = &backend.tree().bases[0].zones[0];
    let names: Vec<_> = zone.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Tris", "Quads"]);
    assert_eq!(zone.sections[0].range, (1, 1));
    assert_eq!(zone.sections[1].range, (2, 2));
    assert_eq!(zone.sections[1].connectivity, vec![2, 3, 4, 5]);
}

#[test]
fn ghost_cells_are_dropped() {
    let mesh = UnstructuredMesh::new(unit_points(4))
        .with_cell(CellShape::Tri3, &[0, 1, 2])
        .with_cell(CellShape::Tri3, &[1, 2, 3])
        .with_cell(CellShape::Tri3, &[0, 2, 3])
        .with_ghost(vec![0, 1, 0]);

    let topology = validate_topology(&mesh, &ValidationPolicy::default()).unwrap();
    let layout = build_sections(&topology);

    assert_eq!(layout.element_count(), 2);
    assert_eq!(layout.cell_to_element.len(), 3);
    assert_eq!(layout.cell_to_element.get(0), Some(1));
    assert_eq!(layout.cell_to_element.get(1), None);
    assert_eq!(layout.cell_to_element.get(2), Some(2));

    let (summary, _) = write(mesh).unwrap();
    assert_eq!(summary.element_count(), 2);
    assert_eq!(summary.zones[0].dropped_cells, 1);
}

#[test]
fn empty_cell_is_malformed() {
    let mesh = UnstructuredMesh::from_csr(
        unit_points(5),
        IndexBuffer::from(vec![0i64, 3, 3, 7]),
        IndexBuffer::from(vec![0i64, 1, 2, 1, 2, 3, 4]),
        vec![
            CellShape::Tri3.code(),
            CellShape::Tri3.code(),
            CellShape::Quad4.code(),
        ],
    )
    .unwrap();

    match write(mesh) {
        Err(Error::MalformedTopology { cell, violation }) => {
            assert_eq!(cell, 1);
            assert_eq!(
                violation,
                TopologyViolation::NodeCountMismatch {
                    expected: 3,
                    actual: 0
                }
            );
        }
        other => panic!("expected malformed topology, got {other:?}"),
    }
}

#[test]
fn polygon_is_unsupported_before_any_zone() {
    const POLYGON: u8 = 7;

    let mut mesh = UnstructuredMesh::new(unit_points(4));
    mesh.push_cell_code(POLYGON, &[0, 1, 2, 3]);

    let mut backend = MemoryBackend::new();
    let result = write_to_backend(&DataObject::from(mesh), &mut backend, &WriteOptions::default());

    assert!(matches!(result, Err(Error::UnsupportedShape(POLYGON))));
    assert!(backend.tree().bases.is_empty());
}

#[test]
fn vector_cell_field_is_split_and_scattered() {
    let mut mesh = UnstructuredMesh::new(unit_points(5))
        .with_cell(CellShape::Quad4, &[1, 2, 3, 4])
        .with_cell(CellShape::Tri3, &[0, 1, 2]);
    mesh.attributes
        .push_cell(FieldArray::vector("Velocity", 2, vec![1., 2., 3., 4.]));

    let (_, backend) = write(mesh).unwrap();
    let zone = &backend.tree().bases[0].zones[0];

    let cell_data = zone.solution("CellData").unwrap();
    assert_eq!(cell_data.location, GridLocation::CellCenter);

    let x = cell_data.field("Velocity_X").unwrap();
    let y = cell_data.field("Velocity_Y").unwrap();
    assert_eq!(x.values, vec![1., 3.]);
    assert_eq!(y.values, vec![2., 4.]);
}

#[test]
fn mixed_cells_scatter_in_section_order() {
    // tri, quad, tri: the quad section comes second so the quad becomes element 3
    let mut mesh = UnstructuredMesh::new(unit_points(5))
        .with_cell(CellShape::Tri3, &[0, 1, 2])
        .with_cell(CellShape::Quad4, &[1, 2, 3, 4])
        .with_cell(CellShape::Tri3, &[2, 3, 4]);
    mesh.attributes
        .push_cell(FieldArray::scalar("id", vec![10., 20., 30.]));

    let (_, backend) = write(mesh).unwrap();
    let zone = &backend.tree().bases[0].zones[0];

    assert_eq!(zone.section("Tris").unwrap().range, (1, 2));
    assert_eq!(zone.section("Quads").unwrap().range, (3, 3));

    let id = zone.solution("CellData").unwrap().field("id").unwrap();
    assert_eq!(id.values, vec![10., 30., 20.]);
}

#[test]
fn zones_keep_their_own_dimensionality() {
    let planar = Points::new(2, vec![0., 0., 1., 0., 0., 1.]).unwrap();
    let mesh = UnstructuredMesh::new(planar).with_cell(CellShape::Tri3, &[0, 1, 2]);
    let block = RectilinearGrid::new(vec![0., 1.], vec![0., 1.], vec![0., 5.]);
    let input = DataObject::composite([Dataset::from(mesh), Dataset::from(block)]);

    let mut backend = MemoryBackend::new();
    let summary = write_to_backend(&input, &mut backend, &WriteOptions::default()).unwrap();
    assert_eq!(summary.physical_dimension, 2);

    let base = &backend.tree().bases[0];
    assert_eq!(base.physical_dimension, 2);

    let planar_z = base.zones[0].coordinate("CoordinateZ").unwrap();
    assert_eq!(planar_z.values, vec![0.; 3]);

    let block_z = base.zones[1].coordinate("CoordinateZ").unwrap();
    assert_eq!(block_z.values, vec![0., 0., 0., 0., 5., 5., 5., 5.]);
}

#[test]
fn skipped_cells_leave_no_elements_behind() {
    const POLYGON: u8 = 7;

    let mut mesh = UnstructuredMesh::new(unit_points(5)).with_cell(CellShape::Tri3, &[0, 1, 2]);
    mesh.push_cell_code(POLYGON, &[0, 1, 2, 3]);
    mesh.push_cell(CellShape::Tri3, &[2, 3, 4]);
    mesh.attributes
        .push_cell(FieldArray::scalar("id", vec![10., 20., 30.]));

    let options = WriteOptions::default().with_unsupported_policy(UnsupportedPolicy::Skip);
    let mut backend = MemoryBackend::new();
    let summary = write_to_backend(&DataObject::from(mesh), &mut backend, &options).unwrap();

    assert_eq!(summary.element_count(), 2);
    assert_eq!(summary.zones[0].dropped_cells, 1);

    let zone = &backend.tree().bases[0].zones[0];
    assert_eq!(zone.sections.len(), 1);

    let tris = zone.section("Tris").unwrap();
    assert_eq!(tris.range, (1, 2));
    assert_eq!(tris.connectivity, vec![1, 2, 3, 3, 4, 5]);

    let id = zone.solution("CellData").unwrap().field("id").unwrap();
    assert_eq!(id.values, vec![10., 30.]);
}

/// Delegates to a [`MemoryBackend`] but refuses every element section
struct RefusingSections {
    inner: MemoryBackend,
}

impl GridBackend for RefusingSections {
    fn write_base(&mut self, name: &str, cell_dim: u32, phys_dim: u32) -> Result<usize, BackendError> {
        self.inner.write_base(name, cell_dim, phys_dim)
    }

    fn write_zone(&mut self, base: usize, name: &str, size: &ZoneSize) -> Result<usize, BackendError> {
        self.inner.write_zone(base, name, size)
    }

    fn write_coordinate(
        &mut self,
        base: usize,
        zone: usize,
        name: &str,
        data: &[f64],
    ) -> Result<(), BackendError> {
        self.inner.write_coordinate(base, zone, name, data)
    }

    fn write_section(
        &mut self,
        _base: usize,
        _zone: usize,
        section: &ElementSection,
    ) -> Result<(), BackendError> {
        Err(BackendError::OutOfOrder(format!("{} refused", section.name)))
    }

    fn write_solution(
        &mut self,
        base: usize,
        zone: usize,
        name: &str,
        location: GridLocation,
    ) -> Result<usize, BackendError> {
        self.inner.write_solution(base, zone, name, location)
    }

    fn write_field(
        &mut self,
        base: usize,
        zone: usize,
        solution: usize,
        name: &str,
        data: &[f64],
    ) -> Result<(), BackendError> {
        self.inner.write_field(base, zone, solution, name, data)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.inner.close()
    }
}

#[test]
fn failed_section_write_stops_the_conversion() {
    let first = UnstructuredMesh::new(unit_points(3)).with_cell(CellShape::Tri3, &[0, 1, 2]);
    let second = UnstructuredMesh::new(unit_points(4)).with_cell(CellShape::Tet4, &[0, 1, 2, 3]);
    let input = DataObject::composite([first, second]);

    let mut backend = RefusingSections {
        inner: MemoryBackend::new(),
    };
    let result = write_to_backend(&input, &mut backend, &WriteOptions::default());

    match result {
        Err(Error::UnderlyingWriteFailed { context, source }) => {
            assert_eq!(context, "write_section(Tris)");
            assert!(matches!(source, BackendError::OutOfOrder(_)));
        }
        other => panic!("expected a failed write, got {other:?}"),
    }

    let zones = &backend.inner.tree().bases[0].zones;
    assert_eq!(zones.len(), 1);
    assert!(zones[0].sections.is_empty());
    assert!(zones[0].solutions.is_empty());
}
