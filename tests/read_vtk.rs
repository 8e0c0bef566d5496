use gridwrite::backend::MemoryBackend;
use gridwrite::parse::{parse_data_object, read_data_object, ParseError};
use gridwrite::{
    write_grid, write_to_backend, DataObject, Dataset, Error, ImageData, WriteOptions,
};

const QUADS_VTU: &str = r#"<?xml version="1.0"?>
<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian">
  <UnstructuredGrid>
    <Piece NumberOfPoints="6" NumberOfCells="3">
      <CellData>
        <DataArray type="Float64" Name="Velocity" NumberOfComponents="2" format="ascii">
          1 2 3 4 5 6
        </DataArray>
        <DataArray type="UInt8" Name="vtkGhostType" format="ascii">0 0 1</DataArray>
      </CellData>
      <Points>
        <DataArray type="Float64" NumberOfComponents="3" format="ascii">
          0 0 0 1 0 0 2 0 0 0 1 0 1 1 0 2 1 0
        </DataArray>
      </Points>
      <Cells>
        <DataArray type="Int32" Name="connectivity" format="ascii">0 1 4 3 1 2 5 4 1 2 5</DataArray>
        <DataArray type="Int32" Name="offsets" format="ascii">4 8 11</DataArray>
        <DataArray type="UInt8" Name="types" format="ascii">9 9 5</DataArray>
      </Cells>
    </Piece>
  </UnstructuredGrid>
</VTKFile>
"#;

fn base64_array(values: &[f64]) -> String {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&((values.len() * 8) as u32).to_le_bytes());
    values
        .iter()
        .for_each(|v| bytes.extend_from_slice(&v.to_le_bytes()));
    base64::encode(bytes)
}

fn structured_vts() -> String {
    let points: Vec<f64> = (0..4)
        .flat_map(|i| [(i % 2) as f64, (i / 2) as f64, 0.])
        .collect();

    format!(
        r#"<VTKFile type="StructuredGrid" byte_order="LittleEndian">
  <StructuredGrid WholeExtent="0 1 0 1 0 0">
    <Piece Extent="0 1 0 1 0 0">
      <PointData>
        <DataArray type="Float64" Name="h" format="binary">{}</DataArray>
      </PointData>
      <Points>
        <DataArray type="Float64" NumberOfComponents="3" format="binary">{}</DataArray>
      </Points>
    </Piece>
  </StructuredGrid>
</VTKFile>"#,
        base64_array(&[1., 2., 3., 4.]),
        base64_array(&points)
    )
}

#[test]
fn converts_a_vtu_with_ghosts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("quads.vtu");
    std::fs::write(&input, QUADS_VTU).unwrap();

    let object = read_data_object(&input).unwrap();

    let mut backend = MemoryBackend::new();
    let summary = write_to_backend(&object, &mut backend, &WriteOptions::default()).unwrap();
    assert_eq!(summary.element_count(), 2);

    let zone = &backend.tree().bases[0].zones[0];
    let quads = zone.section("Quads").unwrap();
    assert_eq!(quads.range, (1, 2));
    assert_eq!(quads.connectivity, vec![1, 2, 5, 4, 2, 3, 6, 5]);

    let cells = zone.solution("CellData").unwrap();
    assert_eq!(cells.field("Velocity_X").unwrap().values, vec![1., 3.]);
    assert_eq!(cells.field("Velocity_Y").unwrap().values, vec![2., 4.]);
    assert!(cells.field("vtkGhostType").is_none());
}

#[test]
fn multiblock_resolves_relative_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("blocks")).unwrap();
    std::fs::write(dir.path().join("blocks/quads.vtu"), QUADS_VTU).unwrap();
    std::fs::write(dir.path().join("blocks/surface.vts"), structured_vts()).unwrap();

    let vtm = r#"<VTKFile type="vtkMultiBlockDataSet" version="1.0" byte_order="LittleEndian">
  <vtkMultiBlockDataSet>
    <DataSet index="0" file="blocks/quads.vtu"/>
    <Block index="1">
      <DataSet index="0"/>
      <DataSet index="1" file="blocks/surface.vts"/>
    </Block>
  </vtkMultiBlockDataSet>
</VTKFile>"#;
    let input = dir.path().join("case.vtm");
    std::fs::write(&input, vtm).unwrap();

    let object = read_data_object(&input).unwrap();
    let leaves = match &object {
        DataObject::Composite(children) => children,
        other => panic!("expected a composite, got {other:?}"),
    };
    assert_eq!(leaves.len(), 2);

    let output = dir.path().join("case.grid");
    let summary = write_grid(&object, &output, &WriteOptions::default()).unwrap();
    assert_eq!(summary.zone_count(), 2);
    assert_eq!(summary.zones[1].element_count, 1);

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains(r#"name="Zone1" type="Structured""#));
}

#[test]
fn structured_points_and_base64_fields() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("surface.vts");
    std::fs::write(&input, structured_vts()).unwrap();

    let grid = match read_data_object(&input).unwrap() {
        DataObject::Dataset(Dataset::Curvilinear(grid)) => grid,
        other => panic!("expected a structured grid, got {other:?}"),
    };

    assert_eq!(grid.dims, [2, 2, 1]);
    assert_eq!(grid.points.len(), 4);
    assert_eq!(grid.attributes.point_data[0].values, vec![1., 2., 3., 4.]);
}

#[test]
fn oversized_base64_header_is_rejected() {
    let xml = format!(
        r#"<VTKFile type="UnstructuredGrid" byte_order="LittleEndian" header_type="UInt64">
  <UnstructuredGrid>
    <Piece NumberOfPoints="1" NumberOfCells="0">
      <Points>
        <DataArray type="Float64" NumberOfComponents="3" format="binary">{}</DataArray>
      </Points>
    </Piece>
  </UnstructuredGrid>
</VTKFile>"#,
        base64::encode([0xFF; 8])
    );

    assert!(matches!(
        parse_data_object(&xml),
        Err(Error::Parse(ParseError::InvalidArray(_)))
    ));
}

#[test]
fn extent_spanning_the_integer_range_is_rejected() {
    let xml = r#"<VTKFile type="ImageData" byte_order="LittleEndian">
  <ImageData WholeExtent="-9223372036854775808 9223372036854775807 0 0 0 0">
    <Piece Extent="-9223372036854775808 9223372036854775807 0 0 0 0"/>
  </ImageData>
</VTKFile>"#;
    assert!(matches!(
        parse_data_object(xml),
        Err(Error::Parse(ParseError::UnexpectedAttributeValue(_)))
    ));

    let overflowing = r#"<VTKFile type="ImageData" byte_order="LittleEndian">
  <ImageData>
    <Piece Extent="0 4294967296 0 4294967296 0 4294967296"/>
  </ImageData>
</VTKFile>"#;
    assert!(parse_data_object(overflowing).is_err());
}

#[test]
fn oversized_image_is_rejected_before_writing() {
    let image = ImageData::new([usize::MAX, 2, 2], [0.; 3], [1.; 3]);
    let mut backend = MemoryBackend::new();

    let err = write_to_backend(&DataObject::from(image), &mut backend, &WriteOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(backend.tree().bases.is_empty());
}

fn multiblock(files: &[&str]) -> String {
    let blocks: String = files
        .iter()
        .enumerate()
        .map(|(index, file)| format!(r#"<DataSet index="{index}" file="{file}"/>"#))
        .collect();
    format!(
        r#"<VTKFile type="vtkMultiBlockDataSet" byte_order="LittleEndian">
  <vtkMultiBlockDataSet>{blocks}</vtkMultiBlockDataSet>
</VTKFile>"#
    )
}

#[test]
fn multiblock_cycles_are_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let lonely = dir.path().join("self.vtm");
    std::fs::write(&lonely, multiblock(&["self.vtm"])).unwrap();
    assert!(matches!(
        read_data_object(&lonely),
        Err(Error::Parse(ParseError::Unsupported(_)))
    ));

    std::fs::write(dir.path().join("a.vtm"), multiblock(&["b.vtm"])).unwrap();
    std::fs::write(dir.path().join("b.vtm"), multiblock(&["quads.vtu", "a.vtm"])).unwrap();
    std::fs::write(dir.path().join("quads.vtu"), QUADS_VTU).unwrap();
    assert!(matches!(
        read_data_object(dir.path().join("a.vtm")),
        Err(Error::Parse(ParseError::Unsupported(_)))
    ));
}

#[test]
fn multiblock_may_repeat_a_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("quads.vtu"), QUADS_VTU).unwrap();
    let input = dir.path().join("twice.vtm");
    std::fs::write(&input, multiblock(&["quads.vtu", "quads.vtu"])).unwrap();

    match read_data_object(&input).unwrap() {
        DataObject::Composite(children) => assert_eq!(children.len(), 2),
        other => panic!("expected a composite, got {other:?}"),
    }
}
