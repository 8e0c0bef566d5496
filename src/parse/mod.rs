//! reading VTK XML files into a [`DataObject`]
//!
//! Serial `.vtu`, `.vti`, `.vtr` and `.vts` files are supported, along with `.vtm`
//! multiblock files whose blocks reference those. Arrays must be stored inline, either
//! as `ascii` or as base64 `binary`. Appended and compressed data are rejected.
//!
//! The document is first read into a small owned element tree and the dataset is then
//! assembled from that tree. Input files are read once per conversion, so nothing here
//! is tuned for memory use.

mod data_array;
mod error;
mod event_summary;

pub use error::ParseError;

use data_array::{DataArray, HeaderType};
use error::{
    MalformedAttribute, MalformedXml, MissingAttribute, ReadFile, UnexpectedAttributeValue,
    UnexpectedElement, Unsupported,
};
use event_summary::EventSummary;

use crate::array::Attributes;
use crate::mesh::{
    vertex_count, DataObject, Dataset, ImageData, IndexBuffer, Points, RectilinearGrid,
    StructuredGrid, UnstructuredMesh,
};
use crate::Error;

use std::io::BufRead;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// cell array that marks ghost cells in VTK files
const GHOST_ARRAY: &str = "vtkGhostType";

/// Read a VTK XML file from disk.
///
/// Blocks of a `.vtm` file are resolved relative to the directory of `path`.
pub fn read_data_object<P: AsRef<Path>>(path: P) -> Result<DataObject, Error> {
    read_file(path.as_ref(), &mut Vec::new())
}

/// `open` holds the canonical paths of the files currently being read, outermost first
fn read_file(path: &Path, open: &mut Vec<PathBuf>) -> Result<DataObject, Error> {
    tracing::debug!("reading {}", path.display());

    let read_error = |source| {
        ParseError::from(ReadFile {
            path: path.to_path_buf(),
            source,
        })
    };

    let file = std::fs::File::open(path).map_err(read_error)?;
    let canonical = std::fs::canonicalize(path).map_err(read_error)?;
    if open.contains(&canonical) {
        return Err(ParseError::from(Unsupported::new(format!(
            "multiblock file `{}` that references itself",
            path.display()
        )))
        .into());
    }

    let reader = Reader::from_reader(std::io::BufReader::new(file));
    let root = read_document(reader)?;

    open.push(canonical);
    let result = data_object_from_root(&root, path.parent(), open);
    open.pop();
    result
}

/// Parse a VTK XML document held in memory.
///
/// Multiblock references are resolved relative to the current directory.
pub fn parse_data_object(xml: &str) -> Result<DataObject, Error> {
    let root = read_document(Reader::from_str(xml))?;
    data_object_from_root(&root, None, &mut Vec::new())
}

/// An owned xml element
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) text: String,
    pub(crate) children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let mut attributes = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute.map_err(MalformedAttribute::from)?;
            attributes.push((
                String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attribute.value).into_owned(),
            ));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    pub(crate) fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn require(&self, key: &str) -> Result<&str, ParseError> {
        self.attribute(key)
            .ok_or_else(|| MissingAttribute::new(self.name.clone(), key.into()).into())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn require_child(&self, name: &str) -> Result<&Element, ParseError> {
        self.child(name)
            .ok_or_else(|| UnexpectedElement::new(name, EventSummary::end_of(&self.name)).into())
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn read_document<R: BufRead>(mut reader: Reader<R>) -> Result<Element, ParseError> {
    reader.trim_text(true);

    let mut buffer = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buffer)
            .map_err(MalformedXml::from)?;

        match &event {
            Event::Start(start) => {
                if start.name().as_ref() == b"AppendedData" {
                    return Err(Unsupported::new("appended data section".into()).into());
                }
                stack.push(Element::open(start)?);
            }
            Event::Empty(start) => {
                let element = Element::open(start)?;
                if let Some(root) = attach(&mut stack, element) {
                    return Ok(root);
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| UnexpectedElement::new("VTKFile", EventSummary::new(&event)))?;
                if let Some(root) = attach(&mut stack, element) {
                    return Ok(root);
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    push_text(&mut top.text, text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    push_text(&mut top.text, data);
                }
            }
            Event::Eof => {
                return Err(UnexpectedElement::new("VTKFile", EventSummary::eof()).into());
            }
            _ => (),
        }

        buffer.clear();
    }
}

fn push_text(text: &mut String, bytes: &[u8]) {
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(&String::from_utf8_lossy(bytes));
}

/// add a finished element to its parent, returning it when it is the document root
fn attach(stack: &mut [Element], element: Element) -> Option<Element> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            None
        }
        None => Some(element),
    }
}

fn check_attribute_value(
    element: &Element,
    attribute: &str,
    expected: &str,
) -> Result<(), ParseError> {
    match element.attribute(attribute) {
        Some(value) if value != expected => Err(UnexpectedAttributeValue::new(
            element.name.clone(),
            attribute.into(),
            expected.into(),
            value.into(),
        )
        .into()),
        _ => Ok(()),
    }
}

fn data_object_from_root(
    root: &Element,
    directory: Option<&Path>,
    open: &mut Vec<PathBuf>,
) -> Result<DataObject, Error> {
    if root.name != "VTKFile" {
        let start = BytesStart::new(root.name.as_str());
        return Err(ParseError::from(UnexpectedElement::new(
            "VTKFile",
            EventSummary::start(&start),
        ))
        .into());
    }

    check_attribute_value(root, "byte_order", "LittleEndian")?;

    if let Some(compressor) = root.attribute("compressor") {
        if !compressor.is_empty() {
            return Err(ParseError::from(Unsupported::new(format!(
                "compressed data ({compressor})"
            )))
            .into());
        }
    }

    let header = HeaderType::from_attribute(root.attribute("header_type"))?;
    let file_type = root.require("type")?;
    let grid = root.require_child(file_type)?;

    if file_type == "vtkMultiBlockDataSet" {
        return read_block(grid, directory, open);
    }

    let mut pieces = grid
        .children_named("Piece")
        .map(|piece| read_piece(file_type, grid, piece, header))
        .collect::<Result<Vec<_>, Error>>()?;

    tracing::debug!("read {} piece(s) of {file_type}", pieces.len());

    match pieces.len() {
        0 => Err(ParseError::from(UnexpectedElement::new(
            "Piece",
            EventSummary::end_of(&grid.name),
        ))
        .into()),
        1 => Ok(DataObject::Dataset(pieces.remove(0))),
        _ => Ok(DataObject::composite(pieces)),
    }
}

fn read_block(
    block: &Element,
    directory: Option<&Path>,
    open: &mut Vec<PathBuf>,
) -> Result<DataObject, Error> {
    let mut children = Vec::new();

    for child in &block.children {
        match child.name.as_str() {
            "Block" => children.push(Some(read_block(child, directory, open)?)),
            "DataSet" => match child.attribute("file") {
                Some(file) if !file.is_empty() => {
                    let path = match directory {
                        Some(directory) => directory.join(file),
                        None => Path::new(file).to_path_buf(),
                    };
                    children.push(Some(read_file(&path, open)?));
                }
                _ => children.push(None),
            },
            _ => (),
        }
    }

    Ok(DataObject::Composite(children))
}

fn read_piece(
    file_type: &str,
    grid: &Element,
    piece: &Element,
    header: HeaderType,
) -> Result<Dataset, Error> {
    let (attributes, ghost) = read_attributes(piece, header)?;

    let dataset = match file_type {
        "UnstructuredGrid" => {
            let mut mesh = read_unstructured(piece, header)?;
            mesh.ghost = ghost;
            Dataset::Unstructured(mesh.with_attributes(attributes))
        }
        "ImageData" => {
            let (start, dims) = read_extent(piece)?;
            let origin = read_triple(grid, "Origin", 0.)?;
            let spacing = read_triple(grid, "Spacing", 1.)?;

            let mut shifted = origin;
            for axis in 0..3 {
                shifted[axis] += start[axis] as f64 * spacing[axis];
            }

            Dataset::Image(ImageData::new(dims, shifted, spacing).with_attributes(attributes))
        }
        "RectilinearGrid" => {
            let coordinates = piece.require_child("Coordinates")?;
            let mut axes = coordinates
                .children_named("DataArray")
                .map(|array| DataArray::read(array, header).map(DataArray::into_f64))
                .collect::<Result<Vec<_>, ParseError>>()?;

            if axes.len() != 3 {
                return Err(ParseError::from(UnexpectedElement::new(
                    "DataArray",
                    EventSummary::end_of(&coordinates.name),
                ))
                .into());
            }

            let z = axes.remove(2);
            let y = axes.remove(1);
            let x = axes.remove(0);
            Dataset::Rectilinear(RectilinearGrid::new(x, y, z).with_attributes(attributes))
        }
        "StructuredGrid" => {
            let (_, dims) = read_extent(piece)?;
            let points = read_points(piece, header)?;
            Dataset::Curvilinear(StructuredGrid::new(dims, points).with_attributes(attributes))
        }
        other => {
            return Err(ParseError::from(Unsupported::new(format!("file type `{other}`"))).into())
        }
    };

    if ghost_dropped(&dataset, piece) {
        tracing::debug!("ignoring {GHOST_ARRAY} on a {} dataset", dataset.kind());
    }

    Ok(dataset)
}

fn ghost_dropped(dataset: &Dataset, piece: &Element) -> bool {
    !matches!(dataset, Dataset::Unstructured(_))
        && piece
            .child("CellData")
            .map(|cells| {
                cells
                    .children_named("DataArray")
                    .any(|a| a.attribute("Name") == Some(GHOST_ARRAY))
            })
            .unwrap_or(false)
}

fn read_unstructured(piece: &Element, header: HeaderType) -> Result<UnstructuredMesh, Error> {
    let points = read_points(piece, header)?;
    let declared_cells = read_count(piece, "NumberOfCells")?;

    let cells = match piece.child("Cells") {
        Some(cells) => cells,
        None if declared_cells == 0 => return Ok(UnstructuredMesh::new(points)),
        None => piece.require_child("Cells")?,
    };

    let connectivity = named_array(cells, "connectivity", header)?.into_indices()?;
    let ends = named_array(cells, "offsets", header)?.into_indices()?;
    let types = named_array(cells, "types", header)?.into_bytes()?;

    if types.len() != declared_cells || ends.len() != declared_cells {
        return Err(ParseError::from(data_array::invalid_length(
            "types",
            declared_cells,
            types.len().min(ends.len()),
        ))
        .into());
    }

    // VTK stores the end of every cell, the mesh expects the start of the first one too
    let mut offsets = Vec::with_capacity(ends.len() + 1);
    offsets.push(0);
    offsets.extend(ends);

    UnstructuredMesh::from_csr(
        points,
        IndexBuffer::I64(offsets),
        IndexBuffer::I64(connectivity),
        types,
    )
}

fn read_points(piece: &Element, header: HeaderType) -> Result<Points, Error> {
    let points = piece.require_child("Points")?;
    let array = points
        .child("DataArray")
        .ok_or_else(|| UnexpectedElement::new("DataArray", EventSummary::end_of(&points.name)))
        .map_err(ParseError::from)?;

    let array = DataArray::read(array, header)?;
    let declared = read_count(piece, "NumberOfPoints").ok();

    if let Some(declared) = declared {
        if declared != array.tuples() {
            return Err(ParseError::from(data_array::invalid_length(
                "Points",
                declared,
                array.tuples(),
            ))
            .into());
        }
    }

    let components = array.components;
    Points::new(components, array.into_f64())
}

fn named_array(parent: &Element, name: &str, header: HeaderType) -> Result<DataArray, ParseError> {
    let element = parent
        .children_named("DataArray")
        .find(|a| a.attribute("Name") == Some(name))
        .ok_or_else(|| UnexpectedElement::new(name, EventSummary::end_of(&parent.name)))?;

    DataArray::read(element, header)
}

fn read_attributes(
    piece: &Element,
    header: HeaderType,
) -> Result<(Attributes, Option<Vec<u8>>), ParseError> {
    let mut attributes = Attributes::new();
    let mut ghost = None;

    if let Some(point_data) = piece.child("PointData") {
        for array in point_data.children_named("DataArray") {
            attributes.push_point(DataArray::read(array, header)?.into_field());
        }
    }

    if let Some(cell_data) = piece.child("CellData") {
        for array in cell_data.children_named("DataArray") {
            let array = DataArray::read(array, header)?;
            if array.name_or_empty() == GHOST_ARRAY {
                ghost = Some(array.into_bytes()?);
            } else {
                attributes.push_cell(array.into_field());
            }
        }
    }

    Ok((attributes, ghost))
}

fn read_count(element: &Element, key: &str) -> Result<usize, ParseError> {
    let value = element.require(key)?;
    value.trim().parse().map_err(|_| {
        UnexpectedAttributeValue::new(
            element.name.clone(),
            key.into(),
            "a non-negative integer".into(),
            value.into(),
        )
        .into()
    })
}

/// parse `Extent` into the index of the first vertex and the vertex count per axis
fn read_extent(piece: &Element) -> Result<([i64; 3], [usize; 3]), ParseError> {
    let text = piece.require("Extent")?;
    let invalid = || -> ParseError {
        UnexpectedAttributeValue::new(
            piece.name.clone(),
            "Extent".into(),
            "six integers with lo <= hi".into(),
            text.into(),
        )
        .into()
    };

    let values = text
        .split_ascii_whitespace()
        .map(|v| v.parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    if values.len() != 6 {
        return Err(invalid());
    }

    let mut start = [0; 3];
    let mut dims = [0; 3];
    for axis in 0..3 {
        let (lo, hi) = (values[2 * axis], values[2 * axis + 1]);
        if hi < lo {
            return Err(invalid());
        }
        start[axis] = lo;
        dims[axis] = hi
            .checked_sub(lo)
            .and_then(|span| span.checked_add(1))
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(invalid)?;
    }

    if vertex_count(dims).is_none() {
        return Err(invalid());
    }

    Ok((start, dims))
}

fn read_triple(element: &Element, key: &str, default: f64) -> Result<[f64; 3], ParseError> {
    let text = match element.attribute(key) {
        Some(text) => text,
        None => return Ok([default; 3]),
    };

    let values = text
        .split_ascii_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()
        .filter(|v| v.len() == 3);

    match values {
        Some(v) => Ok([v[0], v[1], v[2]]),
        None => Err(UnexpectedAttributeValue::new(
            element.name.clone(),
            key.into(),
            "three numbers".into(),
            text.into(),
        )
        .into()),
    }
}
