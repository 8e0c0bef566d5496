use super::{narrow_index, BackendError, GridBackend, GridLocation, WriteOrder, ZoneSize};
use crate::mesh::MeshIndex;
use crate::options::{ArrayEncoding, IndexWidth};
use crate::section::ElementSection;

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Elements that stay open while their children are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    GridFile,
    Base,
    Zone,
    Coordinates,
    Solution,
}

impl Scope {
    fn element(self) -> &'static str {
        match self {
            Scope::GridFile => "GridFile",
            Scope::Base => "Base",
            Scope::Zone => "Zone",
            Scope::Coordinates => "GridCoordinates",
            Scope::Solution => "FlowSolution",
        }
    }

    /// number of open elements while this scope is the innermost one
    fn depth(self) -> usize {
        match self {
            Scope::GridFile => 1,
            Scope::Base => 2,
            Scope::Zone => 3,
            Scope::Coordinates | Scope::Solution => 4,
        }
    }
}

/// Streams a grid file as an xml document.
///
/// Every node of the hierarchy becomes an element, and every array an inline
/// `DataArray` element holding either decimal text or base64 encoded little endian
/// bytes. Elements are closed as soon as a call moves on to a sibling or parent node.
pub struct XmlBackend<W: Write> {
    writer: Writer<W>,
    encoding: ArrayEncoding,
    index_width: IndexWidth,
    order: WriteOrder,
    scopes: Vec<Scope>,
}

impl<W: Write> XmlBackend<W> {
    /// start a new document on `inner`
    pub fn new(
        inner: W,
        encoding: ArrayEncoding,
        index_width: IndexWidth,
    ) -> Result<Self, BackendError> {
        let mut writer = Writer::new_with_indent(inner, b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new(Scope::GridFile.element());
        root.push_attribute(("version", "1.0"));
        root.push_attribute(("byte_order", "LittleEndian"));
        root.push_attribute(("index_type", index_width.type_name()));
        writer.write_event(Event::Start(root))?;

        Ok(Self {
            writer,
            encoding,
            index_width,
            order: WriteOrder::default(),
            scopes: vec![Scope::GridFile],
        })
    }

    /// the underlying writer. Only meaningful after [`GridBackend::close`].
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn open(&mut self, scope: Scope, attributes: &[(&str, &str)]) -> Result<(), BackendError> {
        self.close_to(scope.depth() - 1)?;

        let mut start = BytesStart::new(scope.element());
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Start(start))?;
        self.scopes.push(scope);

        Ok(())
    }

    /// close elements until `depth` remain open
    fn close_to(&mut self, depth: usize) -> Result<(), BackendError> {
        while self.scopes.len() > depth {
            if let Some(scope) = self.scopes.pop() {
                self.writer
                    .write_event(Event::End(BytesEnd::new(scope.element())))?;
            }
        }
        Ok(())
    }

    fn data_array(
        &mut self,
        name: &str,
        type_name: &str,
        count: usize,
        text: &str,
    ) -> Result<(), BackendError> {
        let count = count.to_string();
        let mut start = BytesStart::new("DataArray");
        start.push_attribute(("name", name));
        start.push_attribute(("type", type_name));
        start.push_attribute(("format", self.encoding.to_str()));
        start.push_attribute(("count", count.as_str()));

        if text.is_empty() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        self.writer.write_event(Event::Start(start))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer
            .write_event(Event::End(BytesEnd::new("DataArray")))?;

        Ok(())
    }

    fn write_floats(&mut self, name: &str, values: &[f64]) -> Result<(), BackendError> {
        let text = match self.encoding {
            ArrayEncoding::Ascii => {
                let mut buffer = ryu::Buffer::new();
                join_ascii(values.iter().map(|x| buffer.format(*x).to_string()))
            }
            ArrayEncoding::Base64 => {
                let mut bytes = Vec::with_capacity(values.len() * 8);
                values
                    .iter()
                    .for_each(|x| bytes.extend_from_slice(&x.to_le_bytes()));
                base64::encode(bytes)
            }
        };

        self.data_array(name, "Float64", values.len(), &text)
    }

    fn write_indices(&mut self, name: &str, values: &[MeshIndex]) -> Result<(), BackendError> {
        let width = self.index_width;
        let narrowed = values
            .iter()
            .map(|&value| narrow_index(value, width))
            .collect::<Result<Vec<_>, _>>()?;

        let text = match self.encoding {
            ArrayEncoding::Ascii => join_ascii(narrowed.iter().map(ToString::to_string)),
            ArrayEncoding::Base64 => {
                let mut bytes = Vec::with_capacity(narrowed.len() * width.bytes());
                for value in narrowed {
                    match width {
                        IndexWidth::I32 => bytes.extend_from_slice(&(value as i32).to_le_bytes()),
                        IndexWidth::I64 => bytes.extend_from_slice(&value.to_le_bytes()),
                    }
                }
                base64::encode(bytes)
            }
        };

        self.data_array(name, width.type_name(), values.len(), &text)
    }
}

fn join_ascii<I: Iterator<Item = String>>(values: I) -> String {
    let mut text = String::new();
    for value in values {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&value);
    }
    text
}

fn join_sizes(values: &[usize]) -> String {
    join_ascii(values.iter().map(ToString::to_string))
}

impl<W: Write> GridBackend for XmlBackend<W> {
    fn write_base(
        &mut self,
        name: &str,
        cell_dim: u32,
        phys_dim: u32,
    ) -> Result<usize, BackendError> {
        let id = self.order.base()?;

        let cell_dim = cell_dim.to_string();
        let phys_dim = phys_dim.to_string();
        self.open(
            Scope::Base,
            &[
                ("name", name),
                ("cell_dimension", cell_dim.as_str()),
                ("physical_dimension", phys_dim.as_str()),
            ],
        )?;

        Ok(id)
    }

    fn write_zone(
        &mut self,
        base: usize,
        name: &str,
        size: &ZoneSize,
    ) -> Result<usize, BackendError> {
        let id = self.order.zone(base, size)?;

        let sizes = join_sizes(&size.as_array());
        self.open(
            Scope::Zone,
            &[("name", name), ("type", size.label()), ("size", sizes.as_str())],
        )?;

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

        if self.scopes.last() != Some(&Scope::Coordinates) {
            self.open(Scope::Coordinates, &[("name", "GridCoordinates")])?;
        }

        self.write_floats(name, data)
    }

    fn write_section(
        &mut self,
        base: usize,
        zone: usize,
        section: &ElementSection,
    ) -> Result<(), BackendError> {
        self.order.section(base, zone, section)?;
        self.close_to(Scope::Zone.depth())?;

        let start_id = narrow_index(section.range.0, self.index_width)?.to_string();
        let end_id = narrow_index(section.range.1, self.index_width)?.to_string();
        let nodes = section.nodes_per_element.to_string();

        let mut start = BytesStart::new("Elements");
        start.push_attribute(("name", section.name.as_str()));
        start.push_attribute(("type", section.element_type.label()));
        start.push_attribute(("start", start_id.as_str()));
        start.push_attribute(("end", end_id.as_str()));
        start.push_attribute(("nodes_per_element", nodes.as_str()));
        self.writer.write_event(Event::Start(start))?;

        self.write_indices("ElementConnectivity", &section.connectivity)?;

        self.writer
            .write_event(Event::End(BytesEnd::new("Elements")))?;

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
        self.open(
            Scope::Solution,
            &[("name", name), ("location", location.label())],
        )?;
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
        self.write_floats(name, data)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        if !self.order.close() {
            return Ok(());
        }

        self.close_to(0)?;
        self.writer.inner().write_all(b"\n")?;
        self.writer.inner().flush()?;
        Ok(())
    }
}
