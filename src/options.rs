use crate::backend::ContainerFormat;
use crate::validate::ValidationPolicy;

/// how floating point arrays are laid out inside an xml container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayEncoding {
    /// whitespace separated decimal text
    Ascii,
    /// little endian bytes, base64 encoded
    #[default]
    Base64,
}

impl ArrayEncoding {
    pub(crate) fn to_str(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Base64 => "base64",
        }
    }
}

/// Width of the integers used for element connectivity and element ranges in the
/// output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexWidth {
    I32,
    #[default]
    I64,
}

impl IndexWidth {
    pub fn bytes(self) -> usize {
        match self {
            IndexWidth::I32 => 4,
            IndexWidth::I64 => 8,
        }
    }

    pub(crate) fn type_name(self) -> &'static str {
        match self {
            IndexWidth::I32 => "Int32",
            IndexWidth::I64 => "Int64",
        }
    }
}

/// What to do when a ghost indicator array does not have one entry per cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GhostLengthPolicy {
    /// warn and keep every cell
    #[default]
    Ignore,
    /// fail the conversion with an invalid input error
    Reject,
}

/// What to do with cells whose shape has no element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedPolicy {
    #[default]
    Fail,
    /// drop the cell and keep going
    Skip,
}

/// Options controlling a single conversion.
///
/// ```
/// use gridwrite::{ContainerFormat, WriteOptions};
///
/// let options = WriteOptions::default()
///     .with_format(ContainerFormat::Binary)
///     .with_base_name("Wing")
///     .with_skip_ghost_cells(false);
///
/// assert_eq!(options.base_name(), "Wing");
/// assert_eq!(options.zone_prefix(), "Zone");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    pub format: ContainerFormat,
    pub encoding: ArrayEncoding,
    pub index_width: IndexWidth,
    pub base_name: String,
    pub zone_prefix: String,
    pub skip_ghost_cells: bool,
    pub ghost_length_policy: GhostLengthPolicy,
    pub unsupported_policy: UnsupportedPolicy,
    pub write_point_data: bool,
    pub write_cell_data: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            format: ContainerFormat::default(),
            encoding: ArrayEncoding::default(),
            index_width: IndexWidth::default(),
            base_name: String::from("Base"),
            zone_prefix: String::from("Zone"),
            skip_ghost_cells: true,
            ghost_length_policy: GhostLengthPolicy::default(),
            unsupported_policy: UnsupportedPolicy::default(),
            write_point_data: true,
            write_cell_data: true,
        }
    }
}

impl WriteOptions {
    pub fn with_format(mut self, format: ContainerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_encoding(mut self, encoding: ArrayEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_index_width(mut self, index_width: IndexWidth) -> Self {
        self.index_width = index_width;
        self
    }

    pub fn with_base_name<T: Into<String>>(mut self, name: T) -> Self {
        self.base_name = name.into();
        self
    }

    pub fn with_zone_prefix<T: Into<String>>(mut self, prefix: T) -> Self {
        self.zone_prefix = prefix.into();
        self
    }

    pub fn with_skip_ghost_cells(mut self, skip: bool) -> Self {
        self.skip_ghost_cells = skip;
        self
    }

    pub fn with_ghost_length_policy(mut self, policy: GhostLengthPolicy) -> Self {
        self.ghost_length_policy = policy;
        self
    }

    pub fn with_unsupported_policy(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported_policy = policy;
        self
    }

    pub fn with_point_data(mut self, write: bool) -> Self {
        self.write_point_data = write;
        self
    }

    pub fn with_cell_data(mut self, write: bool) -> Self {
        self.write_cell_data = write;
        self
    }

    /// the base name, falling back to `Base` when empty
    pub fn base_name(&self) -> &str {
        if self.base_name.is_empty() {
            "Base"
        } else {
            &self.base_name
        }
    }

    /// the zone name prefix, falling back to `Zone` when empty
    pub fn zone_prefix(&self) -> &str {
        if self.zone_prefix.is_empty() {
            "Zone"
        } else {
            &self.zone_prefix
        }
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            skip_ghost_cells: self.skip_ghost_cells,
            ghost_length: self.ghost_length_policy,
            unsupported: self.unsupported_policy,
        }
    }
}
