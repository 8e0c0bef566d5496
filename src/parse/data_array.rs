//! Decoding of inline `DataArray` elements.

use super::error::{InvalidArray, ParseError, UnexpectedAttributeValue, Unsupported};
use super::Element;
use crate::array::FieldArray;
use crate::mesh::MeshIndex;

use std::str::FromStr;

/// Width of the byte count that precedes base64 encoded arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum HeaderType {
    #[default]
    UInt32,
    UInt64,
}

impl HeaderType {
    pub(crate) fn from_attribute(value: Option<&str>) -> Result<Self, ParseError> {
        match value {
            None | Some("UInt32") => Ok(HeaderType::UInt32),
            Some("UInt64") => Ok(HeaderType::UInt64),
            Some(other) => Err(UnexpectedAttributeValue::new(
                "VTKFile".into(),
                "header_type".into(),
                "UInt32 or UInt64".into(),
                other.into(),
            )
            .into()),
        }
    }

    fn bytes(self) -> usize {
        match self {
            HeaderType::UInt32 => 4,
            HeaderType::UInt64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ScalarType {
    fn from_name(name: &str) -> Option<Self> {
        let scalar = match name {
            "Int8" | "Char" => ScalarType::Int8,
            "UInt8" | "UnsignedChar" => ScalarType::UInt8,
            "Int16" => ScalarType::Int16,
            "UInt16" => ScalarType::UInt16,
            "Int32" => ScalarType::Int32,
            "UInt32" => ScalarType::UInt32,
            "Int64" => ScalarType::Int64,
            "UInt64" => ScalarType::UInt64,
            "Float32" => ScalarType::Float32,
            "Float64" => ScalarType::Float64,
            _ => return None,
        };
        Some(scalar)
    }

    fn size(self) -> usize {
        match self {
            ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => 4,
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => 8,
        }
    }

    fn is_float(self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }
}

/// Decoded values, integers kept exact
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ArrayValues {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl ArrayValues {
    fn len(&self) -> usize {
        match self {
            ArrayValues::Int(values) => values.len(),
            ArrayValues::Float(values) => values.len(),
        }
    }
}

/// A decoded `DataArray`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataArray {
    pub(crate) name: Option<String>,
    pub(crate) components: usize,
    pub(crate) values: ArrayValues,
}

impl DataArray {
    pub(crate) fn read(element: &Element, header: HeaderType) -> Result<Self, ParseError> {
        let name = element.attribute("Name").map(str::to_string);
        let label = name.clone().unwrap_or_else(|| "<unnamed>".into());
        let invalid = |reason: String| ParseError::from(InvalidArray::new(label.clone(), reason));

        let type_name = element.require("type")?;
        let scalar = ScalarType::from_name(type_name)
            .ok_or_else(|| invalid(format!("unknown scalar type `{type_name}`")))?;

        let components = match element.attribute("NumberOfComponents") {
            Some(text) => text
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| invalid(format!("invalid component count `{text}`")))?,
            None => 1,
        };

        let values = match element.attribute("format").unwrap_or("ascii") {
            "ascii" => parse_ascii(&element.text, scalar).map_err(invalid)?,
            "binary" => decode_base64(&element.text, scalar, header).map_err(invalid)?,
            "appended" => {
                return Err(Unsupported::new(format!(
                    "appended data in DataArray `{label}`"
                ))
                .into())
            }
            other => return Err(invalid(format!("unknown format `{other}`"))),
        };

        if values.len() % components != 0 {
            return Err(invalid(format!(
                "{} values do not divide into tuples of {components}",
                values.len()
            )));
        }

        Ok(Self {
            name,
            components,
            values,
        })
    }

    pub(crate) fn tuples(&self) -> usize {
        self.values.len() / self.components
    }

    pub(crate) fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub(crate) fn into_f64(self) -> Vec<f64> {
        match self.values {
            ArrayValues::Int(values) => values.into_iter().map(|x| x as f64).collect(),
            ArrayValues::Float(values) => values,
        }
    }

    /// the values of an integer array
    pub(crate) fn into_indices(self) -> Result<Vec<MeshIndex>, ParseError> {
        match self.values {
            ArrayValues::Int(values) => Ok(values),
            ArrayValues::Float(_) => Err(InvalidArray::new(
                self.name.unwrap_or_default(),
                "expected an integer array".into(),
            )
            .into()),
        }
    }

    /// the values of an integer array that fit into a byte, such as cell types
    pub(crate) fn into_bytes(self) -> Result<Vec<u8>, ParseError> {
        let name = self.name.clone().unwrap_or_default();
        self.into_indices()?
            .into_iter()
            .map(|x| {
                u8::try_from(x).map_err(|_| {
                    InvalidArray::new(name.clone(), format!("value {x} does not fit a byte")).into()
                })
            })
            .collect()
    }

    pub(crate) fn into_field(self) -> FieldArray {
        let components = self.components;
        match self.name.clone() {
            Some(name) => FieldArray::vector(name, components, self.into_f64()),
            None => FieldArray::unnamed(components, self.into_f64()),
        }
    }
}

/// an array whose tuple count disagrees with the count its piece declares
pub(crate) fn invalid_length(name: &str, expected: usize, actual: usize) -> InvalidArray {
    InvalidArray::new(
        name.into(),
        format!("expected {expected} tuples, found {actual}"),
    )
}

fn parse_tokens<T: FromStr>(text: &str) -> Result<Vec<T>, String> {
    text.split_ascii_whitespace()
        .map(|token| {
            token
                .parse::<T>()
                .map_err(|_| format!("`{token}` is not a valid number"))
        })
        .collect()
}

fn parse_ascii(text: &str, scalar: ScalarType) -> Result<ArrayValues, String> {
    if scalar.is_float() {
        return parse_tokens::<f64>(text).map(ArrayValues::Float);
    }

    if scalar == ScalarType::UInt64 {
        return parse_tokens::<u64>(text)?
            .into_iter()
            .map(|x| i64::try_from(x).map_err(|_| format!("{x} is too large")))
            .collect::<Result<Vec<_>, _>>()
            .map(ArrayValues::Int);
    }

    parse_tokens::<i64>(text).map(ArrayValues::Int)
}

fn decode_base64(text: &str, scalar: ScalarType, header: HeaderType) -> Result<ArrayValues, String> {
    let encoded: String = text.split_ascii_whitespace().collect();
    let bytes = base64::decode(encoded).map_err(|e| format!("invalid base64 data: {e}"))?;

    let header_len = header.bytes();
    if bytes.len() < header_len {
        return Err("data is shorter than its header".into());
    }

    let mut header_bytes = [0u8; 8];
    header_bytes[..header_len].copy_from_slice(&bytes[..header_len]);
    let announced = u64::from_le_bytes(header_bytes);
    let found = bytes.len() - header_len;
    let truncated = || format!("header announces {announced} bytes, found {found}");

    let data = usize::try_from(announced)
        .ok()
        .and_then(|data_len| header_len.checked_add(data_len))
        .and_then(|end| bytes.get(header_len..end))
        .ok_or_else(truncated)?;

    let size = scalar.size();
    if data.len() % size != 0 {
        return Err(format!("{} bytes are not a whole number of values", data.len()));
    }

    let chunks = data.chunks_exact(size);
    let values = match scalar {
        ScalarType::Float32 => ArrayValues::Float(
            chunks
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
        ),
        ScalarType::Float64 => ArrayValues::Float(chunks.map(le_f64).collect()),
        ScalarType::Int8 => ArrayValues::Int(chunks.map(|c| c[0] as i8 as i64).collect()),
        ScalarType::UInt8 => ArrayValues::Int(chunks.map(|c| c[0] as i64).collect()),
        ScalarType::Int16 => {
            ArrayValues::Int(chunks.map(|c| i16::from_le_bytes([c[0], c[1]]) as i64).collect())
        }
        ScalarType::UInt16 => {
            ArrayValues::Int(chunks.map(|c| u16::from_le_bytes([c[0], c[1]]) as i64).collect())
        }
        ScalarType::Int32 => ArrayValues::Int(
            chunks
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                .collect(),
        ),
        ScalarType::UInt32 => ArrayValues::Int(
            chunks
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                .collect(),
        ),
        ScalarType::Int64 => ArrayValues::Int(chunks.map(le_i64).collect()),
        ScalarType::UInt64 => ArrayValues::Int(
            chunks
                .map(|c| {
                    let x = le_i64(c);
                    if x < 0 {
                        Err(format!("{} is too large", x as u64))
                    } else {
                        Ok(x)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    Ok(values)
}

fn le_f64(c: &[u8]) -> f64 {
    f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
}

fn le_i64(c: &[u8]) -> i64 {
    i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
}
