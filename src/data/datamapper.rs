//! Value-range metadata carried by volume-like data.
//!
//! `DataMapper` relates the raw stored range to the physical value range and
//! names the value axis, so round-tripping a dataset through the workspace
//! keeps its calibration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar sample format of a raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFormat {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl DataFormat {
    pub fn size_bytes(self) -> usize {
        match self {
            DataFormat::UInt8 | DataFormat::Int8 => 1,
            DataFormat::UInt16 | DataFormat::Int16 => 2,
            DataFormat::UInt32 | DataFormat::Int32 | DataFormat::Float32 => 4,
            DataFormat::Float64 => 8,
        }
    }

    /// The stored range implied by the format, used as the default data
    /// range. Floating formats default to the normalized [0, 1] range.
    pub fn default_data_range(self) -> [f64; 2] {
        match self {
            DataFormat::UInt8 => [0.0, u8::MAX as f64],
            DataFormat::Int8 => [i8::MIN as f64, i8::MAX as f64],
            DataFormat::UInt16 => [0.0, u16::MAX as f64],
            DataFormat::Int16 => [i16::MIN as f64, i16::MAX as f64],
            DataFormat::UInt32 => [0.0, u32::MAX as f64],
            DataFormat::Int32 => [i32::MIN as f64, i32::MAX as f64],
            DataFormat::Float32 | DataFormat::Float64 => [0.0, 1.0],
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataFormat::UInt8 => "UINT8",
            DataFormat::Int8 => "INT8",
            DataFormat::UInt16 => "UINT16",
            DataFormat::Int16 => "INT16",
            DataFormat::UInt32 => "UINT32",
            DataFormat::Int32 => "INT32",
            DataFormat::Float32 => "FLOAT32",
            DataFormat::Float64 => "FLOAT64",
        };
        f.write_str(name)
    }
}

impl FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uint8" => Ok(DataFormat::UInt8),
            "int8" => Ok(DataFormat::Int8),
            "uint16" => Ok(DataFormat::UInt16),
            "int16" => Ok(DataFormat::Int16),
            "uint32" => Ok(DataFormat::UInt32),
            "int32" => Ok(DataFormat::Int32),
            "float32" => Ok(DataFormat::Float32),
            "float64" => Ok(DataFormat::Float64),
            _ => Err(format!("unknown data format '{}'", s)),
        }
    }
}

/// A named axis with a unit label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub unit: String,
}

impl Axis {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

/// Mapping between stored values and physical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMapper {
    /// Range of raw values as stored.
    pub data_range: [f64; 2],
    /// Range after mapping into physical units.
    pub value_range: [f64; 2],
    pub value_axis: Axis,
}

impl DataMapper {
    /// Mapper with the format's default range and an unnamed axis.
    pub fn for_format(format: DataFormat) -> Self {
        let range = format.default_data_range();
        Self {
            data_range: range,
            value_range: range,
            value_axis: Axis::default(),
        }
    }

    pub fn new(data_range: [f64; 2], value_range: [f64; 2], value_axis: Axis) -> Self {
        Self {
            data_range,
            value_range,
            value_axis,
        }
    }

    /// Map a raw value into the physical value range.
    pub fn map_to_value(&self, raw: f64) -> f64 {
        let [d0, d1] = self.data_range;
        let [v0, v1] = self.value_range;
        if d1 == d0 {
            return v0;
        }
        v0 + (raw - d0) / (d1 - d0) * (v1 - v0)
    }
}

impl Default for DataMapper {
    fn default() -> Self {
        Self::for_format(DataFormat::UInt8)
    }
}
