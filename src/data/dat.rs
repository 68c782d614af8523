//! The `.dat` sidecar header of raw volume files.
//!
//! A `.dat` file is a plain-text header of `Key: value` lines describing a
//! sibling `.raw` binary payload: resolution, sample format, byte layout,
//! basis and offset, value calibration and axis names. Keys are matched
//! case-insensitively. Only the header round-trips here; decoding the
//! payload itself is a reader concern outside this crate.

use crate::data::datamapper::{Axis, DataFormat, DataMapper};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatError {
    #[error("missing required key '{key}'")]
    MissingKey { key: String },

    #[error("invalid value '{value}' for key '{key}'")]
    InvalidValue { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte order of the raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

/// Parsed `.dat` header.
#[derive(Debug, Clone, PartialEq)]
pub struct DatHeader {
    /// Path of the sibling `.raw` payload, relative to the header file.
    pub raw_file: PathBuf,
    pub resolution: [usize; 3],
    pub format: DataFormat,
    pub byte_order: ByteOrder,
    pub byte_offset: u64,
    pub compression: Option<String>,
    /// Model-space basis vectors; defaults to the unit cube.
    pub basis: [[f64; 3]; 3],
    pub offset: [f64; 3],
    pub mapper: DataMapper,
    pub swizzle_mask: String,
    pub interpolation: String,
    pub wrapping: String,
}

impl DatHeader {
    pub fn new(raw_file: impl Into<PathBuf>, resolution: [usize; 3], format: DataFormat) -> Self {
        Self {
            raw_file: raw_file.into(),
            resolution,
            format,
            byte_order: ByteOrder::default(),
            byte_offset: 0,
            compression: None,
            basis: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            offset: [0.0; 3],
            mapper: DataMapper::for_format(format),
            swizzle_mask: "rgba".to_string(),
            interpolation: "linear".to_string(),
            wrapping: "clamp".to_string(),
        }
    }

    /// Total payload size in bytes implied by resolution and format.
    pub fn payload_size(&self) -> usize {
        self.resolution.iter().product::<usize>() * self.format.size_bytes()
    }

    /// Parse the header text.
    pub fn parse(text: &str) -> Result<Self, DatError> {
        let mut raw_file = None;
        let mut resolution = None;
        let mut format = None;
        let mut byte_order = ByteOrder::default();
        let mut byte_offset = 0u64;
        let mut compression = None;
        let mut basis = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let mut offset = [0.0f64; 3];
        let mut data_range = None;
        let mut value_range = None;
        let mut value_axis = Axis::default();
        let mut swizzle_mask = "rgba".to_string();
        let mut interpolation = "linear".to_string();
        let mut wrapping = "clamp".to_string();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "rawfile" | "objectfilename" => raw_file = Some(PathBuf::from(value)),
                "resolution" => resolution = Some(parse_triple::<usize>(&key, value)?),
                "format" => {
                    format = Some(value.parse::<DataFormat>().map_err(|_| {
                        DatError::InvalidValue {
                            key: key.clone(),
                            value: value.to_string(),
                        }
                    })?)
                }
                "byteorder" => {
                    byte_order = match value.to_ascii_lowercase().as_str() {
                        "littleendian" => ByteOrder::LittleEndian,
                        "bigendian" => ByteOrder::BigEndian,
                        _ => {
                            return Err(DatError::InvalidValue {
                                key: key.clone(),
                                value: value.to_string(),
                            })
                        }
                    }
                }
                "byteoffset" => {
                    byte_offset = value.parse().map_err(|_| DatError::InvalidValue {
                        key: key.clone(),
                        value: value.to_string(),
                    })?
                }
                "compression" => compression = Some(value.to_string()),
                "basisvector1" => basis[0] = parse_triple::<f64>(&key, value)?,
                "basisvector2" => basis[1] = parse_triple::<f64>(&key, value)?,
                "basisvector3" => basis[2] = parse_triple::<f64>(&key, value)?,
                "offset" => offset = parse_triple::<f64>(&key, value)?,
                "datarange" => data_range = Some(parse_pair(&key, value)?),
                "valuerange" => value_range = Some(parse_pair(&key, value)?),
                "valuename" | "valueaxisname" => value_axis.name = value.to_string(),
                "valueunit" | "valueaxisunit" => value_axis.unit = value.to_string(),
                "swizzlemask" => swizzle_mask = value.to_string(),
                "interpolation" => interpolation = value.to_string(),
                "wrapping" => wrapping = value.to_string(),
                // Unknown keys are preserved behavior-wise by being ignored.
                _ => tracing::debug!("Ignoring unknown .dat key '{}'", key),
            }
        }

        let format = format.ok_or_else(|| DatError::MissingKey {
            key: "Format".to_string(),
        })?;
        let raw_file = raw_file.ok_or_else(|| DatError::MissingKey {
            key: "RawFile".to_string(),
        })?;
        let resolution = resolution.ok_or_else(|| DatError::MissingKey {
            key: "Resolution".to_string(),
        })?;

        let data_range = data_range.unwrap_or_else(|| format.default_data_range());
        let value_range = value_range.unwrap_or(data_range);

        Ok(Self {
            raw_file,
            resolution,
            format,
            byte_order,
            byte_offset,
            compression,
            basis,
            offset,
            mapper: DataMapper::new(data_range, value_range, value_axis),
            swizzle_mask,
            interpolation,
            wrapping,
        })
    }

    /// Render the header text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "RawFile: {}", self.raw_file.display());
        let _ = writeln!(
            out,
            "Resolution: {} {} {}",
            self.resolution[0], self.resolution[1], self.resolution[2]
        );
        let _ = writeln!(out, "Format: {}", self.format);
        let _ = writeln!(
            out,
            "ByteOrder: {}",
            match self.byte_order {
                ByteOrder::LittleEndian => "LittleEndian",
                ByteOrder::BigEndian => "BigEndian",
            }
        );
        if self.byte_offset != 0 {
            let _ = writeln!(out, "ByteOffset: {}", self.byte_offset);
        }
        if let Some(compression) = &self.compression {
            let _ = writeln!(out, "Compression: {}", compression);
        }
        for (i, basis) in self.basis.iter().enumerate() {
            let _ = writeln!(
                out,
                "BasisVector{}: {} {} {}",
                i + 1,
                basis[0],
                basis[1],
                basis[2]
            );
        }
        let _ = writeln!(
            out,
            "Offset: {} {} {}",
            self.offset[0], self.offset[1], self.offset[2]
        );
        let _ = writeln!(
            out,
            "DataRange: {} {}",
            self.mapper.data_range[0], self.mapper.data_range[1]
        );
        let _ = writeln!(
            out,
            "ValueRange: {} {}",
            self.mapper.value_range[0], self.mapper.value_range[1]
        );
        if !self.mapper.value_axis.name.is_empty() {
            let _ = writeln!(out, "ValueName: {}", self.mapper.value_axis.name);
        }
        if !self.mapper.value_axis.unit.is_empty() {
            let _ = writeln!(out, "ValueUnit: {}", self.mapper.value_axis.unit);
        }
        let _ = writeln!(out, "SwizzleMask: {}", self.swizzle_mask);
        let _ = writeln!(out, "Interpolation: {}", self.interpolation);
        let _ = writeln!(out, "Wrapping: {}", self.wrapping);
        out
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatError> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }
}

fn parse_triple<T: std::str::FromStr + Copy>(key: &str, value: &str) -> Result<[T; 3], DatError> {
    let err = || DatError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let parts: Vec<T> = value
        .split_whitespace()
        .map(|p| p.parse::<T>())
        .collect::<Result<_, _>>()
        .map_err(|_| err())?;
    match parts.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(err()),
    }
}

fn parse_pair(key: &str, value: &str) -> Result<[f64; 2], DatError> {
    let err = || DatError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let parts: Vec<f64> = value
        .split_whitespace()
        .map(|p| p.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| err())?;
    match parts.as_slice() {
        [a, b] => Ok([*a, *b]),
        _ => Err(err()),
    }
}
