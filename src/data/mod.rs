//! Data metadata shared by volume-like entities.
//!
//! Covers the calibration metadata the workspace must round-trip (ranges and
//! axes via [`DataMapper`]) and the `.dat` sidecar header describing raw
//! payload files. Payload codecs themselves are reader/writer concerns and
//! live outside this crate.

pub mod dat;
pub mod datamapper;

pub use dat::{ByteOrder, DatError, DatHeader};
pub use datamapper::{Axis, DataFormat, DataMapper};
