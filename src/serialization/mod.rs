//! Tree-structured persistence substrate.
//!
//! Workspaces are saved as an XML-like element tree (tag + attributes +
//! children), encoded as JSON on disk. A [`Serializer`] walks a live object
//! graph and grows the tree; a [`Deserializer`] walks a persisted tree and
//! reconstructs or mutates a live graph.
//!
//! # Design
//!
//! - **NodeSwitch** — scoped cursor redirection with guaranteed restore on
//!   every exit path. A stack discipline, not a tree mutation.
//! - **Identifier-keyed diffing** — keyed collections are merged by
//!   identifier with `on_new`/`on_remove`/`on_move` hooks, preserving live
//!   children the document does not know about.
//! - **Skip-and-continue** — malformed elements inside collections go through
//!   `handle_error` and are dropped; only whole-document failures abort.

pub mod cursor;
pub mod deserializer;
pub mod element;
pub mod error;
pub mod serializer;

pub use cursor::{NodeSwitch, TreeCursor};
pub use deserializer::{identifier_diff, Deserializer, KeyedDiffHandler};
pub use element::Element;
pub use error::{SerializationError, SerializationResult};
pub use serializer::Serializer;
