//! Property substrate: owners, values, composites, events, links.
//!
//! A property is a named, typed, observable parameter. Properties belong to
//! an owner (a processor or a composite property) that keeps them in display
//! order under unique identifiers and aggregates their invalidation state.
//!
//! # Design
//!
//! - **Flat arena** — all properties of one owner tree live in a `Vec`
//!   indexed by [`PropertyId`]; parent links are back-reference ids, never
//!   lifetime-extending.
//! - **Owned vs referenced** — owned properties are destroyed with their
//!   owner and always fully persisted; referenced (structural) properties
//!   survive detachment and reset to defaults on reload.
//! - **Explicit capabilities** — event/composite behavior is discovered via
//!   `as_event()` / `as_composite()`, not downcasts.

pub mod events;
pub mod id;
pub mod owner;
pub mod path;
pub mod property;
pub mod value;

pub use events::{OwnerEvent, OwnerObservers};
pub use id::PropertyId;
pub use owner::{PropertyTree, StructuralError};
pub use path::{split_first, PropertyPath};
pub use property::{
    ChildSet, CompositeState, Event, EventState, InvalidationLevel, PropertyKind, PropertyNode,
    PropertySerializationMode, ValueState,
};
pub use value::PropertyValue;
