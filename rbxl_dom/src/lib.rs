//! A weakly-referenced instance forest used as the in-memory representation
//! of Roblox place and model files.
//!
//! Instances are owned by a [`Dom`] and refer to each other through
//! [`Ref`][rbxl_types::Ref] values instead of real references, which keeps
//! cross-instance links (like `ObjectValue.Value`) free of ownership cycles.

mod dom;
mod instance;

pub use crate::{
    dom::Dom,
    instance::{Instance, InstanceBuilder},
};

pub use rbxl_types as types;
