//! Core building blocks shared by every shelf crate: layered settings, the
//! [`Module`] trait and the [`ModuleRegistry`] that drives module lifecycles.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
