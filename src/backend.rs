//! Backend compiler contract
//!
//! The front-end drives an external shading-language compiler through this
//! contract: a session owns transient compile requests, a request accepts
//! configuration calls followed by a single compile invocation, and a
//! successful request exposes the produced payload plus a reflection view
//! of parameters and entry points. The front-end never implements any of
//! this itself; it only has to drive it correctly.

use crate::{MatrixLayout, Result, Target};
use std::path::Path;

/// A session with the backend compiler library.
///
/// One session per [`Compiler`](crate::Compiler); opened at construction,
/// closed when the session is dropped. All compile requests issued through
/// a session are owned by it and must not outlive it.
pub trait BackendSession {
    /// The compile request type this session produces.
    type Request: BackendRequest;

    /// Creates a fresh compile request for a single compilation.
    fn create_request(&mut self) -> Result<Self::Request>;
}

/// A single backend compile transaction.
///
/// Configuration calls are applied before [`compile`](Self::compile);
/// payload and reflection accessors are only meaningful after a successful
/// compile. Payload references borrow from the request, so they stay valid
/// exactly as long as the request is alive.
pub trait BackendRequest {
    /// Sets the code generation target.
    fn set_target(&mut self, target: Target);

    /// Sets the matrix packing convention.
    fn set_matrix_layout(&mut self, layout: MatrixLayout);

    /// Appends an include/module search directory.
    fn add_search_path(&mut self, path: &Path);

    /// Adds a preprocessor define.
    fn add_define(&mut self, name: &str, value: &str);

    /// Registers a translation unit and returns its index.
    fn add_translation_unit(&mut self, path: &Path) -> i32;

    /// Registers an entry point in a translation unit and returns its index.
    fn add_entry_point(&mut self, translation_unit: i32, name: &str, profile: &str) -> i32;

    /// Invokes compilation. Returns true on success.
    fn compile(&mut self) -> bool;

    /// Returns the backend's diagnostic output (empty when clean).
    fn diagnostics(&self) -> String;

    /// Returns the compiled bytecode for an entry point.
    fn entry_point_code(&self, entry_point: i32) -> &[u8];

    /// Returns the transpiled source for an entry point.
    fn entry_point_source(&self, entry_point: i32) -> &str;

    /// Number of reflected shader parameters.
    fn parameter_count(&self) -> u32;

    /// Reflection data for the parameter at `index`.
    fn parameter(&self, index: u32) -> ParameterDesc;

    /// Number of reflected entry points.
    fn entry_point_count(&self) -> u32;

    /// Reflection data for the entry point at `index`.
    fn entry_point(&self, index: u32) -> EntryPointDesc;
}

/// Reflected type of a shader parameter.
///
/// Array declarations carry the element type as a child node; the
/// extractor performs the unwrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDesc {
    /// Backend type name (e.g. `"StructuredBuffer"`)
    pub name: String,
    /// Declared element count; meaningful only for array types
    pub element_count: u32,
    /// Element type when this is an array type
    pub element: Option<Box<TypeDesc>>,
}

impl TypeDesc {
    /// A non-array type with the given name.
    pub fn scalar(name: impl Into<String>) -> Self {
        TypeDesc {
            name: name.into(),
            element_count: 0,
            element: None,
        }
    }

    /// An array of `count` elements of the given element type name.
    pub fn array(element_name: impl Into<String>, count: u32) -> Self {
        TypeDesc {
            name: "Array".to_string(),
            element_count: count,
            element: Some(Box::new(TypeDesc::scalar(element_name))),
        }
    }
}

/// One reflected shader parameter, as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDesc {
    /// Declared name
    pub name: String,
    /// Backend binding category name (e.g. `"ShaderResource"`)
    pub category: String,
    /// Declared type
    pub ty: TypeDesc,
    /// Register index assigned by the backend
    pub binding_index: u32,
    /// Binding space assigned by the backend
    pub binding_space: u32,
}

/// Pipeline stage of a reflected entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Fragment,
    Compute,
    /// A stage this front-end does not model (e.g. raytracing stages)
    Unknown,
}

/// One reflected entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointDesc {
    /// Entry point symbol name
    pub name: String,
    /// Pipeline stage
    pub stage: Stage,
    /// Declared `[numthreads(x, y, z)]` values; zeros for non-compute stages
    pub thread_group_size: [u32; 3],
}
