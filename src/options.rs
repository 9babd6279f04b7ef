//! Per-call compilation options

use crate::DefineList;
use std::fmt;
use std::path::{Path, PathBuf};

/// Output kind requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Target {
    /// Binary bytecode (DXIL)
    #[default]
    Binary,
    /// Transpiled textual source (HLSL)
    Source,
}

impl Target {
    /// Returns true if this target produces binary bytecode.
    pub fn is_binary(&self) -> bool {
        matches!(self, Target::Binary)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Binary => f.write_str("binary"),
            Target::Source => f.write_str("source"),
        }
    }
}

/// In-memory layout of shader matrix types.
///
/// Must match the convention the calling graphics pipeline expects; a
/// mismatch silently corrupts matrix math without a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatrixLayout {
    /// Row-major matrix packing
    #[default]
    RowMajor,
    /// Column-major matrix packing
    ColumnMajor,
}

/// Configuration for a single compile call.
///
/// All per-call state lives here rather than on the [`Compiler`]; the
/// compiler itself only owns the backend session. Search paths accumulate
/// within one options value and are never cleared automatically.
///
/// # Example
/// ```
/// use shc::{CompileOptions, MatrixLayout, Target};
///
/// let options = CompileOptions::new(Target::Binary)
///     .matrix_layout(MatrixLayout::RowMajor)
///     .search_path("shaders/include")
///     .define("_BUFFER_SIZE", "42")
///     .define_flag("_RAY_TRACING");
/// ```
///
/// [`Compiler`]: crate::Compiler
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Requested output kind
    pub target: Target,
    /// Matrix packing convention
    pub matrix_layout: MatrixLayout,
    /// Include/module search directories, applied in order
    pub search_paths: Vec<PathBuf>,
    /// Preprocessor defines
    pub defines: DefineList,
}

impl CompileOptions {
    /// Creates options for the given target with defaults everywhere else.
    pub fn new(target: Target) -> Self {
        CompileOptions {
            target,
            ..Default::default()
        }
    }

    /// Sets the matrix packing convention.
    pub fn matrix_layout(mut self, layout: MatrixLayout) -> Self {
        self.matrix_layout = layout;
        self
    }

    /// Appends an include/module search directory.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds a preprocessor define.
    pub fn define(mut self, name: &str, value: &str) -> Self {
        self.defines.add(name, value);
        self
    }

    /// Adds a preprocessor define with an empty value.
    pub fn define_flag(mut self, name: &str) -> Self {
        self.defines.add_flag(name);
        self
    }

    /// Replaces the define list wholesale.
    pub fn defines(mut self, defines: DefineList) -> Self {
        self.defines = defines;
        self
    }
}
