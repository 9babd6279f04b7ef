//! Shader compilation front-end with binding reflection
//!
//! Given HLSL source, an entry point, a target profile, preprocessor
//! defines, and search paths, this crate drives a shading-language
//! compiler backend, retrieves the produced bytecode or transpiled
//! source, and extracts a backend-independent description of every
//! resource binding the shader declares, plus compute thread-group
//! metadata.
//!
//! The backend is an external collaborator reached through the traits in
//! [`backend`]; the crate only drives it and normalizes its output. The
//! Slang compiler binding is available behind the `slang` cargo feature
//! (links against `libslang`).
//!
//! # Example
//! ```no_run
//! use shc::backend::BackendSession;
//! use shc::{CompileOptions, Compiler, MatrixLayout, Target};
//!
//! fn reflect_bindings(compiler: &mut Compiler<impl BackendSession>) -> shc::Result<()> {
//!     let options = CompileOptions::new(Target::Binary)
//!         .matrix_layout(MatrixLayout::RowMajor)
//!         .search_path("shaders")
//!         .define("_BUFFER_SIZE", "42")
//!         .define_flag("_RAY_TRACING");
//!
//!     let output = compiler.compile("shaders/test.hlsl", "main", "cs_6_5", &options)?;
//!
//!     for variable in output.variables.values() {
//!         println!(
//!             "{}: {:?} ({:?}) at index {} space {} x{}",
//!             variable.name, variable.ty, variable.usage,
//!             variable.index, variable.space, variable.count,
//!         );
//!     }
//!     println!("thread group size {:?}", output.thread_group_size);
//!     Ok(())
//! }
//! ```

pub mod backend;
mod compile;
mod define;
mod error;
mod options;
mod reflect;
#[cfg(feature = "slang")]
pub mod slang;

pub use compile::{CompileOutput, Compiler};
pub use define::DefineList;
pub use error::{Error, Result};
pub use options::{CompileOptions, MatrixLayout, Target};
pub use reflect::{Usage, Variable, VariableType};
#[cfg(feature = "slang")]
pub use slang::{SlangRequest, SlangSession};
