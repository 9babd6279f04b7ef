//! Shader compilation API

use crate::backend::{BackendRequest, BackendSession};
use crate::reflect::{self, Variable};
use crate::{CompileOptions, Error, Result, Target};
use log::debug;
use std::collections::HashMap;
use std::path::Path;

/// Shader compiler front-end.
///
/// Owns one backend session for its whole lifetime; the session is opened
/// when the compiler is constructed and closed when it is dropped. Every
/// [`compile`](Compiler::compile) call runs a fresh, transient compile
/// request through that session.
///
/// A `Compiler` is not safe for concurrent `compile` calls: the session is
/// shared mutable state during request construction. Callers that compile
/// from multiple threads either serialize access to one compiler or use
/// one compiler per thread.
///
/// # Example
/// ```no_run
/// use shc::backend::BackendSession;
/// use shc::{CompileOptions, Compiler, Target};
///
/// fn compile_kernel(compiler: &mut Compiler<impl BackendSession>) -> shc::Result<()> {
///     let options = CompileOptions::new(Target::Binary)
///         .search_path("shaders")
///         .define("_BUFFER_SIZE", "42");
///
///     let output = compiler.compile("shaders/test.hlsl", "main", "cs_6_5", &options)?;
///
///     let var = &output.variables["bufferArray"];
///     println!("t{} space{} x{}", var.index, var.space, var.count);
///     Ok(())
/// }
/// ```
pub struct Compiler<S: BackendSession> {
    session: S,
}

impl<S: BackendSession> Compiler<S> {
    /// Creates a compiler around an already-open backend session.
    pub fn with_session(session: S) -> Self {
        Compiler { session }
    }

    /// Compiles one entry point of the source file at `path`.
    ///
    /// The source file and the directories in
    /// [`options.search_paths`](CompileOptions::search_paths) are opaque
    /// strings resolved by the backend; existence and readability surface
    /// only through its diagnostics. `profile` is the backend capability
    /// profile for the entry point (e.g. `"cs_6_5"`).
    ///
    /// On backend compilation errors this returns
    /// [`Error::Compilation`] carrying the diagnostic text verbatim; the
    /// call is never retried, since failures are a deterministic function
    /// of the input. Strings destined for the backend must not contain
    /// interior null bytes; offenders are rejected with
    /// [`Error::InvalidParameter`] before any request is configured.
    /// There is no cancellation or timeout; the call blocks until the
    /// backend finishes.
    pub fn compile(
        &mut self,
        path: impl AsRef<Path>,
        entry: &str,
        profile: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput<S::Request>> {
        let path = path.as_ref();
        check_null_free(&path.to_string_lossy(), "source path")?;
        check_null_free(entry, "entry point")?;
        check_null_free(profile, "profile")?;
        for search_path in &options.search_paths {
            check_null_free(&search_path.to_string_lossy(), "search path")?;
        }
        for (name, value) in options.defines.iter() {
            check_null_free(name, "define name")?;
            check_null_free(value, "define value")?;
        }

        let mut request = self.session.create_request()?;

        request.set_target(options.target);
        request.set_matrix_layout(options.matrix_layout);
        for search_path in &options.search_paths {
            request.add_search_path(search_path);
        }
        for (name, value) in options.defines.iter() {
            request.add_define(name, value);
        }

        let translation_unit = request.add_translation_unit(path);
        let entry_point_index = request.add_entry_point(translation_unit, entry, profile);

        debug!(
            "compiling {} entry '{}' profile '{}' target {}",
            path.display(),
            entry,
            profile,
            options.target
        );

        if !request.compile() {
            return Err(Error::Compilation {
                diagnostics: request.diagnostics(),
            });
        }

        let (variables, thread_group_size) = reflect::extract(&request, entry);
        debug!(
            "compiled {} ({} bindings)",
            path.display(),
            variables.len()
        );

        Ok(CompileOutput {
            request,
            target: options.target,
            entry_point_index,
            variables,
            thread_group_size,
        })
    }
}

fn check_null_free(value: &str, what: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(Error::InvalidParameter(format!("{what} contains null byte")));
    }
    Ok(())
}

/// Output of one successful compile.
///
/// Owns the backend compile-request handle: the payload returned by
/// [`bytecode`](CompileOutput::bytecode) or
/// [`source`](CompileOutput::source) borrows from that handle and is valid
/// exactly as long as this output is alive. Copy the payload out if it
/// must outlive the output.
pub struct CompileOutput<R: BackendRequest> {
    request: R,
    target: Target,
    entry_point_index: i32,
    /// Resource bindings declared by the shader, keyed by name
    pub variables: HashMap<String, Variable>,
    /// Declared `[numthreads(x, y, z)]` values when the requested entry
    /// point is a compute stage; `[0, 0, 0]` otherwise
    pub thread_group_size: [u32; 3],
}

impl<R: BackendRequest> CompileOutput<R> {
    /// Compiled bytecode; `None` unless the target was [`Target::Binary`].
    pub fn bytecode(&self) -> Option<&[u8]> {
        self.target
            .is_binary()
            .then(|| self.request.entry_point_code(self.entry_point_index))
    }

    /// Transpiled source; `None` unless the target was [`Target::Source`].
    pub fn source(&self) -> Option<&str> {
        (!self.target.is_binary())
            .then(|| self.request.entry_point_source(self.entry_point_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{FakeSession, Script};
    use crate::backend::{EntryPointDesc, ParameterDesc, Stage, TypeDesc};
    use crate::reflect::{Usage, VariableType};
    use crate::{DefineList, MatrixLayout};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn compute_script() -> Script {
        let mut script = Script::success();
        script.parameters = vec![
            ParameterDesc {
                name: "bufferArray".to_string(),
                category: "ShaderResource".to_string(),
                ty: TypeDesc::array("StructuredBuffer", 4),
                binding_index: 0,
                binding_space: 1,
            },
            ParameterDesc {
                name: "Globals".to_string(),
                category: "ConstantBuffer".to_string(),
                ty: TypeDesc::scalar("ConstantBuffer"),
                binding_index: 2,
                binding_space: 0,
            },
        ];
        script.entry_points = vec![EntryPointDesc {
            name: "main".to_string(),
            stage: Stage::Compute,
            thread_group_size: [8, 8, 1],
        }];
        script
    }

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_compile_configures_request_from_options() {
        init_logging();
        let session = FakeSession::new(Script::success());
        let recorded = Rc::clone(&session.recorded);
        let mut compiler = Compiler::with_session(session);

        let options = CompileOptions::new(Target::Binary)
            .matrix_layout(MatrixLayout::ColumnMajor)
            .search_path("shaders")
            .search_path("shaders/include")
            .define("_BUFFER_SIZE", "42")
            .define_flag("_RAY_TRACING");

        compiler
            .compile("shaders/test.hlsl", "main", "cs_6_5", &options)
            .unwrap();

        let recorded = recorded.borrow();
        assert_eq!(recorded.target, Some(Target::Binary));
        assert_eq!(recorded.matrix_layout, Some(MatrixLayout::ColumnMajor));
        assert_eq!(
            recorded.search_paths,
            vec![PathBuf::from("shaders"), PathBuf::from("shaders/include")]
        );
        assert_eq!(recorded.defines.len(), 2);
        assert!(recorded.defines.contains(&("_BUFFER_SIZE".to_string(), "42".to_string())));
        assert!(recorded.defines.contains(&("_RAY_TRACING".to_string(), String::new())));
        assert_eq!(recorded.translation_units, vec![PathBuf::from("shaders/test.hlsl")]);
        assert_eq!(
            recorded.entry_points,
            vec![(0, "main".to_string(), "cs_6_5".to_string())]
        );
        assert!(recorded.compiled);
    }

    #[test]
    fn test_binary_target_populates_only_bytecode() {
        let mut compiler = Compiler::with_session(FakeSession::new(Script::success()));
        let output = compiler
            .compile("a.hlsl", "main", "ps_6_0", &CompileOptions::new(Target::Binary))
            .unwrap();

        assert_eq!(output.bytecode(), Some(b"DXIL-fake-payload".as_slice()));
        assert_eq!(output.source(), None);
    }

    #[test]
    fn test_source_target_populates_only_source() {
        let mut compiler = Compiler::with_session(FakeSession::new(Script::success()));
        let output = compiler
            .compile("a.hlsl", "main", "ps_6_0", &CompileOptions::new(Target::Source))
            .unwrap();

        assert_eq!(output.bytecode(), None);
        assert_eq!(output.source(), Some("float4 main() { return 0; }"));
    }

    #[test]
    fn test_failed_compile_surfaces_diagnostics() {
        let script = Script::failure("test.hlsl(3): error 30015: undefined identifier 'foo'");
        let mut compiler = Compiler::with_session(FakeSession::new(script));

        let result = compiler.compile("test.hlsl", "main", "cs_6_5", &CompileOptions::default());

        match result {
            Err(Error::Compilation { diagnostics }) => {
                assert!(diagnostics.contains("error 30015"));
            }
            other => panic!("expected compilation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_interior_null_byte_is_rejected_before_configuration() {
        let session = FakeSession::new(Script::success());
        let recorded = Rc::clone(&session.recorded);
        let mut compiler = Compiler::with_session(session);

        let options = CompileOptions::default().define("BAD\0NAME", "1");
        let result = compiler.compile("a.hlsl", "main", "cs_6_5", &options);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let options = CompileOptions::default().define("SIZE", "4\02");
        let result = compiler.compile("a.hlsl", "main\0", "cs_6_5", &options);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        // Rejected inputs never reached the backend.
        assert!(!recorded.borrow().compiled);
        assert!(recorded.borrow().defines.is_empty());
    }

    #[test]
    fn test_request_creation_failure() {
        let mut session = FakeSession::new(Script::success());
        session.fail_request_creation = true;
        let mut compiler = Compiler::with_session(session);

        let result = compiler.compile("a.hlsl", "main", "cs_6_5", &CompileOptions::default());
        assert!(matches!(result, Err(Error::Request(_))));
    }

    #[test]
    fn test_end_to_end_compute_reflection() {
        let mut compiler = Compiler::with_session(FakeSession::new(compute_script()));
        let output = compiler
            .compile("test.hlsl", "main", "cs_6_5", &CompileOptions::default())
            .unwrap();

        assert_eq!(
            output.variables["bufferArray"],
            Variable {
                name: "bufferArray".to_string(),
                ty: VariableType::StructuredBuffer,
                usage: Usage::ShaderResource,
                index: 0,
                space: 1,
                count: 4,
            }
        );
        assert_eq!(
            output.variables["Globals"],
            Variable {
                name: "Globals".to_string(),
                ty: VariableType::ConstantBuffer,
                usage: Usage::ConstantBuffer,
                index: 2,
                space: 0,
                count: 1,
            }
        );
        assert_eq!(output.thread_group_size, [8, 8, 1]);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let compile_once = |defines: DefineList| {
            let mut compiler = Compiler::with_session(FakeSession::new(compute_script()));
            let options = CompileOptions::new(Target::Binary).defines(defines);
            let output = compiler
                .compile("test.hlsl", "main", "cs_6_5", &options)
                .unwrap();
            (output.bytecode().unwrap().to_vec(), output.variables.clone())
        };

        // Same input, fresh compiler, opposite define insertion order.
        let ab: DefineList = [("A", "1"), ("B", "")].into_iter().collect();
        let ba: DefineList = [("B", ""), ("A", "1")].into_iter().collect();

        let (code_first, vars_first) = compile_once(ab);
        let (code_second, vars_second) = compile_once(ba);

        assert_eq!(code_first, code_second);
        assert_eq!(vars_first, vars_second);
    }
}
