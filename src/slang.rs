//! Slang-backed session
//!
//! Drives the Slang compiler library through its compile-request C API.
//! [`SlangSession`] owns the process-wide `SlangSession*` handle;
//! [`SlangRequest`] owns one `SlangCompileRequest*` and releases it on
//! drop, which is what keeps payload pointers handed out by the backend
//! valid for the lifetime of a [`CompileOutput`](crate::CompileOutput).

use crate::backend::{BackendRequest, BackendSession, EntryPointDesc, ParameterDesc, Stage, TypeDesc};
use crate::{Error, MatrixLayout, Result, Target};
use std::ffi::{CStr, CString};
use std::path::Path;
use std::rc::Rc;

mod ffi {
    use std::ffi::{c_char, c_int, c_uint, c_void};

    #[repr(C)]
    pub struct SlangSession {
        _opaque: [u8; 0],
    }
    #[repr(C)]
    pub struct SlangCompileRequest {
        _opaque: [u8; 0],
    }
    #[repr(C)]
    pub struct SlangReflection {
        _opaque: [u8; 0],
    }
    #[repr(C)]
    pub struct SlangReflectionParameter {
        _opaque: [u8; 0],
    }
    #[repr(C)]
    pub struct SlangReflectionVariable {
        _opaque: [u8; 0],
    }
    #[repr(C)]
    pub struct SlangReflectionType {
        _opaque: [u8; 0],
    }
    #[repr(C)]
    pub struct SlangReflectionTypeLayout {
        _opaque: [u8; 0],
    }
    #[repr(C)]
    pub struct SlangReflectionEntryPoint {
        _opaque: [u8; 0],
    }

    pub type SlangProfileId = c_uint;
    pub type SlangUInt = u64;

    pub const SLANG_SOURCE_LANGUAGE_HLSL: c_int = 2;
    pub const SLANG_HLSL: c_int = 5;
    pub const SLANG_DXIL: c_int = 10;

    pub const SLANG_MATRIX_LAYOUT_ROW_MAJOR: c_uint = 1;
    pub const SLANG_MATRIX_LAYOUT_COLUMN_MAJOR: c_uint = 2;

    pub const SLANG_TYPE_KIND_ARRAY: c_uint = 2;

    pub const SLANG_STAGE_VERTEX: c_uint = 1;
    pub const SLANG_STAGE_HULL: c_uint = 2;
    pub const SLANG_STAGE_DOMAIN: c_uint = 3;
    pub const SLANG_STAGE_GEOMETRY: c_uint = 4;
    pub const SLANG_STAGE_FRAGMENT: c_uint = 5;
    pub const SLANG_STAGE_COMPUTE: c_uint = 6;

    #[link(name = "slang")]
    unsafe extern "C" {
        pub fn spCreateSession(deprecated: *const c_char) -> *mut SlangSession;
        pub fn spDestroySession(session: *mut SlangSession);
        pub fn spFindProfile(session: *mut SlangSession, name: *const c_char) -> SlangProfileId;

        pub fn spCreateCompileRequest(session: *mut SlangSession) -> *mut SlangCompileRequest;
        pub fn spDestroyCompileRequest(request: *mut SlangCompileRequest);

        pub fn spSetCodeGenTarget(request: *mut SlangCompileRequest, target: c_int);
        pub fn spSetMatrixLayoutMode(request: *mut SlangCompileRequest, mode: c_uint);
        pub fn spAddSearchPath(request: *mut SlangCompileRequest, path: *const c_char);
        pub fn spAddPreprocessorDefine(
            request: *mut SlangCompileRequest,
            key: *const c_char,
            value: *const c_char,
        );
        pub fn spAddTranslationUnit(
            request: *mut SlangCompileRequest,
            language: c_int,
            name: *const c_char,
        ) -> c_int;
        pub fn spAddTranslationUnitSourceFile(
            request: *mut SlangCompileRequest,
            translation_unit: c_int,
            path: *const c_char,
        );
        pub fn spAddEntryPoint(
            request: *mut SlangCompileRequest,
            translation_unit: c_int,
            name: *const c_char,
            profile: SlangProfileId,
        ) -> c_int;

        pub fn spCompile(request: *mut SlangCompileRequest) -> c_int;
        pub fn spGetDiagnosticOutput(request: *mut SlangCompileRequest) -> *const c_char;
        pub fn spGetEntryPointCode(
            request: *mut SlangCompileRequest,
            entry_point: c_int,
            out_size: *mut usize,
        ) -> *const c_void;
        pub fn spGetEntryPointSource(
            request: *mut SlangCompileRequest,
            entry_point: c_int,
        ) -> *const c_char;

        pub fn spGetReflection(request: *mut SlangCompileRequest) -> *mut SlangReflection;
        pub fn spReflection_GetParameterCount(reflection: *mut SlangReflection) -> c_uint;
        pub fn spReflection_GetParameterByIndex(
            reflection: *mut SlangReflection,
            index: c_uint,
        ) -> *mut SlangReflectionParameter;
        pub fn spReflectionVariableLayout_GetVariable(
            layout: *mut SlangReflectionParameter,
        ) -> *mut SlangReflectionVariable;
        pub fn spReflectionVariableLayout_GetTypeLayout(
            layout: *mut SlangReflectionParameter,
        ) -> *mut SlangReflectionTypeLayout;
        pub fn spReflectionTypeLayout_GetParameterCategory(
            layout: *mut SlangReflectionTypeLayout,
        ) -> c_uint;
        pub fn spReflectionParameter_GetBindingIndex(
            parameter: *mut SlangReflectionParameter,
        ) -> c_uint;
        pub fn spReflectionParameter_GetBindingSpace(
            parameter: *mut SlangReflectionParameter,
        ) -> c_uint;
        pub fn spReflectionVariable_GetName(
            variable: *mut SlangReflectionVariable,
        ) -> *const c_char;
        pub fn spReflectionVariable_GetType(
            variable: *mut SlangReflectionVariable,
        ) -> *mut SlangReflectionType;
        pub fn spReflectionType_GetName(ty: *mut SlangReflectionType) -> *const c_char;
        pub fn spReflectionType_GetKind(ty: *mut SlangReflectionType) -> c_uint;
        pub fn spReflectionType_GetElementCount(ty: *mut SlangReflectionType) -> usize;
        pub fn spReflectionType_GetElementType(
            ty: *mut SlangReflectionType,
        ) -> *mut SlangReflectionType;

        pub fn spReflection_getEntryPointCount(reflection: *mut SlangReflection) -> SlangUInt;
        pub fn spReflection_getEntryPointByIndex(
            reflection: *mut SlangReflection,
            index: SlangUInt,
        ) -> *mut SlangReflectionEntryPoint;
        pub fn spReflectionEntryPoint_getName(
            entry_point: *mut SlangReflectionEntryPoint,
        ) -> *const c_char;
        pub fn spReflectionEntryPoint_getStage(
            entry_point: *mut SlangReflectionEntryPoint,
        ) -> c_uint;
        pub fn spReflectionEntryPoint_getComputeThreadGroupSize(
            entry_point: *mut SlangReflectionEntryPoint,
            axis_count: SlangUInt,
            out_size_along_axis: *mut SlangUInt,
        );
    }
}

fn cstring(value: &str, what: &str) -> CString {
    CString::new(value).unwrap_or_else(|_| panic!("{what} contains null byte"))
}

fn string_from(ptr: *const std::ffi::c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

/// Name the extractor's category table matches against.
fn category_name(category: u32) -> &'static str {
    match category {
        2 => "ConstantBuffer",
        3 => "ShaderResource",
        4 => "UnorderedAccess",
        7 => "SamplerState",
        _ => "Unknown",
    }
}

fn stage_from(stage: u32) -> Stage {
    match stage {
        ffi::SLANG_STAGE_VERTEX => Stage::Vertex,
        ffi::SLANG_STAGE_HULL => Stage::Hull,
        ffi::SLANG_STAGE_DOMAIN => Stage::Domain,
        ffi::SLANG_STAGE_GEOMETRY => Stage::Geometry,
        ffi::SLANG_STAGE_FRAGMENT => Stage::Fragment,
        ffi::SLANG_STAGE_COMPUTE => Stage::Compute,
        _ => Stage::Unknown,
    }
}

unsafe fn type_desc(ty: *mut ffi::SlangReflectionType) -> TypeDesc {
    if ty.is_null() {
        return TypeDesc::scalar("");
    }
    let element = unsafe {
        if ffi::spReflectionType_GetKind(ty) == ffi::SLANG_TYPE_KIND_ARRAY {
            Some(ffi::spReflectionType_GetElementType(ty))
        } else {
            None
        }
    };
    TypeDesc {
        name: string_from(unsafe { ffi::spReflectionType_GetName(ty) }),
        element_count: element
            .map(|_| unsafe { ffi::spReflectionType_GetElementCount(ty) } as u32)
            .unwrap_or(0),
        element: element.map(|e| Box::new(unsafe { type_desc(e) })),
    }
}

/// Destroys the `SlangSession*` once the session and every request issued
/// through it are gone.
struct SessionHandle(*mut ffi::SlangSession);

impl Drop for SessionHandle {
    fn drop(&mut self) {
        unsafe { ffi::spDestroySession(self.0) };
    }
}

/// Owned handle to the Slang compiler library.
pub struct SlangSession {
    session: Rc<SessionHandle>,
}

impl SlangSession {
    /// Opens a session with the backend library.
    pub fn new() -> Result<Self> {
        let session = unsafe { ffi::spCreateSession(std::ptr::null()) };
        if session.is_null() {
            return Err(Error::Session("spCreateSession returned null".to_string()));
        }
        Ok(SlangSession {
            session: Rc::new(SessionHandle(session)),
        })
    }
}

impl BackendSession for SlangSession {
    type Request = SlangRequest;

    fn create_request(&mut self) -> Result<SlangRequest> {
        let request = unsafe { ffi::spCreateCompileRequest(self.session.0) };
        if request.is_null() {
            return Err(Error::Request(
                "spCreateCompileRequest returned null".to_string(),
            ));
        }
        // The request keeps the session alive until it is destroyed.
        Ok(SlangRequest {
            session: Rc::clone(&self.session),
            request,
        })
    }
}

impl crate::Compiler<SlangSession> {
    /// Creates a compiler with a fresh Slang session.
    pub fn new() -> Result<Self> {
        Ok(Self::with_session(SlangSession::new()?))
    }
}

/// Owned handle to one backend compile request.
pub struct SlangRequest {
    session: Rc<SessionHandle>,
    request: *mut ffi::SlangCompileRequest,
}

impl SlangRequest {
    fn reflection(&self) -> *mut ffi::SlangReflection {
        unsafe { ffi::spGetReflection(self.request) }
    }
}

impl Drop for SlangRequest {
    fn drop(&mut self) {
        unsafe { ffi::spDestroyCompileRequest(self.request) };
    }
}

impl BackendRequest for SlangRequest {
    fn set_target(&mut self, target: Target) {
        let target = match target {
            Target::Binary => ffi::SLANG_DXIL,
            Target::Source => ffi::SLANG_HLSL,
        };
        unsafe { ffi::spSetCodeGenTarget(self.request, target) };
    }

    fn set_matrix_layout(&mut self, layout: MatrixLayout) {
        let mode = match layout {
            MatrixLayout::RowMajor => ffi::SLANG_MATRIX_LAYOUT_ROW_MAJOR,
            MatrixLayout::ColumnMajor => ffi::SLANG_MATRIX_LAYOUT_COLUMN_MAJOR,
        };
        unsafe { ffi::spSetMatrixLayoutMode(self.request, mode) };
    }

    fn add_search_path(&mut self, path: &Path) {
        let path = cstring(&path.to_string_lossy(), "search path");
        unsafe { ffi::spAddSearchPath(self.request, path.as_ptr()) };
    }

    fn add_define(&mut self, name: &str, value: &str) {
        let name = cstring(name, "define name");
        let value = cstring(value, "define value");
        unsafe { ffi::spAddPreprocessorDefine(self.request, name.as_ptr(), value.as_ptr()) };
    }

    fn add_translation_unit(&mut self, path: &Path) -> i32 {
        let path = cstring(&path.to_string_lossy(), "source path");
        let empty = cstring("", "translation unit name");
        unsafe {
            let index = ffi::spAddTranslationUnit(
                self.request,
                ffi::SLANG_SOURCE_LANGUAGE_HLSL,
                empty.as_ptr(),
            );
            ffi::spAddTranslationUnitSourceFile(self.request, index, path.as_ptr());
            index
        }
    }

    fn add_entry_point(&mut self, translation_unit: i32, name: &str, profile: &str) -> i32 {
        let name = cstring(name, "entry point");
        let profile = cstring(profile, "profile");
        unsafe {
            let profile_id = ffi::spFindProfile(self.session.0, profile.as_ptr());
            ffi::spAddEntryPoint(self.request, translation_unit, name.as_ptr(), profile_id)
        }
    }

    fn compile(&mut self) -> bool {
        // spCompile returns nonzero when any errors were reported
        unsafe { ffi::spCompile(self.request) == 0 }
    }

    fn diagnostics(&self) -> String {
        string_from(unsafe { ffi::spGetDiagnosticOutput(self.request) })
    }

    fn entry_point_code(&self, entry_point: i32) -> &[u8] {
        unsafe {
            let mut size = 0usize;
            let data = ffi::spGetEntryPointCode(self.request, entry_point, &mut size);
            if data.is_null() {
                &[]
            } else {
                std::slice::from_raw_parts(data as *const u8, size)
            }
        }
    }

    fn entry_point_source(&self, entry_point: i32) -> &str {
        unsafe {
            let source = ffi::spGetEntryPointSource(self.request, entry_point);
            if source.is_null() {
                ""
            } else {
                CStr::from_ptr(source).to_str().unwrap_or_default()
            }
        }
    }

    fn parameter_count(&self) -> u32 {
        let reflection = self.reflection();
        if reflection.is_null() {
            return 0;
        }
        unsafe { ffi::spReflection_GetParameterCount(reflection) }
    }

    fn parameter(&self, index: u32) -> ParameterDesc {
        unsafe {
            let parameter = ffi::spReflection_GetParameterByIndex(self.reflection(), index);
            let variable = ffi::spReflectionVariableLayout_GetVariable(parameter);
            let type_layout = ffi::spReflectionVariableLayout_GetTypeLayout(parameter);

            ParameterDesc {
                name: string_from(ffi::spReflectionVariable_GetName(variable)),
                category: category_name(ffi::spReflectionTypeLayout_GetParameterCategory(
                    type_layout,
                ))
                .to_string(),
                ty: type_desc(ffi::spReflectionVariable_GetType(variable)),
                binding_index: ffi::spReflectionParameter_GetBindingIndex(parameter),
                binding_space: ffi::spReflectionParameter_GetBindingSpace(parameter),
            }
        }
    }

    fn entry_point_count(&self) -> u32 {
        let reflection = self.reflection();
        if reflection.is_null() {
            return 0;
        }
        unsafe { ffi::spReflection_getEntryPointCount(reflection) as u32 }
    }

    fn entry_point(&self, index: u32) -> EntryPointDesc {
        unsafe {
            let entry_point =
                ffi::spReflection_getEntryPointByIndex(self.reflection(), index as ffi::SlangUInt);
            let stage = stage_from(ffi::spReflectionEntryPoint_getStage(entry_point));

            let mut thread_group_size = [0u32; 3];
            if stage == Stage::Compute {
                let mut sizes = [0 as ffi::SlangUInt; 3];
                ffi::spReflectionEntryPoint_getComputeThreadGroupSize(
                    entry_point,
                    3,
                    sizes.as_mut_ptr(),
                );
                thread_group_size = [sizes[0] as u32, sizes[1] as u32, sizes[2] as u32];
            }

            EntryPointDesc {
                name: string_from(ffi::spReflectionEntryPoint_getName(entry_point)),
                stage,
                thread_group_size,
            }
        }
    }
}
