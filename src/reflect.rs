//! Binding reflection
//!
//! Translates the backend's post-compile reflection view into a stable,
//! backend-independent table of [`Variable`] descriptors plus compute
//! dispatch metadata. This is a pure pass over the reflection data, run
//! exactly once per successful compile.

use crate::backend::{BackendRequest, Stage};
use log::warn;
use std::collections::HashMap;

/// Resource kind of a shader binding.
///
/// A closed enumeration of the resource kinds this front-end models;
/// backend type names outside the table classify as [`Unknown`], which is
/// a valid terminal state rather than an error.
///
/// [`Unknown`]: VariableType::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    ConstantBuffer,
    Texture2D,
    Texture2DArray,
    Texture3D,
    RWTexture2D,
    RWTexture2DArray,
    RWTexture3D,
    Buffer,
    ByteAddressBuffer,
    StructuredBuffer,
    RWBuffer,
    RWByteAddressBuffer,
    RWStructuredBuffer,
    SamplerState,
    RaytracingAccelerationStructure,
    TextureHeap,
    BufferHeap,
    /// Backend type name with no entry in the lookup table
    Unknown,
}

/// Backend type name to resource kind, one line per supported kind.
const TYPE_NAMES: &[(&str, VariableType)] = &[
    ("ConstantBuffer", VariableType::ConstantBuffer),
    ("Texture2D", VariableType::Texture2D),
    ("Texture2DArray", VariableType::Texture2DArray),
    ("Texture3D", VariableType::Texture3D),
    ("RWTexture2D", VariableType::RWTexture2D),
    ("RWTexture2DArray", VariableType::RWTexture2DArray),
    ("RWTexture3D", VariableType::RWTexture3D),
    ("Buffer", VariableType::Buffer),
    ("ByteAddressBuffer", VariableType::ByteAddressBuffer),
    ("StructuredBuffer", VariableType::StructuredBuffer),
    ("RWBuffer", VariableType::RWBuffer),
    ("RWByteAddressBuffer", VariableType::RWByteAddressBuffer),
    ("RWStructuredBuffer", VariableType::RWStructuredBuffer),
    ("SamplerState", VariableType::SamplerState),
    (
        "RaytracingAccelerationStructure",
        VariableType::RaytracingAccelerationStructure,
    ),
    ("TextureHeap", VariableType::TextureHeap),
    ("BufferHeap", VariableType::BufferHeap),
];

impl VariableType {
    /// Classifies a backend type name. Exact match only; unmatched names
    /// yield [`VariableType::Unknown`].
    pub fn from_name(name: &str) -> Self {
        TYPE_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ty)| *ty)
            .unwrap_or(VariableType::Unknown)
    }
}

/// How a binding is accessed by the pipeline, derived from the backend's
/// binding category independently of the resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usage {
    ConstantBuffer,
    ShaderResource,
    UnorderedAccess,
    SamplerState,
    /// Backend category with no entry in the lookup table
    Unknown,
}

const CATEGORY_NAMES: &[(&str, Usage)] = &[
    ("ConstantBuffer", Usage::ConstantBuffer),
    ("ShaderResource", Usage::ShaderResource),
    ("UnorderedAccess", Usage::UnorderedAccess),
    ("SamplerState", Usage::SamplerState),
];

impl Usage {
    /// Classifies a backend binding category name. Exact match only;
    /// unmatched categories yield [`Usage::Unknown`].
    pub fn from_category(category: &str) -> Self {
        CATEGORY_NAMES
            .iter()
            .find(|(n, _)| *n == category)
            .map(|(_, usage)| *usage)
            .unwrap_or(Usage::Unknown)
    }
}

/// One resource binding declared by the shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Declared name, unique within one entry point's reflection
    pub name: String,
    /// Resource kind; for arrays, the kind of the element
    pub ty: VariableType,
    /// Access category
    pub usage: Usage,
    /// Register index
    pub index: u32,
    /// Binding space
    pub space: u32,
    /// Element count for array declarations; 1 for scalar bindings
    pub count: u32,
}

/// Walks a successful compile's reflection and produces the variable table
/// plus the thread-group size of the requested entry point.
///
/// Array declarations are unwrapped: the element count becomes
/// [`Variable::count`] and the element type name is what gets classified.
/// A later parameter with a name already in the table overwrites the
/// earlier entry (last-wins).
///
/// The thread-group size is `[0, 0, 0]` unless a reflected entry point
/// matches the requested name and is a compute stage.
pub(crate) fn extract<R: BackendRequest>(
    request: &R,
    entry: &str,
) -> (HashMap<String, Variable>, [u32; 3]) {
    let mut variables = HashMap::new();

    for index in 0..request.parameter_count() {
        let parameter = request.parameter(index);

        let (type_name, count) = match &parameter.ty.element {
            Some(element) => (element.name.as_str(), parameter.ty.element_count.max(1)),
            None => (parameter.ty.name.as_str(), 1),
        };

        let variable = Variable {
            name: parameter.name.clone(),
            ty: VariableType::from_name(type_name),
            usage: Usage::from_category(&parameter.category),
            index: parameter.binding_index,
            space: parameter.binding_space,
            count,
        };

        if variables.insert(parameter.name.clone(), variable).is_some() {
            warn!("duplicate binding name '{}', keeping the later one", parameter.name);
        }
    }

    let mut thread_group_size = [0u32; 3];
    for index in 0..request.entry_point_count() {
        let entry_point = request.entry_point(index);
        if entry_point.name == entry && entry_point.stage == Stage::Compute {
            thread_group_size = entry_point.thread_group_size;
        }
    }

    (variables, thread_group_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{FakeSession, Script};
    use crate::backend::{BackendSession, EntryPointDesc, ParameterDesc, TypeDesc};
    use pretty_assertions::assert_eq;

    fn parameter(name: &str, category: &str, ty: TypeDesc, index: u32, space: u32) -> ParameterDesc {
        ParameterDesc {
            name: name.to_string(),
            category: category.to_string(),
            ty,
            binding_index: index,
            binding_space: space,
        }
    }

    fn request_with(parameters: Vec<ParameterDesc>, entry_points: Vec<EntryPointDesc>) -> impl BackendRequest {
        let mut script = Script::success();
        script.parameters = parameters;
        script.entry_points = entry_points;
        FakeSession::new(script).create_request().unwrap()
    }

    #[test]
    fn test_every_known_type_name_classifies() {
        for (name, expected) in super::TYPE_NAMES.iter().copied() {
            assert_eq!(VariableType::from_name(name), expected, "type {name}");
        }
    }

    #[test]
    fn test_unknown_type_name_is_not_an_error() {
        assert_eq!(VariableType::from_name("FeedbackTexture2D"), VariableType::Unknown);
        assert_eq!(VariableType::from_name(""), VariableType::Unknown);
        // Exact match only: no prefix or case-insensitive matching.
        assert_eq!(VariableType::from_name("texture2d"), VariableType::Unknown);
        assert_eq!(VariableType::from_name("Texture2DMS"), VariableType::Unknown);
    }

    #[test]
    fn test_every_known_category_classifies() {
        assert_eq!(Usage::from_category("ConstantBuffer"), Usage::ConstantBuffer);
        assert_eq!(Usage::from_category("ShaderResource"), Usage::ShaderResource);
        assert_eq!(Usage::from_category("UnorderedAccess"), Usage::UnorderedAccess);
        assert_eq!(Usage::from_category("SamplerState"), Usage::SamplerState);
        assert_eq!(Usage::from_category("PushConstantBuffer"), Usage::Unknown);
    }

    #[test]
    fn test_scalar_parameter_has_count_one() {
        let request = request_with(
            vec![parameter(
                "gOutput",
                "UnorderedAccess",
                TypeDesc::scalar("RWTexture2D"),
                3,
                0,
            )],
            vec![],
        );
        let (variables, _) = extract(&request, "main");

        let var = &variables["gOutput"];
        assert_eq!(var.ty, VariableType::RWTexture2D);
        assert_eq!(var.usage, Usage::UnorderedAccess);
        assert_eq!(var.index, 3);
        assert_eq!(var.space, 0);
        assert_eq!(var.count, 1);
    }

    #[test]
    fn test_array_parameter_unwraps_element_type() {
        let request = request_with(
            vec![parameter(
                "bufferArray",
                "ShaderResource",
                TypeDesc::array("StructuredBuffer", 4),
                0,
                1,
            )],
            vec![],
        );
        let (variables, _) = extract(&request, "main");

        assert_eq!(
            variables["bufferArray"],
            Variable {
                name: "bufferArray".to_string(),
                ty: VariableType::StructuredBuffer,
                usage: Usage::ShaderResource,
                index: 0,
                space: 1,
                count: 4,
            }
        );
    }

    #[test]
    fn test_array_of_unknown_element_type() {
        let request = request_with(
            vec![parameter(
                "weird",
                "ShaderResource",
                TypeDesc::array("Texture2DMS", 8),
                0,
                0,
            )],
            vec![],
        );
        let (variables, _) = extract(&request, "main");

        assert_eq!(variables["weird"].ty, VariableType::Unknown);
        assert_eq!(variables["weird"].count, 8);
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let request = request_with(
            vec![
                parameter("shared", "ShaderResource", TypeDesc::scalar("Texture2D"), 0, 0),
                parameter("shared", "SamplerState", TypeDesc::scalar("SamplerState"), 2, 0),
            ],
            vec![],
        );
        let (variables, _) = extract(&request, "main");

        assert_eq!(variables.len(), 1);
        assert_eq!(variables["shared"].ty, VariableType::SamplerState);
        assert_eq!(variables["shared"].index, 2);
    }

    #[test]
    fn test_thread_group_size_for_compute_entry() {
        let request = request_with(
            vec![],
            vec![EntryPointDesc {
                name: "main".to_string(),
                stage: Stage::Compute,
                thread_group_size: [8, 8, 1],
            }],
        );
        let (_, tgs) = extract(&request, "main");
        assert_eq!(tgs, [8, 8, 1]);
    }

    #[test]
    fn test_thread_group_size_zero_for_non_compute() {
        let request = request_with(
            vec![],
            vec![EntryPointDesc {
                name: "main".to_string(),
                stage: Stage::Fragment,
                thread_group_size: [0, 0, 0],
            }],
        );
        let (_, tgs) = extract(&request, "main");
        assert_eq!(tgs, [0, 0, 0]);
    }

    #[test]
    fn test_thread_group_size_ignores_other_entry_points() {
        let request = request_with(
            vec![],
            vec![
                EntryPointDesc {
                    name: "blur".to_string(),
                    stage: Stage::Compute,
                    thread_group_size: [16, 16, 1],
                },
                EntryPointDesc {
                    name: "main".to_string(),
                    stage: Stage::Compute,
                    thread_group_size: [4, 2, 1],
                },
            ],
        );
        let (_, tgs) = extract(&request, "main");
        assert_eq!(tgs, [4, 2, 1]);
    }
}
