use std::rc::Rc;

use skbridge_reflect::{FunctionBuilder, FunctionFlags, HostClass, HostFunction, PropertyFlags};
use skbridge_script::{Routine, ScriptClass};
use tracing::debug;

use crate::binding::{BindingKind, InvokeKind, TypedName};
use crate::dispatch;
use crate::error::BindError;
use crate::marshal::ValueKind;
use crate::types::TypeBindings;

/// Layout and converter of one generated property
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub offset: u32,
    pub kind: ValueKind,
    pub typed_name: TypedName,
}

/// A generated host function, not yet attached to its class
#[derive(Debug)]
pub struct BuiltFunction {
    pub function: Rc<HostFunction>,
    pub params: Vec<ParamInfo>,
    pub result: Option<ParamInfo>,
}

/// Generate the host function that stands in for `routine` on `host_class`
///
/// Function bindings get a native entry point that calls the routine. Event
/// bindings get an unimplemented stub for host classes to override. Any
/// parameter without a host representation rejects the whole routine.
pub fn build_function(
    types: &TypeBindings,
    host_class: &Rc<HostClass>,
    routine: &Routine,
    binding_kind: BindingKind,
    is_final: bool,
) -> Result<BuiltFunction, BindError> {
    let mut builder = FunctionBuilder::new(host_class, routine.name());
    let mut params = Vec::with_capacity(routine.params().len());
    let mut result = None;

    match binding_kind {
        BindingKind::Function => {
            let invoke_kind = InvokeKind::of(routine);
            builder.add_flags(FunctionFlags::NATIVE | FunctionFlags::BLUEPRINT_CALLABLE | FunctionFlags::PUBLIC);
            if routine.is_class_member() {
                builder.add_flags(FunctionFlags::STATIC);
            }
            builder.set_native(dispatch::native_for(invoke_kind));

            // Coroutines report their outcome later, never through the frame
            if invoke_kind != InvokeKind::Coroutine {
                if let Some(class) = routine.result() {
                    let (kind, value_kind) =
                        types.layout(class).ok_or_else(|| BindError::UnsupportedResult {
                            routine: routine.qualified_name(),
                            type_name: class.name().to_string(),
                        })?;
                    builder.add_flags(FunctionFlags::HAS_OUT_PARMS);
                    result = Some((kind.size(), value_kind, Rc::clone(class)));
                    builder.set_result(kind);
                }
            }
        }
        BindingKind::Event => {
            if routine.is_class_member() {
                return Err(BindError::ClassLevelEvent {
                    routine: routine.qualified_name(),
                });
            }
            if routine.result().is_some() {
                return Err(BindError::EventWithResult {
                    routine: routine.qualified_name(),
                });
            }
            builder.add_flags(FunctionFlags::EVENT | FunctionFlags::BLUEPRINT_EVENT | FunctionFlags::PUBLIC);
            builder.mark_event_stub();
        }
    }

    if is_final {
        builder.add_flags(FunctionFlags::FINAL);
    }

    for param in routine.params() {
        params.push(build_param(types, &mut builder, routine, &param.name, &param.class)?);
    }

    let function = builder.link();

    for (info, property) in params.iter_mut().zip(function.params()) {
        info.offset = property.offset();
    }

    let result = match (result, function.return_property()) {
        (Some((byte_size, kind, class)), Some(property)) => Some(ParamInfo {
            offset: property.offset(),
            kind,
            typed_name: TypedName::new(property.name(), byte_size, class),
        }),
        _ => None,
    };

    debug!(
        target: "bridge",
        "Built {:?} {}.{} ({} params, {} bytes)",
        binding_kind,
        host_class.name(),
        function.name(),
        params.len(),
        function.parms_size()
    );

    Ok(BuiltFunction {
        function,
        params,
        result,
    })
}

/// Add one routine parameter to the function being built
pub fn build_param(
    types: &TypeBindings,
    builder: &mut FunctionBuilder,
    routine: &Routine,
    name: &str,
    class: &Rc<ScriptClass>,
) -> Result<ParamInfo, BindError> {
    let (kind, value_kind) = types.layout(class).ok_or_else(|| BindError::UnsupportedParam {
        routine: routine.qualified_name(),
        param: name.to_string(),
        type_name: class.name().to_string(),
    })?;

    let mut flags = PropertyFlags::BLUEPRINT_VISIBLE;
    if value_kind == ValueKind::StructRef {
        flags |= PropertyFlags::REFERENCE_PARM;
    }

    let byte_size = kind.size();
    builder.add_param(name, kind, flags);

    Ok(ParamInfo {
        offset: 0,
        kind: value_kind,
        typed_name: TypedName::new(name, byte_size, Rc::clone(class)),
    })
}
