/// Script runtime interface
///
/// The bridge treats a script routine as an opaque invokable with a typed
/// parameter list. This crate defines that narrow surface ([`ScriptRuntime`],
/// [`Routine`], [`ScriptValue`]) and ships [`MemoryRuntime`], a runtime whose
/// routine bodies are Rust closures.
pub mod class;
pub mod coroutine;
pub mod memory;
pub mod runtime;
pub mod value;

pub use class::{builtin, Parameter, Routine, RoutineKind, ScriptClass};
pub use coroutine::{Completion, CoroutineOutcome};
pub use memory::{CallScope, CoroutineStep, MemoryRuntime};
pub use runtime::{EventSink, NullEventSink, Receiver, ScriptError, ScriptRuntime};
pub use value::{
    RotationAngles, ScriptValue, StructData, StructValue, Transform, Vector3, INLINE_STRUCT_CAPACITY,
};
