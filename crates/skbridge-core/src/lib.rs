/// Binding synthesis and marshalling
///
/// Exposes script routines as host functions and host events as script
/// routines. [`BlueprintInterface`] owns the binding registry and is the
/// entry point for re-synchronization, reloads and classification queries.
pub mod binding;
pub mod config;
pub mod coroutine;
pub mod dispatch;
pub mod error;
pub mod interface;
pub mod marshal;
pub mod registry;
pub mod signature;
pub mod synth;
pub mod types;

pub use binding::{BindingEntry, BindingKind, InvokeKind, TypedName};
pub use config::BridgeConfig;
pub use coroutine::{CoroutineCompletion, CoroutineTracker};
pub use dispatch::{exec_class_method, exec_coroutine, exec_instance_method, EventDispatch};
pub use error::{BindError, BridgeError};
pub use interface::{BlueprintInterface, ExposeHook};
pub use marshal::{Converter, ValueKind};
pub use registry::BindingRegistry;
pub use signature::have_identical_signatures;
pub use synth::{build_function, build_param, BuiltFunction, ParamInfo};
pub use types::TypeBindings;
