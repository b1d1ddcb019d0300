/// Host reflection model
///
/// This crate is the host side of the bridge: classes with single inheritance,
/// functions with typed parameter properties, an object table with weak
/// handles, parameter buffers and the call frame natives read their arguments
/// from. The binding engine in skbridge-core only talks to the host through
/// these types.
pub mod class;
pub mod flags;
pub mod frame;
pub mod handle;
pub mod object;
pub mod params;
pub mod property;
pub mod universe;

pub use class::{FunctionBuilder, HostClass, HostFunction, NativeFn};
pub use flags::{FunctionFlags, PropertyFlags};
pub use frame::{Frame, FrameError};
pub use handle::{ObjectHandle, WeakRef};
pub use object::{HostObject, ObjectTable};
pub use params::{ParamBuffer, ValueSlot};
pub use property::{HostStruct, Property, PropertyKind};
pub use universe::{NativeContext, Universe};
