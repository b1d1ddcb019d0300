use std::any::Any;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::class::{HostClass, HostFunction};
use crate::frame::Frame;
use crate::handle::ObjectHandle;
use crate::object::{HostObject, ObjectTable};
use crate::params::ParamBuffer;
use crate::property::HostStruct;

/// State a native entry point runs against
///
/// Natives receive it as a trait object and downcast to the concrete type
/// they were registered by.
pub trait NativeContext: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl NativeContext for () {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The host reflection system: classes, structs and live objects
pub struct Universe {
    root: Rc<HostClass>,
    classes: Vec<Rc<HostClass>>,
    structs: Vec<Rc<HostStruct>>,
    objects: ObjectTable,
    vector: Rc<HostStruct>,
    rotator: Rc<HostStruct>,
    transform: Rc<HostStruct>,
}

impl Universe {
    pub fn new() -> Self {
        let root = HostClass::new("Object", None);
        let vector = HostStruct::new("Vector", 12);
        let rotator = HostStruct::new("Rotator", 12);
        let transform = HostStruct::new("Transform", 40);

        Self {
            classes: vec![Rc::clone(&root)],
            structs: vec![Rc::clone(&vector), Rc::clone(&rotator), Rc::clone(&transform)],
            root,
            objects: ObjectTable::new(),
            vector,
            rotator,
            transform,
        }
    }

    /// The class every other class derives from
    pub fn root_class(&self) -> &Rc<HostClass> {
        &self.root
    }

    /// Register a class. A class with the same name is replaced.
    pub fn add_class(&mut self, name: &str, super_class: Option<&Rc<HostClass>>) -> Rc<HostClass> {
        let super_class = super_class.cloned().unwrap_or_else(|| Rc::clone(&self.root));
        let class = HostClass::new(name, Some(super_class));
        self.classes.retain(|existing| existing.name() != name);
        self.classes.push(Rc::clone(&class));
        debug!(target: "reflect", "Registered class {}", name);
        class
    }

    pub fn find_class(&self, name: &str) -> Option<Rc<HostClass>> {
        self.classes.iter().find(|c| c.name() == name).cloned()
    }

    /// Unload a class. Weak references to it go stale once the last live
    /// object of the class is destroyed.
    pub fn remove_class(&mut self, name: &str) -> Option<Rc<HostClass>> {
        let position = self.classes.iter().position(|c| c.name() == name)?;
        Some(self.classes.remove(position))
    }

    pub fn classes(&self) -> &[Rc<HostClass>] {
        &self.classes
    }

    pub fn add_struct(&mut self, name: &str, size: u32) -> Rc<HostStruct> {
        let host_struct = HostStruct::new(name, size);
        self.structs.retain(|existing| existing.name() != name);
        self.structs.push(Rc::clone(&host_struct));
        host_struct
    }

    pub fn find_struct(&self, name: &str) -> Option<Rc<HostStruct>> {
        self.structs.iter().find(|s| s.name() == name).cloned()
    }

    pub fn vector_struct(&self) -> &Rc<HostStruct> {
        &self.vector
    }

    pub fn rotator_struct(&self) -> &Rc<HostStruct> {
        &self.rotator
    }

    pub fn transform_struct(&self) -> &Rc<HostStruct> {
        &self.transform
    }

    pub fn spawn(&mut self, name: impl Into<String>, class: &Rc<HostClass>) -> ObjectHandle {
        self.objects.spawn(name, Rc::clone(class))
    }

    pub fn destroy(&mut self, handle: ObjectHandle) -> bool {
        self.objects.destroy(handle)
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&HostObject> {
        self.objects.get(handle)
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    /// Invoke `function` on `target` with a prepared argument buffer
    ///
    /// Returns false without calling anything when the function has no
    /// native entry point or the buffer is too small for its parameters.
    pub fn process_event(
        &self,
        ctx: &mut dyn NativeContext,
        function: &HostFunction,
        target: ObjectHandle,
        params: &mut ParamBuffer,
    ) -> bool {
        let Some(native) = function.native().cloned() else {
            debug!(target: "reflect", "{} has no implementation", function.name());
            return false;
        };

        if params.len() < function.parms_size() {
            warn!(
                target: "reflect",
                "Refusing to call {}: buffer is {} bytes, needs {}",
                function.name(),
                params.len(),
                function.parms_size()
            );
            return false;
        }

        let mut frame = Frame::new(self, function, target, params);
        native(ctx, &mut frame);
        true
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{FunctionBuilder, NativeFn};
    use crate::flags::PropertyFlags;
    use crate::property::PropertyKind;
    use std::cell::Cell;

    #[test]
    fn test_process_event_runs_native() {
        let mut universe = Universe::new();
        let class = universe.add_class("Actor", None);
        let seen = Rc::new(Cell::new(0));

        let mut builder = FunctionBuilder::new(&class, "SetHealth");
        builder.add_param("health", PropertyKind::Int, PropertyFlags::empty());
        let recorded = Rc::clone(&seen);
        let native: NativeFn = Rc::new(move |_ctx, frame| {
            recorded.set(frame.read_i32().unwrap_or(-1));
        });
        builder.set_native(native);
        let function = builder.link();

        let actor = universe.spawn("hero", &class);
        let mut params = ParamBuffer::for_function(&function);
        params.write_i32(0, 75);

        assert!(universe.process_event(&mut (), &function, actor, &mut params));
        assert_eq!(seen.get(), 75);
    }

    #[test]
    fn test_process_event_without_native_is_refused() {
        let mut universe = Universe::new();
        let class = universe.add_class("Actor", None);
        let function = FunctionBuilder::new(&class, "OnHit").link();
        let mut params = ParamBuffer::for_function(&function);

        assert!(!universe.process_event(&mut (), &function, ObjectHandle::NULL, &mut params));
    }

    #[test]
    fn test_remove_class_makes_weak_refs_stale() {
        let mut universe = Universe::new();
        let class = universe.add_class("Temporary", None);
        let weak = crate::WeakRef::new(&class);
        drop(class);

        assert!(universe.find_class("Temporary").is_some());
        universe.remove_class("Temporary");
        assert!(weak.is_stale());
        assert!(universe.root_class().name() == "Object");
    }
}
