use std::collections::HashMap;
use std::rc::Rc;

use skbridge_reflect::{HostClass, HostStruct, PropertyKind, Universe, WeakRef};
use skbridge_script::{builtin, ScriptClass};
use tracing::debug;

use crate::marshal::ValueKind;

/// Which host type stands behind each script class
///
/// Built-in value classes map to fixed host storage. Entity classes map to a
/// bound host class, or the nearest bound ancestor. Struct classes map to a
/// host struct and are passed by value when they fit the inline capacity.
pub struct TypeBindings {
    classes: HashMap<String, WeakRef<HostClass>>,
    structs: HashMap<String, Rc<HostStruct>>,
    vector: Rc<HostStruct>,
    rotator: Rc<HostStruct>,
    transform: Rc<HostStruct>,
    inline_capacity: u32,
}

impl TypeBindings {
    pub fn new(universe: &Universe, inline_capacity: u32) -> Self {
        let mut classes = HashMap::new();
        classes.insert(builtin::ENTITY.to_string(), WeakRef::new(universe.root_class()));

        Self {
            classes,
            structs: HashMap::new(),
            vector: Rc::clone(universe.vector_struct()),
            rotator: Rc::clone(universe.rotator_struct()),
            transform: Rc::clone(universe.transform_struct()),
            inline_capacity,
        }
    }

    pub fn bind_class(&mut self, script_class: &str, host_class: &Rc<HostClass>) {
        debug!(target: "bridge", "Binding script class {} to host class {}", script_class, host_class.name());
        self.classes.insert(script_class.to_string(), WeakRef::new(host_class));
    }

    pub fn bind_struct(&mut self, script_class: &str, host_struct: &Rc<HostStruct>) {
        debug!(target: "bridge", "Binding script class {} to host struct {}", script_class, host_struct.name());
        self.structs.insert(script_class.to_string(), Rc::clone(host_struct));
    }

    pub fn unbind(&mut self, script_class: &str) {
        self.classes.remove(script_class);
        self.structs.remove(script_class);
    }

    /// Bind every script class to the host class or struct of the same name
    ///
    /// Returns how many new bindings were made.
    pub fn bind_by_name(&mut self, universe: &Universe, classes: &[Rc<ScriptClass>]) -> usize {
        let mut bound = 0;
        for class in classes {
            let name = class.name();
            if self.classes.contains_key(name) || self.structs.contains_key(name) {
                continue;
            }

            if let Some(host_class) = universe.find_class(name) {
                self.bind_class(name, &host_class);
                bound += 1;
            } else if let Some(host_struct) = universe.find_struct(name) {
                self.bind_struct(name, &host_struct);
                bound += 1;
            }
        }
        bound
    }

    /// Host class bound to exactly this script class
    pub fn host_class(&self, script_class: &str) -> Option<Rc<HostClass>> {
        self.classes.get(script_class)?.get()
    }

    /// Host class bound to this script class or its nearest bound ancestor
    pub fn nearest_host_class(&self, script_class: &ScriptClass) -> Option<Rc<HostClass>> {
        script_class.ancestors().find_map(|class| self.host_class(class.name()))
    }

    pub fn host_struct(&self, script_class: &str) -> Option<&Rc<HostStruct>> {
        self.structs.get(script_class)
    }

    /// Drop class bindings whose host class has been unloaded
    pub fn prune_stale(&mut self) -> usize {
        let before = self.classes.len();
        self.classes.retain(|_, class| !class.is_stale());
        before - self.classes.len()
    }

    /// Host storage and converter for values of `script_class`, or `None`
    /// when the class has no host representation
    pub fn layout(&self, script_class: &ScriptClass) -> Option<(PropertyKind, ValueKind)> {
        let layout = match script_class.name() {
            builtin::BOOLEAN => (PropertyKind::Bool, ValueKind::Boolean),
            builtin::INTEGER => (PropertyKind::Int, ValueKind::Integer),
            builtin::REAL => (PropertyKind::Float, ValueKind::Real),
            builtin::STRING => (PropertyKind::Str, ValueKind::String),
            builtin::VECTOR3 => (PropertyKind::Struct(Rc::clone(&self.vector)), ValueKind::Vector3),
            builtin::ROTATION_ANGLES => (
                PropertyKind::Struct(Rc::clone(&self.rotator)),
                ValueKind::RotationAngles,
            ),
            builtin::TRANSFORM => (
                PropertyKind::Struct(Rc::clone(&self.transform)),
                ValueKind::Transform,
            ),
            name => {
                if let Some(host_struct) = self.structs.get(name) {
                    let kind = if host_struct.size() <= self.inline_capacity {
                        ValueKind::StructVal
                    } else {
                        ValueKind::StructRef
                    };
                    (PropertyKind::Struct(Rc::clone(host_struct)), kind)
                } else if script_class.is_class(builtin::ENTITY) {
                    let host_class = self.nearest_host_class(script_class)?;
                    (PropertyKind::Object(WeakRef::new(&host_class)), ValueKind::Entity)
                } else {
                    return None;
                }
            }
        };
        Some(layout)
    }
}
