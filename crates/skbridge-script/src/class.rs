use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Names of the classes every runtime provides
pub mod builtin {
    pub const OBJECT: &str = "Object";
    pub const NONE: &str = "None";
    pub const BOOLEAN: &str = "Boolean";
    pub const INTEGER: &str = "Integer";
    pub const REAL: &str = "Real";
    pub const STRING: &str = "String";
    pub const VECTOR3: &str = "Vector3";
    pub const ROTATION_ANGLES: &str = "RotationAngles";
    pub const TRANSFORM: &str = "Transform";
    /// Base of every class that wraps a host object
    pub const ENTITY: &str = "Entity";
}

/// A script class descriptor
pub struct ScriptClass {
    name: String,
    superclass: Option<Rc<ScriptClass>>,
    routines: RefCell<Vec<Rc<Routine>>>,
}

impl ScriptClass {
    pub fn new(name: impl Into<String>, superclass: Option<Rc<ScriptClass>>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            superclass,
            routines: RefCell::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Rc<ScriptClass>> {
        self.superclass.as_ref()
    }

    /// True if this class is named `name` or derives from a class that is
    pub fn is_class(&self, name: &str) -> bool {
        self.ancestors().any(|class| class.name == name)
    }

    /// This class followed by its superclasses, nearest first
    pub fn ancestors(&self) -> impl Iterator<Item = &ScriptClass> {
        std::iter::successors(Some(self), |class| class.superclass.as_deref())
    }

    /// Attach a routine to this class, replacing one with the same name and scope
    pub fn add_routine(&self, mut routine: Routine) -> Rc<Routine> {
        routine.scope_name = self.name.clone();
        let routine = Rc::new(routine);
        let mut routines = self.routines.borrow_mut();
        routines.retain(|r| !(r.name == routine.name && r.class_member == routine.class_member));
        routines.push(Rc::clone(&routine));
        routine
    }

    /// Routines declared directly on this class
    pub fn routines(&self) -> Vec<Rc<Routine>> {
        self.routines.borrow().clone()
    }

    pub fn find_routine(&self, name: &str, class_member: bool) -> Option<Rc<Routine>> {
        self.routines
            .borrow()
            .iter()
            .find(|r| r.name == name && r.class_member == class_member)
            .cloned()
    }

    /// Look up a routine here or on the nearest superclass declaring it
    pub fn find_routine_inherited(&self, name: &str, class_member: bool) -> Option<Rc<Routine>> {
        self.ancestors().find_map(|class| class.find_routine(name, class_member))
    }
}

impl fmt::Debug for ScriptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptClass")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|c| c.name.clone()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Method,
    /// Runs across several updates
    Coroutine,
    /// Calls out to a host-implemented event
    EventTrigger,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub class: Rc<ScriptClass>,
}

static NEXT_ROUTINE_ID: AtomicU64 = AtomicU64::new(1);

/// A script routine descriptor
pub struct Routine {
    id: u64,
    name: String,
    scope_name: String,
    params: Vec<Parameter>,
    result: Option<Rc<ScriptClass>>,
    kind: RoutineKind,
    class_member: bool,
    blueprint: bool,
    user_data: Cell<Option<u32>>,
}

impl Routine {
    pub fn new(name: impl Into<String>, kind: RoutineKind) -> Self {
        Self {
            id: NEXT_ROUTINE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            scope_name: String::new(),
            params: Vec::new(),
            result: None,
            kind,
            class_member: false,
            blueprint: false,
            user_data: Cell::new(None),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, class: &Rc<ScriptClass>) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            class: Rc::clone(class),
        });
        self
    }

    pub fn returning(mut self, class: &Rc<ScriptClass>) -> Self {
        self.result = Some(Rc::clone(class));
        self
    }

    /// Make this a class-level routine
    pub fn class_member(mut self) -> Self {
        self.class_member = true;
        self
    }

    /// Annotate the routine for exposure to the host
    pub fn blueprint(mut self) -> Self {
        self.blueprint = true;
        self
    }

    /// Unique for the lifetime of the process
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the class the routine is declared on
    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn result(&self) -> Option<&Rc<ScriptClass>> {
        self.result.as_ref()
    }

    pub fn kind(&self) -> RoutineKind {
        self.kind
    }

    pub fn is_class_member(&self) -> bool {
        self.class_member
    }

    pub fn is_blueprint(&self) -> bool {
        self.blueprint
    }

    /// Registry index stamped on the routine by the bridge
    pub fn binding_index(&self) -> Option<u32> {
        self.user_data.get()
    }

    pub fn set_binding_index(&self, index: u32) {
        self.user_data.set(Some(index));
    }

    pub fn clear_binding_index(&self) {
        self.user_data.set(None);
    }

    /// `Class@name` or `Class@@name` for class members
    pub fn qualified_name(&self) -> String {
        let separator = if self.class_member { "@@" } else { "@" };
        format!("{}{}{}", self.scope_name, separator, self.name)
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("name", &self.qualified_name())
            .field("kind", &self.kind)
            .field(
                "params",
                &self
                    .params
                    .iter()
                    .map(|p| format!("{}: {}", p.name, p.class.name()))
                    .collect::<Vec<_>>(),
            )
            .field("result", &self.result.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_routine_sets_scope_and_replaces() {
        let integer = ScriptClass::new(builtin::INTEGER, None);
        let class = ScriptClass::new("Calculator", None);

        let first = class.add_routine(Routine::new("add", RoutineKind::Method).class_member());
        assert_eq!(first.scope_name(), "Calculator");
        assert_eq!(first.qualified_name(), "Calculator@@add");

        let second = class.add_routine(
            Routine::new("add", RoutineKind::Method)
                .class_member()
                .with_param("a", &integer),
        );
        assert_eq!(class.routines().len(), 1);
        assert_ne!(first.id(), second.id());
        assert!(class.find_routine("add", false).is_none());
        assert!(class.find_routine("add", true).is_some());
    }

    #[test]
    fn test_inherited_lookup() {
        let entity = ScriptClass::new(builtin::ENTITY, None);
        let actor = ScriptClass::new("Actor", Some(Rc::clone(&entity)));
        entity.add_routine(Routine::new("on_hit", RoutineKind::EventTrigger));

        assert!(actor.is_class(builtin::ENTITY));
        assert!(!entity.is_class("Actor"));
        assert!(actor.find_routine_inherited("on_hit", false).is_some());
    }
}
