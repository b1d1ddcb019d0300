use std::cell::RefCell;
use std::rc::Rc;

use skbridge_reflect::{HostClass, HostFunction, WeakRef};
use skbridge_script::{Routine, RoutineKind, ScriptClass};

use crate::marshal::ValueKind;
use crate::signature::{have_identical_signatures, typed_name_matches};
use crate::types::TypeBindings;

/// One value slot in host storage terms
#[derive(Debug, Clone)]
pub struct TypedName {
    pub name: String,
    pub byte_size: u32,
    pub script_type: Rc<ScriptClass>,
}

impl TypedName {
    pub fn new(name: impl Into<String>, byte_size: u32, script_type: Rc<ScriptClass>) -> Self {
        Self {
            name: name.into(),
            byte_size,
            script_type,
        }
    }
}

impl AsRef<TypedName> for TypedName {
    fn as_ref(&self) -> &TypedName {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Host calls into script
    Function,
    /// Script calls into host
    Event,
}

impl BindingKind {
    pub fn of(routine: &Routine) -> Self {
        match routine.kind() {
            RoutineKind::EventTrigger => BindingKind::Event,
            RoutineKind::Method | RoutineKind::Coroutine => BindingKind::Function,
        }
    }
}

/// How a function binding enters the script runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    ClassMethod,
    InstanceMethod,
    Coroutine,
}

impl InvokeKind {
    pub fn of(routine: &Routine) -> Self {
        match (routine.kind(), routine.is_class_member()) {
            (RoutineKind::Coroutine, _) => InvokeKind::Coroutine,
            (_, true) => InvokeKind::ClassMethod,
            (_, false) => InvokeKind::InstanceMethod,
        }
    }
}

/// Parameter of a function binding, fetched off the host frame
#[derive(Debug, Clone)]
pub struct SkParam {
    pub typed_name: TypedName,
    pub kind: ValueKind,
}

impl AsRef<TypedName> for SkParam {
    fn as_ref(&self) -> &TypedName {
        &self.typed_name
    }
}

/// Parameter of an event binding, written at `offset` of the argument buffer
#[derive(Debug, Clone)]
pub struct K2Param {
    pub typed_name: TypedName,
    pub kind: ValueKind,
    pub offset: u32,
}

impl AsRef<TypedName> for K2Param {
    fn as_ref(&self) -> &TypedName {
        &self.typed_name
    }
}

#[derive(Debug, Clone)]
pub struct ResultSlot {
    pub typed_name: TypedName,
    pub kind: ValueKind,
}

#[derive(Debug)]
pub struct FunctionBinding {
    pub invoke_kind: InvokeKind,
    pub result: Option<ResultSlot>,
    pub params: Vec<SkParam>,
}

#[derive(Debug)]
pub struct EventBinding {
    /// Concrete function last resolved for a receiver class
    pub(crate) function_to_invoke: RefCell<Option<(WeakRef<HostClass>, WeakRef<HostFunction>)>>,
    pub params: Vec<K2Param>,
}

impl EventBinding {
    pub fn new(params: Vec<K2Param>) -> Self {
        Self {
            function_to_invoke: RefCell::new(None),
            params,
        }
    }

    /// Find the implementation of `stub` that instances of `class` run
    ///
    /// The answer is cached until the cached function is unloaded or a
    /// receiver of another class comes along. Unimplemented stubs are never
    /// cached so a later override is picked up.
    pub fn resolve(&self, class: &Rc<HostClass>, stub: &HostFunction) -> Option<Rc<HostFunction>> {
        let mut cache = self.function_to_invoke.borrow_mut();

        if let Some((cached_class, cached_function)) = cache.as_ref() {
            if cached_class.is(class) {
                if let Some(function) = cached_function.get() {
                    return Some(function);
                }
            }
        }

        let function = class.find_function(stub.name())?;
        if function.has_implementation() {
            *cache = Some((WeakRef::new(class), WeakRef::new(&function)));
        } else {
            *cache = None;
        }
        Some(function)
    }

    pub fn reset(&self) {
        self.function_to_invoke.borrow_mut().take();
    }
}

#[derive(Debug)]
pub enum BindingDetail {
    Function(FunctionBinding),
    Event(EventBinding),
}

/// Registry record linking one routine to one generated host function
#[derive(Debug)]
pub struct BindingEntry {
    pub routine_name: String,
    pub class_name: String,
    pub routine: Option<Rc<Routine>>,
    pub host_class: WeakRef<HostClass>,
    pub host_function: WeakRef<HostFunction>,
    pub num_params: u16,
    pub is_class_member: bool,
    pub marked_for_delete: bool,
    pub detail: BindingDetail,
}

impl BindingEntry {
    pub fn kind(&self) -> BindingKind {
        match self.detail {
            BindingDetail::Function(_) => BindingKind::Function,
            BindingDetail::Event(_) => BindingKind::Event,
        }
    }

    /// The host class or generated function has been unloaded
    pub fn is_dead(&self) -> bool {
        self.host_class.is_stale() || self.host_function.is_stale()
    }

    /// True if this entry is keyed on the same routine identity
    pub fn is_for(&self, routine: &Routine) -> bool {
        self.class_name == routine.scope_name()
            && self.routine_name == routine.name()
            && self.is_class_member == routine.is_class_member()
            && self.kind() == BindingKind::of(routine)
    }

    /// True if the generated host function can keep serving `routine`
    pub fn accepts(&self, routine: &Routine, types: &TypeBindings) -> bool {
        if !self.is_for(routine) || !self.host_layout_matches(routine, types) {
            return false;
        }

        match &self.detail {
            BindingDetail::Function(binding) => {
                let invoke_kind = InvokeKind::of(routine);
                if binding.invoke_kind != invoke_kind
                    || !have_identical_signatures(routine.params(), &binding.params, types)
                {
                    return false;
                }

                let expected_result = match invoke_kind {
                    InvokeKind::Coroutine => None,
                    _ => routine.result(),
                };
                match (&binding.result, expected_result) {
                    (None, None) => true,
                    (Some(slot), Some(class)) => typed_name_matches(&slot.typed_name, &slot.typed_name.name, class, types),
                    _ => false,
                }
            }
            BindingDetail::Event(binding) => have_identical_signatures(routine.params(), &binding.params, types),
        }
    }

    /// Parameter storage of the host function still matches what the
    /// routine's parameter classes resolve to now
    fn host_layout_matches(&self, routine: &Routine, types: &TypeBindings) -> bool {
        let Some(function) = self.host_function.get() else {
            return false;
        };
        if function.num_params() != routine.params().len() {
            return false;
        }

        function.params().iter().zip(routine.params()).all(|(property, param)| {
            types
                .layout(&param.class)
                .is_some_and(|(kind, _)| kind.same_storage(property.kind()))
        })
    }

    pub fn function_binding(&self) -> Option<&FunctionBinding> {
        match &self.detail {
            BindingDetail::Function(binding) => Some(binding),
            BindingDetail::Event(_) => None,
        }
    }

    pub fn event_binding(&self) -> Option<&EventBinding> {
        match &self.detail {
            BindingDetail::Event(binding) => Some(binding),
            BindingDetail::Function(_) => None,
        }
    }
}
