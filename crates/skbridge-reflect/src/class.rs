use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::flags::{FunctionFlags, PropertyFlags};
use crate::frame::Frame;
use crate::handle::WeakRef;
use crate::property::{Property, PropertyKind};
use crate::universe::NativeContext;

/// Native entry point of a host function
pub type NativeFn = Rc<dyn Fn(&mut dyn NativeContext, &mut Frame<'_>)>;

/// A reflected host class
pub struct HostClass {
    name: String,
    super_class: Option<Rc<HostClass>>,
    functions: RefCell<Vec<Rc<HostFunction>>>,
}

impl HostClass {
    pub fn new(name: impl Into<String>, super_class: Option<Rc<HostClass>>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            super_class,
            functions: RefCell::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn super_class(&self) -> Option<&Rc<HostClass>> {
        self.super_class.as_ref()
    }

    /// True if this class is `other` or derives from it
    pub fn is_child_of(&self, other: &HostClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if std::ptr::eq(class, other) {
                return true;
            }
            current = class.super_class.as_deref();
        }
        false
    }

    /// Attach a function, replacing any existing function of the same name
    pub fn add_function(&self, function: Rc<HostFunction>) {
        let mut functions = self.functions.borrow_mut();
        functions.retain(|existing| existing.name() != function.name());
        functions.push(function);
    }

    /// Detach exactly this function object. Returns false if it was not attached.
    pub fn remove_function(&self, function: &HostFunction) -> bool {
        let mut functions = self.functions.borrow_mut();
        let before = functions.len();
        functions.retain(|existing| !std::ptr::eq(existing.as_ref(), function));
        functions.len() != before
    }

    /// Look up a function declared directly on this class
    pub fn find_function_local(&self, name: &str) -> Option<Rc<HostFunction>> {
        self.functions
            .borrow()
            .iter()
            .find(|function| function.name() == name)
            .cloned()
    }

    /// Look up a function on this class or the nearest ancestor declaring it
    pub fn find_function(&self, name: &str) -> Option<Rc<HostFunction>> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(function) = class.find_function_local(name) {
                return Some(function);
            }
            current = class.super_class.as_deref();
        }
        None
    }

    pub fn functions(&self) -> Vec<Rc<HostFunction>> {
        self.functions.borrow().clone()
    }

    /// Implement an inherited event on this class
    ///
    /// The new function copies the event's parameter layout so argument
    /// buffers built for the event can be handed to it unchanged.
    pub fn implement_event(self: &Rc<Self>, event: &HostFunction, native: NativeFn) -> Rc<HostFunction> {
        let function = Rc::new(HostFunction {
            name: event.name.clone(),
            outer: WeakRef::new(self),
            flags: event.flags | FunctionFlags::NATIVE,
            properties: event.properties.clone(),
            num_params: event.num_params,
            parms_size: event.parms_size,
            return_offset: event.return_offset,
            native: Some(native),
            event_stub: false,
            binding_index: Cell::new(None),
        });

        debug!(
            target: "reflect",
            "{}.{} implemented as override of {}",
            self.name,
            function.name,
            event.outer.get().map(|c| c.name.clone()).unwrap_or_default()
        );

        self.add_function(Rc::clone(&function));
        function
    }
}

impl fmt::Debug for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostClass")
            .field("name", &self.name)
            .field("super_class", &self.super_class.as_ref().map(|c| c.name.clone()))
            .field("functions", &self.functions.borrow().len())
            .finish()
    }
}

/// A reflected host function
///
/// Properties are stored in declaration order with the return property, if
/// any, last.
pub struct HostFunction {
    name: String,
    outer: WeakRef<HostClass>,
    flags: FunctionFlags,
    properties: Vec<Property>,
    num_params: usize,
    parms_size: u32,
    return_offset: Option<u32>,
    native: Option<NativeFn>,
    event_stub: bool,
    binding_index: Cell<Option<u32>>,
}

impl HostFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outer(&self) -> &WeakRef<HostClass> {
        &self.outer
    }

    pub fn flags(&self) -> FunctionFlags {
        self.flags
    }

    pub fn has_flags(&self, flags: FunctionFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Parameter properties, excluding the return value
    pub fn params(&self) -> &[Property] {
        &self.properties[..self.num_params]
    }

    pub fn num_params(&self) -> usize {
        self.num_params
    }

    pub fn return_property(&self) -> Option<&Property> {
        self.properties.get(self.num_params)
    }

    pub fn find_param(&self, name: &str) -> Option<&Property> {
        self.params().iter().find(|p| p.name() == name)
    }

    /// Size of the parameter buffer a call needs
    pub fn parms_size(&self) -> u32 {
        self.parms_size
    }

    pub fn return_offset(&self) -> Option<u32> {
        self.return_offset
    }

    pub fn native(&self) -> Option<&NativeFn> {
        self.native.as_ref()
    }

    pub fn has_implementation(&self) -> bool {
        self.native.is_some()
    }

    /// Event declared by the script side for the host to implement
    pub fn is_event_stub(&self) -> bool {
        self.event_stub
    }

    pub fn binding_index(&self) -> Option<u32> {
        self.binding_index.get()
    }

    pub fn set_binding_index(&self, index: u32) {
        self.binding_index.set(Some(index));
    }

    pub fn clear_binding_index(&self) {
        self.binding_index.set(None);
    }

    /// True when both functions take the same arguments at the same offsets
    pub fn same_layout(&self, other: &HostFunction) -> bool {
        self.num_params == other.num_params
            && self.parms_size == other.parms_size
            && self
                .params()
                .iter()
                .zip(other.params())
                .all(|(a, b)| a.offset() == b.offset() && a.kind().same_storage(b.kind()))
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("properties", &self.properties)
            .field("parms_size", &self.parms_size)
            .field("event_stub", &self.event_stub)
            .field("binding_index", &self.binding_index.get())
            .finish()
    }
}

/// Builds a [`HostFunction`] and computes its parameter layout
pub struct FunctionBuilder {
    name: String,
    outer: WeakRef<HostClass>,
    flags: FunctionFlags,
    params: Vec<(String, PropertyKind, PropertyFlags)>,
    result: Option<PropertyKind>,
    native: Option<NativeFn>,
    event_stub: bool,
}

impl FunctionBuilder {
    pub fn new(outer: &Rc<HostClass>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outer: WeakRef::new(outer),
            flags: FunctionFlags::empty(),
            params: Vec::new(),
            result: None,
            native: None,
            event_stub: false,
        }
    }

    /// Append a parameter and return its position
    pub fn add_param(&mut self, name: impl Into<String>, kind: PropertyKind, flags: PropertyFlags) -> usize {
        self.params.push((name.into(), kind, flags | PropertyFlags::PARM));
        self.params.len() - 1
    }

    pub fn set_result(&mut self, kind: PropertyKind) {
        self.result = Some(kind);
    }

    pub fn add_flags(&mut self, flags: FunctionFlags) {
        self.flags |= flags;
    }

    pub fn set_native(&mut self, native: NativeFn) {
        self.native = Some(native);
    }

    pub fn mark_event_stub(&mut self) {
        self.event_stub = true;
    }

    /// Lay out the parameters and produce the function
    ///
    /// The function is not attached to its class; callers do that with
    /// [`HostClass::add_function`] once they are done with it.
    pub fn link(self) -> Rc<HostFunction> {
        let mut offset = 0u32;
        let mut properties = Vec::with_capacity(self.params.len() + 1);

        for (name, kind, flags) in self.params {
            offset = align_up(offset, kind.alignment());
            let size = kind.size();
            properties.push(Property::new(name, kind, offset, flags));
            offset += size;
        }

        let num_params = properties.len();
        let mut return_offset = None;

        if let Some(kind) = self.result {
            offset = align_up(offset, kind.alignment());
            let size = kind.size();
            return_offset = Some(offset);
            properties.push(Property::new(
                "ReturnValue".to_string(),
                kind,
                offset,
                PropertyFlags::PARM | PropertyFlags::OUT_PARM | PropertyFlags::RETURN_PARM,
            ));
            offset += size;
        }

        Rc::new(HostFunction {
            name: self.name,
            outer: self.outer,
            flags: self.flags,
            properties,
            num_params,
            parms_size: align_up(offset, 4),
            return_offset,
            native: self.native,
            event_stub: self.event_stub,
            binding_index: Cell::new(None),
        })
    }
}

fn align_up(offset: u32, alignment: u32) -> u32 {
    offset.div_ceil(alignment) * alignment
}
