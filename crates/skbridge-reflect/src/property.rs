use std::rc::Rc;

use crate::class::HostClass;
use crate::flags::PropertyFlags;
use crate::handle::{ObjectHandle, WeakRef};

/// Native layout of a host struct
#[derive(Debug)]
pub struct HostStruct {
    name: String,
    size: u32,
}

impl HostStruct {
    pub fn new(name: impl Into<String>, size: u32) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// Native storage type of a property
#[derive(Debug, Clone)]
pub enum PropertyKind {
    Bool,
    Int,
    Float,
    /// Index into the parameter buffer's string table
    Str,
    Struct(Rc<HostStruct>),
    /// Object reference, constrained to instances of the given class
    Object(WeakRef<HostClass>),
}

impl PropertyKind {
    /// Bytes the property occupies in a parameter buffer
    pub fn size(&self) -> u32 {
        match self {
            PropertyKind::Bool => 1,
            PropertyKind::Int | PropertyKind::Float | PropertyKind::Str => 4,
            PropertyKind::Struct(host_struct) => host_struct.size(),
            PropertyKind::Object(_) => ObjectHandle::SIZE,
        }
    }

    pub fn alignment(&self) -> u32 {
        match self {
            PropertyKind::Bool => 1,
            _ => 4,
        }
    }

    /// Short name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyKind::Bool => "bool",
            PropertyKind::Int => "int",
            PropertyKind::Float => "float",
            PropertyKind::Str => "string",
            PropertyKind::Struct(_) => "struct",
            PropertyKind::Object(_) => "object",
        }
    }

    /// True when both kinds store values the same way
    pub fn same_storage(&self, other: &PropertyKind) -> bool {
        match (self, other) {
            (PropertyKind::Struct(a), PropertyKind::Struct(b)) => Rc::ptr_eq(a, b),
            (PropertyKind::Object(a), PropertyKind::Object(b)) => match a.get() {
                Some(class) => b.is(&class),
                None => b.is_stale(),
            },
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

/// A parameter or return value slot of a host function
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    kind: PropertyKind,
    offset: u32,
    flags: PropertyFlags,
}

impl Property {
    pub(crate) fn new(name: String, kind: PropertyKind, offset: u32, flags: PropertyFlags) -> Self {
        Self {
            name,
            kind,
            offset,
            flags,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Byte offset inside the owning function's parameter buffer
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn size(&self) -> u32 {
        self.kind.size()
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn is_return(&self) -> bool {
        self.flags.contains(PropertyFlags::RETURN_PARM)
    }
}
