use std::fmt;
use std::rc::Rc;

use skbridge_reflect::ObjectHandle;

use crate::class::builtin;

/// Largest struct stored inline in a [`StructValue`]
pub const INLINE_STRUCT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vector3 = Vector3 { x: 1.0, y: 1.0, z: 1.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Euler rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationAngles {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl RotationAngles {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Rotation quaternion (x, y, z, w), translation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotation: [f32; 4],
    pub translation: Vector3,
    pub scale: Vector3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        rotation: [0.0, 0.0, 0.0, 1.0],
        translation: Vector3::ZERO,
        scale: Vector3::ONE,
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Raw bytes of a host struct held by a script value
#[derive(Clone, PartialEq)]
pub enum StructData {
    /// Small structs, copied by value
    Inline {
        len: u8,
        bytes: [u8; INLINE_STRUCT_CAPACITY],
    },
    /// Larger structs, shared by reference
    Shared(Rc<[u8]>),
}

impl StructData {
    /// Store inline when `bytes` fits and `by_value` is requested
    pub fn new(bytes: &[u8], by_value: bool) -> Self {
        if by_value && bytes.len() <= INLINE_STRUCT_CAPACITY {
            let mut inline = [0u8; INLINE_STRUCT_CAPACITY];
            inline[..bytes.len()].copy_from_slice(bytes);
            StructData::Inline {
                len: bytes.len() as u8,
                bytes: inline,
            }
        } else {
            StructData::Shared(Rc::from(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            StructData::Inline { len, bytes } => &bytes[..*len as usize],
            StructData::Shared(bytes) => bytes,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, StructData::Inline { .. })
    }
}

impl fmt::Debug for StructData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = if self.is_inline() { "inline" } else { "shared" };
        write!(f, "StructData({}, {:?})", storage, self.as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub type_name: String,
    pub data: StructData,
}

/// A script runtime value instance
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i32),
    Real(f32),
    String(String),
    Vector3(Vector3),
    RotationAngles(RotationAngles),
    Transform(Transform),
    Struct(StructValue),
    /// Reference to a host object
    Entity(ObjectHandle),
}

impl ScriptValue {
    /// Name of the built-in class this value is an instance of
    pub fn class_name(&self) -> &str {
        match self {
            ScriptValue::Nil => builtin::NONE,
            ScriptValue::Boolean(_) => builtin::BOOLEAN,
            ScriptValue::Integer(_) => builtin::INTEGER,
            ScriptValue::Real(_) => builtin::REAL,
            ScriptValue::String(_) => builtin::STRING,
            ScriptValue::Vector3(_) => builtin::VECTOR3,
            ScriptValue::RotationAngles(_) => builtin::ROTATION_ANGLES,
            ScriptValue::Transform(_) => builtin::TRANSFORM,
            ScriptValue::Struct(value) => &value.type_name,
            ScriptValue::Entity(_) => builtin::ENTITY,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            ScriptValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f32> {
        match self {
            ScriptValue::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<ObjectHandle> {
        match self {
            ScriptValue::Entity(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Boolean(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Integer(value)
    }
}

impl From<f32> for ScriptValue {
    fn from(value: f32) -> Self {
        ScriptValue::Real(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}
