use byteorder::{ByteOrder, LittleEndian};
use skbridge_reflect::{Frame, FrameError, ObjectHandle, ValueSlot};
use skbridge_script::{RotationAngles, ScriptValue, StructData, StructValue, Transform, Vector3};

use crate::binding::TypedName;

/// Value kinds the bridge can move between the two runtimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Integer,
    Real,
    String,
    Vector3,
    RotationAngles,
    Transform,
    /// Host struct copied into the script value
    StructVal,
    /// Host struct shared with the script value
    StructRef,
    Entity,
}

impl ValueKind {
    pub fn converter(self) -> &'static dyn Converter {
        match self {
            ValueKind::Boolean => &BooleanConverter,
            ValueKind::Integer => &IntegerConverter,
            ValueKind::Real => &RealConverter,
            ValueKind::String => &StringConverter,
            ValueKind::Vector3 => &Vector3Converter,
            ValueKind::RotationAngles => &RotationAnglesConverter,
            ValueKind::Transform => &TransformConverter,
            ValueKind::StructVal => &StructConverter { by_value: true },
            ValueKind::StructRef => &StructConverter { by_value: false },
            ValueKind::Entity => &EntityConverter,
        }
    }
}

/// Moves one kind of value across the bridge
///
/// `fetch` reads the next argument off a host call frame. `get_value`
/// writes a script value into host storage and returns the bytes written.
/// Values of the wrong shape are coerced where a sensible conversion exists
/// and otherwise written as the kind's default.
pub trait Converter {
    fn fetch(&self, frame: &mut Frame<'_>, typed_name: &TypedName) -> Result<ScriptValue, FrameError>;

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32;
}

struct BooleanConverter;

impl Converter for BooleanConverter {
    fn fetch(&self, frame: &mut Frame<'_>, _typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        Ok(ScriptValue::Boolean(frame.read_bool()?))
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        let value = match value {
            ScriptValue::Boolean(b) => *b,
            ScriptValue::Integer(i) => *i != 0,
            ScriptValue::Real(r) => *r != 0.0,
            _ => false,
        };
        dest.write_bool(value);
        typed_name.byte_size
    }
}

struct IntegerConverter;

impl Converter for IntegerConverter {
    fn fetch(&self, frame: &mut Frame<'_>, _typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        Ok(ScriptValue::Integer(frame.read_i32()?))
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        let value = match value {
            ScriptValue::Integer(i) => *i,
            // Saturates, NaN becomes 0
            ScriptValue::Real(r) => *r as i32,
            ScriptValue::Boolean(b) => *b as i32,
            _ => 0,
        };
        dest.write_i32(value);
        typed_name.byte_size
    }
}

struct RealConverter;

impl Converter for RealConverter {
    fn fetch(&self, frame: &mut Frame<'_>, _typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        Ok(ScriptValue::Real(frame.read_f32()?))
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        let value = match value {
            ScriptValue::Real(r) => *r,
            ScriptValue::Integer(i) => *i as f32,
            ScriptValue::Boolean(b) => *b as i32 as f32,
            _ => 0.0,
        };
        dest.write_f32(value);
        typed_name.byte_size
    }
}

struct StringConverter;

impl Converter for StringConverter {
    fn fetch(&self, frame: &mut Frame<'_>, _typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        Ok(ScriptValue::String(frame.read_string()?))
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        match value {
            ScriptValue::String(s) => dest.write_string(s),
            ScriptValue::Integer(i) => dest.write_string(&i.to_string()),
            ScriptValue::Real(r) => dest.write_string(&r.to_string()),
            ScriptValue::Boolean(b) => dest.write_string(&b.to_string()),
            _ => dest.write_string(""),
        }
        typed_name.byte_size
    }
}

struct Vector3Converter;

impl Converter for Vector3Converter {
    fn fetch(&self, frame: &mut Frame<'_>, _typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        let (_, bytes) = frame.read_struct()?;
        let [x, y, z] = read_f32s::<3>(&bytes);
        Ok(ScriptValue::Vector3(Vector3 { x, y, z }))
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        let v = match value {
            ScriptValue::Vector3(v) => *v,
            _ => Vector3::ZERO,
        };
        dest.write_f32s(&[v.x, v.y, v.z]);
        typed_name.byte_size
    }
}

struct RotationAnglesConverter;

impl Converter for RotationAnglesConverter {
    fn fetch(&self, frame: &mut Frame<'_>, _typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        let (_, bytes) = frame.read_struct()?;
        let [pitch, yaw, roll] = read_f32s::<3>(&bytes);
        Ok(ScriptValue::RotationAngles(RotationAngles { pitch, yaw, roll }))
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        let r = match value {
            ScriptValue::RotationAngles(r) => *r,
            _ => RotationAngles::default(),
        };
        dest.write_f32s(&[r.pitch, r.yaw, r.roll]);
        typed_name.byte_size
    }
}

struct TransformConverter;

impl Converter for TransformConverter {
    fn fetch(&self, frame: &mut Frame<'_>, _typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        let (_, bytes) = frame.read_struct()?;
        let f = read_f32s::<10>(&bytes);
        Ok(ScriptValue::Transform(Transform {
            rotation: [f[0], f[1], f[2], f[3]],
            translation: Vector3::new(f[4], f[5], f[6]),
            scale: Vector3::new(f[7], f[8], f[9]),
        }))
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        let t = match value {
            ScriptValue::Transform(t) => *t,
            _ => Transform::IDENTITY,
        };
        let [qx, qy, qz, qw] = t.rotation;
        dest.write_f32s(&[
            qx,
            qy,
            qz,
            qw,
            t.translation.x,
            t.translation.y,
            t.translation.z,
            t.scale.x,
            t.scale.y,
            t.scale.z,
        ]);
        typed_name.byte_size
    }
}

struct StructConverter {
    by_value: bool,
}

impl Converter for StructConverter {
    fn fetch(&self, frame: &mut Frame<'_>, typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        let (_, bytes) = frame.read_struct()?;
        Ok(ScriptValue::Struct(StructValue {
            type_name: typed_name.script_type.name().to_string(),
            data: StructData::new(&bytes, self.by_value),
        }))
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        let size = typed_name.byte_size as usize;
        match value {
            ScriptValue::Struct(s)
                if s.type_name == typed_name.script_type.name() && s.data.as_bytes().len() == size =>
            {
                dest.write_bytes(s.data.as_bytes());
            }
            _ => dest.write_bytes(&vec![0u8; size]),
        }
        typed_name.byte_size
    }
}

struct EntityConverter;

impl Converter for EntityConverter {
    fn fetch(&self, frame: &mut Frame<'_>, _typed_name: &TypedName) -> Result<ScriptValue, FrameError> {
        let handle = frame.read_object()?;
        if frame.universe().object(handle).is_some() {
            Ok(ScriptValue::Entity(handle))
        } else {
            Ok(ScriptValue::Nil)
        }
    }

    fn get_value(&self, dest: &mut ValueSlot<'_>, value: &ScriptValue, typed_name: &TypedName) -> u32 {
        let handle = match value {
            ScriptValue::Entity(handle) => *handle,
            _ => ObjectHandle::NULL,
        };
        dest.write_handle(handle);
        typed_name.byte_size
    }
}

/// Read `N` little-endian floats, zero-filling past the end of `bytes`
fn read_f32s<const N: usize>(bytes: &[u8]) -> [f32; N] {
    let mut values = [0.0; N];
    for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = LittleEndian::read_f32(chunk);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use skbridge_reflect::{FunctionBuilder, ParamBuffer, PropertyFlags, PropertyKind, Universe};
    use skbridge_script::{builtin, ScriptClass};
    use std::rc::Rc;

    fn typed(name: &str, class: &str, size: u32) -> TypedName {
        TypedName::new(name, size, ScriptClass::new(class, None))
    }

    fn write(kind: ValueKind, value: &ScriptValue, typed_name: &TypedName) -> ParamBuffer {
        let mut buffer = ParamBuffer::new(typed_name.byte_size.max(4));
        let written = kind.converter().get_value(&mut buffer.slot(0), value, typed_name);
        assert_eq!(written, typed_name.byte_size);
        buffer
    }

    #[test]
    fn test_numeric_coercion() {
        let int = typed("n", builtin::INTEGER, 4);
        assert_eq!(write(ValueKind::Integer, &ScriptValue::Real(3.9), &int).read_i32(0), 3);
        assert_eq!(write(ValueKind::Integer, &ScriptValue::Boolean(true), &int).read_i32(0), 1);
        assert_eq!(write(ValueKind::Integer, &ScriptValue::from("12"), &int).read_i32(0), 0);

        let real = typed("r", builtin::REAL, 4);
        assert_eq!(write(ValueKind::Real, &ScriptValue::Integer(-2), &real).read_f32(0), -2.0);
        assert_eq!(write(ValueKind::Real, &ScriptValue::Nil, &real).read_f32(0), 0.0);
    }

    #[test]
    fn test_string_accepts_scalars() {
        let string = typed("s", builtin::STRING, 4);
        assert_eq!(write(ValueKind::String, &ScriptValue::Integer(42), &string).read_string(0), "42");
        assert_eq!(write(ValueKind::String, &ScriptValue::Nil, &string).read_string(0), "");
    }

    #[test]
    fn test_mismatched_aggregates_write_defaults() {
        let transform = typed("t", builtin::TRANSFORM, 40);
        let buffer = write(ValueKind::Transform, &ScriptValue::Integer(1), &transform);
        assert_eq!(buffer.read_f32(12), 1.0, "quaternion w of identity");
        assert_eq!(buffer.read_f32(28), 1.0, "scale x of identity");

        let color = typed("c", "Color", 4);
        let wrong = ScriptValue::Struct(StructValue {
            type_name: "Other".to_string(),
            data: StructData::new(&[9, 9, 9, 9], true),
        });
        assert_eq!(write(ValueKind::StructVal, &wrong, &color).read_bytes(0, 4), &[0, 0, 0, 0]);

        let entity = typed("e", builtin::ENTITY, 8);
        assert!(write(ValueKind::Entity, &ScriptValue::Nil, &entity).read_handle(0).is_null());
    }

    #[test]
    fn test_fetch_reads_frame_in_order() {
        let mut universe = Universe::new();
        let class = universe.add_class("Actor", None);
        let mut builder = FunctionBuilder::new(&class, "Place");
        builder.add_param("where", PropertyKind::Struct(Rc::clone(universe.vector_struct())), PropertyFlags::empty());
        builder.add_param("who", PropertyKind::Object(skbridge_reflect::WeakRef::new(&class)), PropertyFlags::empty());
        let function = builder.link();
        let actor = universe.spawn("hero", &class);

        let vector = typed("where", builtin::VECTOR3, 12);
        let entity = typed("who", builtin::ENTITY, 8);
        let mut params = ParamBuffer::for_function(&function);
        ValueKind::Vector3
            .converter()
            .get_value(&mut params.slot(0), &ScriptValue::Vector3(Vector3::new(1.0, 2.0, 3.0)), &vector);
        ValueKind::Entity
            .converter()
            .get_value(&mut params.slot(12), &ScriptValue::Entity(actor), &entity);

        let mut frame = Frame::new(&universe, &function, ObjectHandle::NULL, &mut params);
        let fetched_vector = ValueKind::Vector3.converter().fetch(&mut frame, &vector).unwrap();
        let fetched_entity = ValueKind::Entity.converter().fetch(&mut frame, &entity).unwrap();

        assert_eq!(fetched_vector, ScriptValue::Vector3(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(fetched_entity, ScriptValue::Entity(actor));
    }

    #[test]
    fn test_fetch_stale_entity_is_nil() {
        let mut universe = Universe::new();
        let class = universe.add_class("Actor", None);
        let mut builder = FunctionBuilder::new(&class, "Target");
        builder.add_param("who", PropertyKind::Object(skbridge_reflect::WeakRef::new(&class)), PropertyFlags::empty());
        let function = builder.link();
        let actor = universe.spawn("hero", &class);
        universe.destroy(actor);

        let mut params = ParamBuffer::for_function(&function);
        params.write_handle(0, actor);
        let mut frame = Frame::new(&universe, &function, ObjectHandle::NULL, &mut params);
        let entity = typed("who", builtin::ENTITY, 8);
        assert_eq!(ValueKind::Entity.converter().fetch(&mut frame, &entity).unwrap(), ScriptValue::Nil);
    }

    #[test]
    fn test_large_struct_is_shared() {
        let mut universe = Universe::new();
        let matrix = universe.add_struct("Matrix", 64);
        let class = universe.add_class("Actor", None);
        let mut builder = FunctionBuilder::new(&class, "Apply");
        builder.add_param("m", PropertyKind::Struct(matrix), PropertyFlags::REFERENCE_PARM);
        let function = builder.link();
        let mut params = ParamBuffer::for_function(&function);
        params.write_bytes(0, &[5u8; 64]);

        let mut frame = Frame::new(&universe, &function, ObjectHandle::NULL, &mut params);
        let value = ValueKind::StructRef.converter().fetch(&mut frame, &typed("m", "Matrix", 64)).unwrap();
        match value {
            ScriptValue::Struct(s) => {
                assert_eq!(s.type_name, "Matrix");
                assert!(!s.data.is_inline());
                assert_eq!(s.data.as_bytes(), &[5u8; 64][..]);
            }
            other => panic!("expected a struct, got {:?}", other),
        }
    }
}
