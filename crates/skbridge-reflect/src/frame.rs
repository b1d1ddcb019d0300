use std::rc::Rc;

use thiserror::Error;

use crate::class::HostFunction;
use crate::handle::ObjectHandle;
use crate::params::{ParamBuffer, ValueSlot};
use crate::property::{HostStruct, Property, PropertyKind};
use crate::universe::Universe;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("no arguments left to read for {function}")]
    Exhausted { function: String },

    #[error("{function}: parameter {param} is {actual}, read as {expected}")]
    TypeMismatch {
        function: String,
        param: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// The active call of a host function
///
/// Natives read their arguments in declaration order; each read checks the
/// declared property type and advances the cursor.
pub struct Frame<'a> {
    universe: &'a Universe,
    function: &'a HostFunction,
    target: ObjectHandle,
    locals: &'a mut ParamBuffer,
    cursor: usize,
}

impl<'a> Frame<'a> {
    pub fn new(
        universe: &'a Universe,
        function: &'a HostFunction,
        target: ObjectHandle,
        locals: &'a mut ParamBuffer,
    ) -> Self {
        Self {
            universe,
            function,
            target,
            locals,
            cursor: 0,
        }
    }

    pub fn universe(&self) -> &'a Universe {
        self.universe
    }

    pub fn function(&self) -> &'a HostFunction {
        self.function
    }

    /// Object the function was invoked on, null for static calls
    pub fn target(&self) -> ObjectHandle {
        self.target
    }

    /// Number of arguments not read yet
    pub fn remaining(&self) -> usize {
        self.function.num_params().saturating_sub(self.cursor)
    }

    /// Skip whatever arguments are left
    pub fn finish(&mut self) {
        self.cursor = self.function.num_params();
    }

    /// Declared property of the next argument, without consuming it
    pub fn peek(&self) -> Option<&'a Property> {
        self.function.params().get(self.cursor)
    }

    pub fn read_bool(&mut self) -> Result<bool, FrameError> {
        let property = self.next("bool", |k| matches!(k, PropertyKind::Bool))?;
        Ok(self.locals.read_bool(property.offset()))
    }

    pub fn read_i32(&mut self) -> Result<i32, FrameError> {
        let property = self.next("int", |k| matches!(k, PropertyKind::Int))?;
        Ok(self.locals.read_i32(property.offset()))
    }

    pub fn read_f32(&mut self) -> Result<f32, FrameError> {
        let property = self.next("float", |k| matches!(k, PropertyKind::Float))?;
        Ok(self.locals.read_f32(property.offset()))
    }

    pub fn read_string(&mut self) -> Result<String, FrameError> {
        let property = self.next("string", |k| matches!(k, PropertyKind::Str))?;
        Ok(self.locals.read_string(property.offset()).to_string())
    }

    pub fn read_struct(&mut self) -> Result<(Rc<HostStruct>, Vec<u8>), FrameError> {
        let property = self.next("struct", |k| matches!(k, PropertyKind::Struct(_)))?;
        let host_struct = match property.kind() {
            PropertyKind::Struct(host_struct) => Rc::clone(host_struct),
            _ => return Err(self.mismatch(property, "struct")),
        };
        let bytes = self.locals.read_bytes(property.offset(), host_struct.size()).to_vec();
        Ok((host_struct, bytes))
    }

    pub fn read_object(&mut self) -> Result<ObjectHandle, FrameError> {
        let property = self.next("object", |k| matches!(k, PropertyKind::Object(_)))?;
        Ok(self.locals.read_handle(property.offset()))
    }

    /// Slot the native writes its return value into, if the function has one
    pub fn result_slot(&mut self) -> Option<(&'a Property, ValueSlot<'_>)> {
        let property = self.function.return_property()?;
        Some((property, self.locals.slot(property.offset())))
    }

    fn next(
        &mut self,
        expected: &'static str,
        accepts: impl Fn(&PropertyKind) -> bool,
    ) -> Result<&'a Property, FrameError> {
        let function = self.function;
        let property = function
            .params()
            .get(self.cursor)
            .ok_or_else(|| FrameError::Exhausted {
                function: function.name().to_string(),
            })?;

        if !accepts(property.kind()) {
            return Err(self.mismatch(property, expected));
        }

        self.cursor += 1;
        Ok(property)
    }

    fn mismatch(&self, property: &Property, expected: &'static str) -> FrameError {
        FrameError::TypeMismatch {
            function: self.function.name().to_string(),
            param: property.name().to_string(),
            expected,
            actual: property.kind().type_name(),
        }
    }
}
