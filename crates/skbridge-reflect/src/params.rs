use byteorder::{ByteOrder, LittleEndian};

use crate::class::HostFunction;
use crate::handle::ObjectHandle;

/// Argument storage for one host function call
///
/// Fixed-size values live in `bytes` at the offsets the function's
/// properties declare. Strings live in a side table and the byte slot holds
/// their index; index 0 is always the empty string.
#[derive(Debug, Clone)]
pub struct ParamBuffer {
    bytes: Vec<u8>,
    strings: Vec<String>,
}

impl ParamBuffer {
    pub fn new(size: u32) -> Self {
        Self {
            bytes: vec![0; size as usize],
            strings: vec![String::new()],
        }
    }

    /// A zeroed buffer sized for `function`
    pub fn for_function(function: &HostFunction) -> Self {
        Self::new(function.parms_size())
    }

    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn slot(&mut self, offset: u32) -> ValueSlot<'_> {
        ValueSlot {
            buffer: self,
            offset,
        }
    }

    pub fn read_bool(&self, offset: u32) -> bool {
        self.bytes[offset as usize] != 0
    }

    pub fn write_bool(&mut self, offset: u32, value: bool) {
        self.bytes[offset as usize] = value as u8;
    }

    pub fn read_i32(&self, offset: u32) -> i32 {
        LittleEndian::read_i32(self.range(offset, 4))
    }

    pub fn write_i32(&mut self, offset: u32, value: i32) {
        LittleEndian::write_i32(self.range_mut(offset, 4), value);
    }

    pub fn read_f32(&self, offset: u32) -> f32 {
        LittleEndian::read_f32(self.range(offset, 4))
    }

    pub fn write_f32(&mut self, offset: u32, value: f32) {
        LittleEndian::write_f32(self.range_mut(offset, 4), value);
    }

    pub fn read_string(&self, offset: u32) -> &str {
        let index = LittleEndian::read_u32(self.range(offset, 4)) as usize;
        self.strings.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn write_string(&mut self, offset: u32, value: &str) {
        let index = if value.is_empty() {
            0
        } else {
            self.strings.push(value.to_string());
            self.strings.len() - 1
        };
        LittleEndian::write_u32(self.range_mut(offset, 4), index as u32);
    }

    pub fn read_handle(&self, offset: u32) -> ObjectHandle {
        ObjectHandle::read_from(self.range(offset, ObjectHandle::SIZE))
    }

    pub fn write_handle(&mut self, offset: u32, handle: ObjectHandle) {
        handle.write_to(self.range_mut(offset, ObjectHandle::SIZE));
    }

    pub fn read_bytes(&self, offset: u32, len: u32) -> &[u8] {
        self.range(offset, len)
    }

    pub fn write_bytes(&mut self, offset: u32, value: &[u8]) {
        self.range_mut(offset, value.len() as u32).copy_from_slice(value);
    }

    fn range(&self, offset: u32, len: u32) -> &[u8] {
        &self.bytes[offset as usize..(offset + len) as usize]
    }

    fn range_mut(&mut self, offset: u32, len: u32) -> &mut [u8] {
        &mut self.bytes[offset as usize..(offset + len) as usize]
    }
}

/// Destination for one converted value inside a [`ParamBuffer`]
pub struct ValueSlot<'a> {
    buffer: &'a mut ParamBuffer,
    offset: u32,
}

impl<'a> ValueSlot<'a> {
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.write_bool(self.offset, value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.write_i32(self.offset, value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.write_f32(self.offset, value);
    }

    pub fn write_f32s(&mut self, values: &[f32]) {
        for (i, value) in values.iter().enumerate() {
            self.buffer.write_f32(self.offset + 4 * i as u32, *value);
        }
    }

    pub fn write_string(&mut self, value: &str) {
        self.buffer.write_string(self.offset, value);
    }

    pub fn write_handle(&mut self, handle: ObjectHandle) {
        self.buffer.write_handle(self.offset, handle);
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.buffer.write_bytes(self.offset, value);
    }
}
