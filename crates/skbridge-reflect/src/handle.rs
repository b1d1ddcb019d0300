use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::rc::{Rc, Weak};

/// Reference to an object in the [`ObjectTable`](crate::ObjectTable)
///
/// The serial is bumped every time a slot is recycled, so a handle to a
/// destroyed object never resolves to whatever took its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    index: u32,
    serial: u32,
}

impl ObjectHandle {
    /// Handle that never resolves
    pub const NULL: ObjectHandle = ObjectHandle {
        index: u32::MAX,
        serial: 0,
    };

    /// Bytes an object reference occupies in a parameter buffer
    pub const SIZE: u32 = 8;

    pub(crate) fn new(index: u32, serial: u32) -> Self {
        Self { index, serial }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }

    /// Write the handle as two little-endian u32s
    pub fn write_to(&self, dest: &mut [u8]) {
        LittleEndian::write_u32(&mut dest[0..4], self.index);
        LittleEndian::write_u32(&mut dest[4..8], self.serial);
    }

    /// Read a handle previously written with [`ObjectHandle::write_to`]
    pub fn read_from(src: &[u8]) -> Self {
        Self {
            index: LittleEndian::read_u32(&src[0..4]),
            serial: LittleEndian::read_u32(&src[4..8]),
        }
    }
}

impl Default for ObjectHandle {
    fn default() -> Self {
        Self::NULL
    }
}

/// Weak reference to a reflection object (class, function)
///
/// Holding one never keeps the target alive. Once the host drops the target
/// the reference reports stale and [`WeakRef::get`] returns `None`.
pub struct WeakRef<T>(Weak<T>);

impl<T> WeakRef<T> {
    pub fn new(target: &Rc<T>) -> Self {
        Self(Rc::downgrade(target))
    }

    /// A reference that was never bound to anything
    pub fn empty() -> Self {
        Self(Weak::new())
    }

    pub fn get(&self) -> Option<Rc<T>> {
        self.0.upgrade()
    }

    pub fn is_stale(&self) -> bool {
        self.0.strong_count() == 0
    }

    /// Check whether this reference points at `target`
    pub fn is(&self, target: &T) -> bool {
        !self.is_stale() && std::ptr::eq(self.0.as_ptr(), target)
    }
}

impl<T> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for WeakRef<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_stale() {
            write!(f, "WeakRef(stale)")
        } else {
            write!(f, "WeakRef({:p})", self.0.as_ptr())
        }
    }
}
