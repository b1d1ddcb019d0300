use std::rc::Rc;

use tracing::debug;

use crate::class::HostClass;
use crate::handle::ObjectHandle;

/// A live host object
#[derive(Debug)]
pub struct HostObject {
    name: String,
    class: Rc<HostClass>,
}

impl HostObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &Rc<HostClass> {
        &self.class
    }
}

struct Slot {
    serial: u32,
    object: Option<HostObject>,
}

/// Table of live host objects addressed by [`ObjectHandle`]
#[derive(Default)]
pub struct ObjectTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, name: impl Into<String>, class: Rc<HostClass>) -> ObjectHandle {
        let object = HostObject {
            name: name.into(),
            class,
        };

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.object = Some(object);
                ObjectHandle::new(index, slot.serial)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    serial: 1,
                    object: Some(object),
                });
                ObjectHandle::new(index, 1)
            }
        };

        debug!(target: "reflect", "Spawned object {:?}", handle);
        handle
    }

    /// Destroy the object behind `handle`. Returns false if it was already gone.
    pub fn destroy(&mut self, handle: ObjectHandle) -> bool {
        if !self.is_valid(handle) {
            return false;
        }

        let slot = &mut self.slots[handle.index() as usize];
        slot.object = None;
        slot.serial = slot.serial.wrapping_add(1).max(1);
        self.free.push(handle.index());
        true
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&HostObject> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.serial != handle.serial() {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn is_valid(&self, handle: ObjectHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.object.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroyed_handle_does_not_resolve_to_new_object() {
        let class = HostClass::new("Actor", None);
        let mut table = ObjectTable::new();

        let first = table.spawn("first", Rc::clone(&class));
        assert!(table.destroy(first));
        assert!(!table.destroy(first));

        let second = table.spawn("second", Rc::clone(&class));
        assert_eq!(first.index(), second.index(), "slot should be recycled");
        assert!(table.get(first).is_none());
        assert_eq!(table.get(second).map(|o| o.name()), Some("second"));
    }

    #[test]
    fn test_null_handle_is_never_valid() {
        let mut table = ObjectTable::new();
        table.spawn("only", HostClass::new("Actor", None));
        assert!(!table.is_valid(ObjectHandle::NULL));
        assert_eq!(table.len(), 1);
    }
}
