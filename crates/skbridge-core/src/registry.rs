use std::rc::Rc;

use skbridge_reflect::{HostClass, HostFunction, WeakRef};
use skbridge_script::{Routine, ScriptRuntime};
use tracing::{debug, info, warn};

use crate::binding::{
    BindingDetail, BindingEntry, BindingKind, EventBinding, FunctionBinding, InvokeKind, K2Param, ResultSlot,
    SkParam,
};
use crate::error::BindError;
use crate::synth::build_function;
use crate::types::TypeBindings;

/// Index-stable table of binding entries
///
/// Generated host functions carry their entry's index, so slots are never
/// compacted. Deleting an entry leaves a tombstone that the next insertion
/// reuses.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    entries: Vec<Option<BindingEntry>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, tombstones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of occupied slots
    pub fn live_count(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Entry in slot `index`, dead or alive
    pub fn get(&self, index: usize) -> Option<&BindingEntry> {
        self.entries.get(index)?.as_ref()
    }

    /// Live entries with their indices
    pub fn entries(&self) -> impl Iterator<Item = (usize, &BindingEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|entry| (index, entry)))
            .filter(|(_, entry)| !entry.is_dead())
    }

    /// Index of the entry keyed on this routine identity
    pub fn find(&self, routine: &Routine) -> Option<usize> {
        self.entries
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entry| entry.is_for(routine)))
    }

    /// Put `entry` in the slot named by `index_hint` if it is free, else the
    /// first free slot, else a new one at the end
    pub fn store(&mut self, entry: BindingEntry, index_hint: Option<usize>) -> usize {
        let index = index_hint
            .filter(|&hint| self.entries.get(hint).is_some_and(Option::is_none))
            .or_else(|| self.entries.iter().position(Option::is_none));

        match index {
            Some(index) => {
                self.entries[index] = Some(entry);
                index
            }
            None => {
                self.entries.push(Some(entry));
                self.entries.len() - 1
            }
        }
    }

    /// Tombstone slot `index`
    ///
    /// The generated function is detached from its class and forgets its
    /// index, so any reference the host still holds dispatches to nothing.
    pub fn delete_entry(&mut self, index: usize) {
        let Some(entry) = self.entries.get_mut(index).and_then(Option::take) else {
            return;
        };

        if let Some(function) = entry.host_function.get() {
            if function.binding_index() == Some(index as u32) {
                function.clear_binding_index();
            }
            if let Some(class) = entry.host_class.get() {
                class.remove_function(&function);
            }
        }

        if let Some(routine) = &entry.routine {
            if routine.binding_index() == Some(index as u32) {
                routine.clear_binding_index();
            }
        }

        debug!(
            target: "bridge",
            "Deleted {:?} entry {} for {}.{}",
            entry.kind(),
            index,
            entry.class_name,
            entry.routine_name
        );
    }

    /// Mark every entry belonging to the script class `class_name`
    pub fn mark_class(&mut self, class_name: &str) {
        for entry in self.entries.iter_mut().flatten() {
            if entry.class_name == class_name {
                entry.marked_for_delete = true;
            }
        }
    }

    pub fn mark_all(&mut self) {
        for entry in self.entries.iter_mut().flatten() {
            entry.marked_for_delete = true;
        }
    }

    /// Delete marked entries, optionally only those of one class. Returns
    /// how many were deleted.
    pub fn sweep_marked(&mut self, class_name: Option<&str>) -> usize {
        let marked: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let entry = slot.as_ref()?;
                let in_scope = class_name.map_or(true, |name| entry.class_name == name);
                (entry.marked_for_delete && in_scope).then_some(index)
            })
            .collect();

        for &index in &marked {
            self.delete_entry(index);
        }
        marked.len()
    }

    /// Keep the existing entry for `routine` if its host function still fits
    ///
    /// On a signature match the entry is relinked to `routine` and unmarked.
    /// Otherwise the entry is left marked for deletion and `None` tells the
    /// caller to build a new function.
    pub fn try_update(&mut self, types: &TypeBindings, host_class: &Rc<HostClass>, routine: &Rc<Routine>) -> Option<usize> {
        let index = self.find(routine)?;
        let entry = self.entries[index].as_mut()?;

        if entry.is_dead() || !entry.host_class.is(host_class) || !entry.accepts(routine, types) {
            debug!(
                target: "bridge",
                "Signature of {} changed, rebuilding",
                routine.qualified_name()
            );
            entry.marked_for_delete = true;
            return None;
        }

        entry.routine = Some(Rc::clone(routine));
        entry.marked_for_delete = false;
        if let BindingDetail::Event(binding) = &entry.detail {
            binding.reset();
        }
        self.bind_event_method(index);
        Some(index)
    }

    /// Generate a host function for `routine` and record the binding
    pub fn try_add(
        &mut self,
        types: &TypeBindings,
        host_class: &Rc<HostClass>,
        routine: &Rc<Routine>,
        is_final: bool,
    ) -> Result<usize, BindError> {
        self.check_name_free(host_class, routine)?;

        match BindingKind::of(routine) {
            BindingKind::Function => self.add_function_entry(types, host_class, routine, is_final),
            BindingKind::Event => self.add_event_entry(types, host_class, routine, is_final),
        }
    }

    /// A generated function replaces any same-named function on its class,
    /// so the name must not belong to the host or to another live binding
    ///
    /// Entries still marked for deletion do not hold their name: they are
    /// either being rebuilt or about to be swept.
    fn check_name_free(&self, host_class: &HostClass, routine: &Routine) -> Result<(), BindError> {
        let Some(existing) = host_class.find_function_local(routine.name()) else {
            return Ok(());
        };

        let owner = existing
            .binding_index()
            .and_then(|index| self.get(index as usize))
            .filter(|entry| entry.host_function.is(&existing));

        match owner {
            Some(entry) if entry.marked_for_delete => Ok(()),
            Some(entry) => Err(BindError::NameCollision {
                routine: routine.qualified_name(),
                existing: format!(
                    "{}{}{}",
                    entry.class_name,
                    if entry.is_class_member { "@@" } else { "@" },
                    entry.routine_name
                ),
            }),
            None => Err(BindError::HostFunctionExists {
                routine: routine.qualified_name(),
                class: host_class.name().to_string(),
            }),
        }
    }

    fn add_function_entry(
        &mut self,
        types: &TypeBindings,
        host_class: &Rc<HostClass>,
        routine: &Rc<Routine>,
        is_final: bool,
    ) -> Result<usize, BindError> {
        let built = build_function(types, host_class, routine, BindingKind::Function, is_final)?;

        let params = built
            .params
            .into_iter()
            .map(|info| SkParam {
                typed_name: info.typed_name,
                kind: info.kind,
            })
            .collect();
        let result = built.result.map(|info| ResultSlot {
            typed_name: info.typed_name,
            kind: info.kind,
        });

        let detail = BindingDetail::Function(FunctionBinding {
            invoke_kind: InvokeKind::of(routine),
            result,
            params,
        });
        Ok(self.attach(host_class, routine, built.function, detail))
    }

    fn add_event_entry(
        &mut self,
        types: &TypeBindings,
        host_class: &Rc<HostClass>,
        routine: &Rc<Routine>,
        is_final: bool,
    ) -> Result<usize, BindError> {
        let built = build_function(types, host_class, routine, BindingKind::Event, is_final)?;

        let params = built
            .params
            .into_iter()
            .map(|info| K2Param {
                typed_name: info.typed_name,
                kind: info.kind,
                offset: info.offset,
            })
            .collect();

        let detail = BindingDetail::Event(EventBinding::new(params));
        let index = self.attach(host_class, routine, built.function, detail);
        self.bind_event_method(index);
        Ok(index)
    }

    fn attach(
        &mut self,
        host_class: &Rc<HostClass>,
        routine: &Rc<Routine>,
        function: Rc<HostFunction>,
        detail: BindingDetail,
    ) -> usize {
        let entry = BindingEntry {
            routine_name: routine.name().to_string(),
            class_name: routine.scope_name().to_string(),
            routine: Some(Rc::clone(routine)),
            host_class: WeakRef::new(host_class),
            host_function: WeakRef::new(&function),
            num_params: routine.params().len() as u16,
            is_class_member: routine.is_class_member(),
            marked_for_delete: false,
            detail,
        };

        let index = self.store(entry, None);
        function.set_binding_index(index as u32);
        host_class.add_function(function);
        debug!(
            target: "bridge",
            "Stored binding {} for {}",
            index,
            routine.qualified_name()
        );
        index
    }

    /// Stamp an event entry's index on its routine so triggering it can find
    /// the entry
    fn bind_event_method(&self, index: usize) {
        if let Some(entry) = self.get(index) {
            if let (BindingDetail::Event(_), Some(routine)) = (&entry.detail, &entry.routine) {
                routine.set_binding_index(index as u32);
            }
        }
    }

    /// Delete every entry and release the storage
    pub fn clear(&mut self) {
        for index in 0..self.entries.len() {
            self.delete_entry(index);
        }
        self.entries.clear();
        self.entries.shrink_to_fit();
    }

    /// Drop every routine reference, keeping the generated host functions
    pub fn clear_all_script_invokables(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let Some(entry) = entry else { continue };
            if let Some(routine) = entry.routine.take() {
                if routine.binding_index() == Some(index as u32) {
                    routine.clear_binding_index();
                }
            }
        }
    }

    /// Re-resolve every entry's routine against `runtime`
    ///
    /// Entries whose routine is gone, whose signature no longer fits, or
    /// whose host side was unloaded are deleted. Returns how many entries
    /// were rebound.
    pub fn rebind_all(&mut self, runtime: &dyn ScriptRuntime, types: &TypeBindings) -> usize {
        let mut rebound = 0;

        for index in 0..self.entries.len() {
            let Some(entry) = self.entries[index].as_mut() else {
                continue;
            };

            let routine = runtime
                .find_routine(&entry.class_name, &entry.routine_name, entry.is_class_member)
                .filter(|routine| routine.is_blueprint() && entry.accepts(routine, types));

            match routine {
                Some(routine) if !entry.is_dead() => {
                    entry.routine = Some(routine);
                    if let BindingDetail::Event(binding) = &entry.detail {
                        binding.reset();
                    }
                    self.bind_event_method(index);
                    rebound += 1;
                }
                _ => {
                    warn!(
                        target: "bridge",
                        "Could not rebind {}.{}, removing binding {}",
                        entry.class_name,
                        entry.routine_name,
                        index
                    );
                    self.delete_entry(index);
                }
            }
        }

        info!(target: "bridge", "Rebound {} of {} bindings", rebound, self.live_count());
        rebound
    }
}
