use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use skbridge_reflect::{HostClass, HostFunction, NativeContext, Universe};
use skbridge_script::{EventSink, Routine, ScriptClass, ScriptRuntime, ScriptValue};
use tracing::{debug, info, warn};

use crate::binding::BindingKind;
use crate::config::BridgeConfig;
use crate::coroutine::{CoroutineCompletion, CoroutineTracker};
use crate::dispatch::EventDispatch;
use crate::error::{BindError, BridgeError};
use crate::registry::BindingRegistry;
use crate::types::TypeBindings;

thread_local! {
    static INSTANCE_LIVE: Cell<bool> = const { Cell::new(false) };
}

/// Notified while classes are re-exposed
pub trait ExposeHook {
    /// The generated functions on `class` changed
    fn on_class_updated(&mut self, class: &Rc<HostClass>);

    /// A routine could not be exposed
    fn on_routine_rejected(&mut self, _error: &BindError) {}
}

impl ExposeHook for () {
    fn on_class_updated(&mut self, _class: &Rc<HostClass>) {}
}

/// The bridge between one script runtime and the host
///
/// Owns the binding registry. Only one may exist per thread at a time;
/// [`BlueprintInterface::initialize`] fails while another is alive. Pass it
/// as the native context when the host calls generated functions.
pub struct BlueprintInterface {
    pub(crate) registry: BindingRegistry,
    pub(crate) types: TypeBindings,
    pub(crate) runtime: Box<dyn ScriptRuntime>,
    pub(crate) coroutines: CoroutineTracker,
    pub(crate) config: BridgeConfig,
}

impl BlueprintInterface {
    pub fn initialize(
        universe: &Universe,
        runtime: Box<dyn ScriptRuntime>,
        config: BridgeConfig,
    ) -> Result<Self, BridgeError> {
        if INSTANCE_LIVE.with(|live| live.replace(true)) {
            return Err(BridgeError::AlreadyInitialized);
        }

        let mut types = TypeBindings::new(universe, config.inline_struct_capacity);
        let bound = types.bind_by_name(universe, &runtime.classes());
        info!(target: "bridge", "Blueprint interface initialized, {} types bound by name", bound);

        Ok(Self {
            registry: BindingRegistry::new(),
            types,
            runtime,
            coroutines: CoroutineTracker::new(),
            config,
        })
    }

    /// Tear down every binding and release the singleton slot
    pub fn shutdown(self) {
        info!(target: "bridge", "Blueprint interface shutting down");
        drop(self);
    }

    pub fn is_initialized() -> bool {
        INSTANCE_LIVE.with(Cell::get)
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn types(&self) -> &TypeBindings {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeBindings {
        &mut self.types
    }

    pub fn runtime(&self) -> &dyn ScriptRuntime {
        self.runtime.as_ref()
    }

    pub fn runtime_mut(&mut self) -> &mut dyn ScriptRuntime {
        self.runtime.as_mut()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bring the generated functions for `script_class` in line with its
    /// current routines. Returns true if anything was added or removed.
    pub fn reexpose_class(&mut self, script_class: &Rc<ScriptClass>, is_final: bool, hook: &mut dyn ExposeHook) -> bool {
        if !self.config.enabled {
            return false;
        }

        let class_name = script_class.name();
        let routines: Vec<Rc<Routine>> = script_class
            .routines()
            .into_iter()
            .filter(|routine| routine.is_blueprint())
            .collect();

        let Some(host_class) = self.types.host_class(class_name) else {
            for routine in &routines {
                self.reject(
                    BindError::UnboundClass {
                        routine: routine.qualified_name(),
                        class: class_name.to_string(),
                    },
                    hook,
                );
            }
            self.registry.mark_class(class_name);
            return self.registry.sweep_marked(Some(class_name)) > 0;
        };

        let is_final = is_final || self.config.is_final;
        let mut changed = false;
        self.registry.mark_class(class_name);

        // Every surviving entry is unmarked before anything is added, so a
        // name still held by a marked entry is free to take.
        let mut missing = Vec::new();
        for routine in &routines {
            match self.registry.try_update(&self.types, &host_class, routine) {
                Some(index) => debug!(target: "bridge", "Kept binding {} for {}", index, routine.qualified_name()),
                None => missing.push(routine),
            }
        }

        for routine in missing {
            match self.registry.try_add(&self.types, &host_class, routine, is_final) {
                Ok(_) => changed = true,
                Err(e) => self.reject(e, hook),
            }
        }

        changed |= self.registry.sweep_marked(Some(class_name)) > 0;

        if changed {
            debug!(target: "bridge", "Host class {} updated", host_class.name());
            hook.on_class_updated(&host_class);
        }
        changed
    }

    /// Re-expose `script_class` and every class deriving from it
    pub fn reexpose_class_recursively(
        &mut self,
        script_class: &Rc<ScriptClass>,
        is_final: bool,
        hook: &mut dyn ExposeHook,
    ) -> bool {
        let mut changed = self.reexpose_class(script_class, is_final, hook);

        let subclasses: Vec<Rc<ScriptClass>> = self
            .runtime
            .classes()
            .into_iter()
            .filter(|class| class.superclass().is_some_and(|sup| Rc::ptr_eq(sup, script_class)))
            .collect();

        for subclass in &subclasses {
            changed |= self.reexpose_class_recursively(subclass, is_final, hook);
        }
        changed
    }

    /// Re-synchronize every class. Bindings for classes that no longer exist
    /// on either side are removed.
    pub fn reexpose_all(&mut self, is_final: bool, hook: &mut dyn ExposeHook) -> bool {
        self.types.prune_stale();
        self.registry.mark_all();

        let roots: Vec<Rc<ScriptClass>> = self
            .runtime
            .classes()
            .into_iter()
            .filter(|class| class.superclass().is_none())
            .collect();

        let mut changed = false;
        for root in &roots {
            changed |= self.reexpose_class_recursively(root, is_final, hook);
        }

        let removed = self.registry.sweep_marked(None);
        info!(
            target: "bridge",
            "Re-exposed all classes: {} bindings live, {} removed",
            self.registry.live_count(),
            removed
        );
        changed || removed > 0
    }

    /// Delete every binding
    pub fn clear(&mut self) {
        self.coroutines.abandon_all();
        self.registry.clear();
    }

    /// Drop every routine reference ahead of a runtime reload
    pub fn clear_all_sk_invokables(&mut self) {
        self.coroutines.abandon_all();
        self.registry.clear_all_script_invokables();
    }

    /// Re-resolve routines against the current runtime
    pub fn rebind_all_sk_invokables(&mut self) -> usize {
        self.registry.rebind_all(self.runtime.as_ref(), &self.types)
    }

    /// Swap in a freshly loaded runtime, keeping host functions valid
    pub fn reload_runtime(&mut self, universe: &Universe, runtime: Box<dyn ScriptRuntime>) {
        self.clear_all_sk_invokables();
        self.runtime = runtime;
        self.types.bind_by_name(universe, &self.runtime.classes());

        if self.config.rebind_on_reload {
            self.rebind_all_sk_invokables();
        }
    }

    /// True if `function` was generated to call a script routine
    pub fn is_skookum_blueprint_function(&self, function: &HostFunction) -> bool {
        self.classify(function) == Some(BindingKind::Function)
    }

    /// True if `function` was generated as a script event stub
    pub fn is_skookum_blueprint_event(&self, function: &HostFunction) -> bool {
        function.is_event_stub() && self.classify(function) == Some(BindingKind::Event)
    }

    fn classify(&self, function: &HostFunction) -> Option<BindingKind> {
        let entry = self.registry.get(function.binding_index()? as usize)?;
        entry.host_function.is(function).then(|| entry.kind())
    }

    /// Fire the event bound to `routine` on `receiver`
    pub fn trigger_event(&self, universe: &Universe, routine: &Routine, receiver: &ScriptValue, args: &[ScriptValue]) {
        EventDispatch::new(&self.registry, universe).trigger_event(routine, receiver, args);
    }

    /// Advance the script runtime by one step
    pub fn update(&mut self, universe: &Universe) {
        let mut events = EventDispatch::new(&self.registry, universe);
        self.runtime.update(&mut events);
    }

    /// Coroutines started from the host that finished since the last poll
    pub fn poll_coroutines(&mut self) -> Vec<CoroutineCompletion> {
        self.coroutines.poll()
    }

    pub fn pending_coroutines(&self) -> usize {
        self.coroutines.pending_count()
    }

    fn reject(&self, error: BindError, hook: &mut dyn ExposeHook) {
        if self.config.log_rejections {
            warn!(target: "bridge", "Could not expose routine: {}", error);
        }
        hook.on_routine_rejected(&error);
    }
}

impl NativeContext for BlueprintInterface {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for BlueprintInterface {
    fn drop(&mut self) {
        self.clear();
        INSTANCE_LIVE.with(|live| live.set(false));
    }
}
