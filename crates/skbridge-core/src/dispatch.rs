use std::rc::Rc;

use skbridge_reflect::{Frame, NativeContext, NativeFn, ParamBuffer, Universe};
use skbridge_script::{Completion, EventSink, Receiver, Routine, ScriptRuntime, ScriptValue};
use tracing::{debug, error, warn};

use crate::binding::{BindingDetail, BindingEntry, InvokeKind};
use crate::coroutine::CoroutineTracker;
use crate::interface::BlueprintInterface;
use crate::registry::BindingRegistry;

/// Native entry point installed on generated functions of this kind
pub(crate) fn native_for(kind: InvokeKind) -> NativeFn {
    match kind {
        InvokeKind::ClassMethod => Rc::new(exec_class_method),
        InvokeKind::InstanceMethod => Rc::new(exec_instance_method),
        InvokeKind::Coroutine => Rc::new(exec_coroutine),
    }
}

/// Host calls a class-level script method
pub fn exec_class_method(ctx: &mut dyn NativeContext, frame: &mut Frame<'_>) {
    exec_method(ctx, frame, InvokeKind::ClassMethod);
}

/// Host calls a script method on the object the function was invoked on
pub fn exec_instance_method(ctx: &mut dyn NativeContext, frame: &mut Frame<'_>) {
    exec_method(ctx, frame, InvokeKind::InstanceMethod);
}

/// Host starts a script coroutine. The frame returns before it finishes.
pub fn exec_coroutine(ctx: &mut dyn NativeContext, frame: &mut Frame<'_>) {
    exec_method(ctx, frame, InvokeKind::Coroutine);
}

fn exec_method(ctx: &mut dyn NativeContext, frame: &mut Frame<'_>, kind: InvokeKind) {
    let Some(interface) = ctx.as_any_mut().downcast_mut::<BlueprintInterface>() else {
        warn!(
            target: "bridge",
            "{} called without the blueprint interface, ignoring",
            frame.function().name()
        );
        frame.finish();
        return;
    };

    let BlueprintInterface {
        registry,
        runtime,
        coroutines,
        ..
    } = interface;

    call_script(registry, runtime.as_mut(), coroutines, frame, kind);
    frame.finish();
}

/// Entry the invoked function was generated for, if it still belongs to it
fn entry_for<'r>(registry: &'r BindingRegistry, frame: &Frame<'_>) -> Option<(usize, &'r BindingEntry)> {
    let function = frame.function();
    let index = function.binding_index()? as usize;
    let entry = registry.get(index)?;
    entry.host_function.is(function).then_some((index, entry))
}

fn call_script(
    registry: &BindingRegistry,
    runtime: &mut dyn ScriptRuntime,
    coroutines: &mut CoroutineTracker,
    frame: &mut Frame<'_>,
    kind: InvokeKind,
) {
    let function = frame.function();
    let Some((index, entry)) = entry_for(registry, frame) else {
        warn!(target: "bridge", "{} is no longer bound to a routine", function.name());
        return;
    };

    let BindingDetail::Function(binding) = &entry.detail else {
        warn!(target: "bridge", "{} is an event and cannot be called", function.name());
        return;
    };

    if binding.invoke_kind != kind {
        warn!(
            target: "bridge",
            "{} entered as {:?} but is bound as {:?}",
            function.name(),
            kind,
            binding.invoke_kind
        );
        return;
    }

    // Cleared for a runtime reload; the host function stays valid
    let Some(routine) = entry.routine.clone() else {
        debug!(
            target: "bridge",
            "{}.{} has no routine right now, skipping call",
            entry.class_name,
            entry.routine_name
        );
        return;
    };

    let receiver = if entry.is_class_member {
        Receiver::Class(entry.class_name.clone())
    } else {
        let target = frame.target();
        if frame.universe().object(target).is_none() {
            warn!(
                target: "bridge",
                "{} called on a missing object, skipping call",
                routine.qualified_name()
            );
            return;
        }
        Receiver::Instance(ScriptValue::Entity(target))
    };

    let mut args = Vec::with_capacity(binding.params.len());
    for param in &binding.params {
        match param.kind.converter().fetch(frame, &param.typed_name) {
            Ok(value) => args.push(value),
            Err(e) => {
                error!(target: "bridge", "Failed to read arguments for {}: {}", routine.qualified_name(), e);
                return;
            }
        }
    }

    let mut events = EventDispatch::new(registry, frame.universe());

    if kind == InvokeKind::Coroutine {
        let (completion, receiver_end) = Completion::channel(routine.qualified_name());
        match runtime.start_coroutine(&routine, receiver, args, completion, &mut events) {
            Ok(()) => coroutines.track(index, &routine, receiver_end),
            Err(e) => error!(target: "bridge", "Failed to start {}: {}", routine.qualified_name(), e),
        }
        return;
    }

    match runtime.invoke(&routine, receiver, args, &mut events) {
        Ok(value) => {
            if let (Some(result), Some((_, mut slot))) = (&binding.result, frame.result_slot()) {
                result.kind.converter().get_value(&mut slot, &value, &result.typed_name);
            }
        }
        Err(e) => error!(target: "bridge", "{} failed: {}", routine.qualified_name(), e),
    }
}

/// Delivers event-trigger calls from the script runtime to the host
///
/// Triggers that cannot be delivered (routine not bound, receiver gone, no
/// host override) are dropped without telling the script side.
pub struct EventDispatch<'a> {
    registry: &'a BindingRegistry,
    universe: &'a Universe,
}

impl<'a> EventDispatch<'a> {
    pub fn new(registry: &'a BindingRegistry, universe: &'a Universe) -> Self {
        Self { registry, universe }
    }
}

impl EventSink for EventDispatch<'_> {
    fn trigger_event(&mut self, routine: &Routine, receiver: &ScriptValue, args: &[ScriptValue]) {
        let Some(index) = routine.binding_index() else {
            debug!(target: "bridge", "{} is not bound to a host event", routine.qualified_name());
            return;
        };

        let Some(entry) = self
            .registry
            .get(index as usize)
            .filter(|entry| entry.is_for(routine))
        else {
            warn!(target: "bridge", "Stale event binding {} on {}", index, routine.qualified_name());
            return;
        };

        let BindingDetail::Event(binding) = &entry.detail else {
            return;
        };

        let Some(stub) = entry.host_function.get() else {
            debug!(target: "bridge", "Event {} was unloaded", routine.qualified_name());
            return;
        };

        let Some(target) = receiver.as_entity() else {
            debug!(target: "bridge", "{} fired without an entity receiver", routine.qualified_name());
            return;
        };

        let Some(object) = self.universe.object(target) else {
            debug!(target: "bridge", "{} fired on a destroyed object", routine.qualified_name());
            return;
        };

        let owns_event = stub
            .outer()
            .get()
            .is_some_and(|owner| object.class().is_child_of(&owner));
        if !owns_event {
            warn!(
                target: "bridge",
                "{} fired on {}, which is not a {}",
                routine.qualified_name(),
                object.name(),
                entry.class_name
            );
            return;
        }

        let Some(function) = binding.resolve(object.class(), &stub) else {
            return;
        };

        if !function.has_implementation() {
            return;
        }

        if !function.same_layout(&stub) {
            warn!(
                target: "bridge",
                "{}.{} no longer matches the event signature, skipping",
                object.class().name(),
                function.name()
            );
            return;
        }

        let mut params = ParamBuffer::for_function(&function);
        for (param, arg) in binding.params.iter().zip(args) {
            let mut slot = params.slot(param.offset);
            param.kind.converter().get_value(&mut slot, arg, &param.typed_name);
        }

        debug!(
            target: "bridge",
            "Triggering {} on {}",
            routine.qualified_name(),
            object.name()
        );
        self.universe.process_event(&mut (), &function, target, &mut params);
    }
}
