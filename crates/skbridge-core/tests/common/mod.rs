//! Shared fixture for the bridge integration tests
//!
//! Host side: `Calculator`, `Actor` with subclass `Pawn`, and `Turret`.
//! Script side: matching classes whose blueprint routines cover class
//! methods, instance methods, coroutines and events.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use skbridge_core::{BindError, BlueprintInterface, BridgeConfig, ExposeHook};
use skbridge_reflect::{HostClass, HostFunction, NativeFn, ObjectHandle, ParamBuffer, Universe};
use skbridge_script::{
    builtin, CoroutineStep, MemoryRuntime, Routine, RoutineKind, ScriptClass, ScriptValue,
};

pub struct World {
    pub universe: Universe,
    pub interface: BlueprintInterface,
    pub calculator: Rc<HostClass>,
    pub actor: Rc<HostClass>,
    pub pawn: Rc<HostClass>,
}

#[derive(Default)]
pub struct RecordingHook {
    pub updated: Vec<String>,
    pub rejected: Vec<BindError>,
}

impl ExposeHook for RecordingHook {
    fn on_class_updated(&mut self, class: &Rc<HostClass>) {
        self.updated.push(class.name().to_string());
    }

    fn on_routine_rejected(&mut self, error: &BindError) {
        self.rejected.push(error.clone());
    }
}

pub fn host_universe() -> Universe {
    let mut universe = Universe::new();
    universe.add_class("Calculator", None);
    let actor = universe.add_class("Actor", None);
    universe.add_class("Pawn", Some(&actor));
    universe.add_class("Turret", None);
    universe
}

/// Script runtime with the full set of test routines
pub fn script_runtime() -> MemoryRuntime {
    let mut runtime = MemoryRuntime::new();
    let integer = runtime.class(builtin::INTEGER).expect("builtin Integer");
    let real = runtime.class(builtin::REAL).expect("builtin Real");
    let string = runtime.class(builtin::STRING).expect("builtin String");
    let boolean = runtime.class(builtin::BOOLEAN).expect("builtin Boolean");

    let calculator = runtime.define_class("Calculator", Some(builtin::ENTITY));
    runtime.add_method(
        &calculator,
        Routine::new("add", RoutineKind::Method)
            .class_member()
            .with_param("a", &integer)
            .with_param("b", &integer)
            .returning(&integer)
            .blueprint(),
        |scope| {
            let a = scope.arg(0).as_integer().unwrap_or(0);
            let b = scope.arg(1).as_integer().unwrap_or(0);
            Ok(ScriptValue::Integer(a + b))
        },
    );
    // Not annotated, never exposed
    runtime.add_method(
        &calculator,
        Routine::new("internal", RoutineKind::Method).class_member(),
        |_| Ok(ScriptValue::Nil),
    );

    let actor = runtime.define_class("Actor", Some(builtin::ENTITY));
    runtime.add_event(
        &actor,
        Routine::new("on_hit", RoutineKind::EventTrigger)
            .with_param("amount", &real)
            .blueprint(),
    );
    runtime.add_method(
        &actor,
        Routine::new("take_damage", RoutineKind::Method)
            .with_param("amount", &real)
            .blueprint(),
        |scope| {
            let amount = scope.arg(0);
            scope.fire("on_hit", vec![amount])?;
            Ok(ScriptValue::Nil)
        },
    );
    runtime.add_method(
        &actor,
        Routine::new("greet", RoutineKind::Method)
            .with_param("name", &string)
            .returning(&string)
            .blueprint(),
        |scope| match scope.arg(0) {
            ScriptValue::String(name) => Ok(ScriptValue::String(format!("hello {}", name))),
            _ => Ok(ScriptValue::Nil),
        },
    );
    runtime.add_coroutine(
        &actor,
        Routine::new("wait_ticks", RoutineKind::Coroutine)
            .with_param("ticks", &integer)
            .returning(&boolean)
            .blueprint(),
        |scope, steps| {
            let ticks = scope.arg(0).as_integer().unwrap_or(0);
            if (steps as i32) < ticks {
                CoroutineStep::Yield
            } else {
                CoroutineStep::Done(ScriptValue::Boolean(true))
            }
        },
    );

    runtime.define_class("Pawn", Some("Actor"));

    let turret = runtime.define_class("Turret", Some(builtin::ENTITY));
    runtime.add_method(
        &turret,
        Routine::new("fire", RoutineKind::Method).blueprint(),
        |_| Ok(ScriptValue::Nil),
    );

    runtime
}

pub fn world() -> World {
    world_with(BridgeConfig::default())
}

pub fn world_with(config: BridgeConfig) -> World {
    let universe = host_universe();
    let interface = BlueprintInterface::initialize(&universe, Box::new(script_runtime()), config)
        .expect("Failed to initialize blueprint interface");

    World {
        calculator: universe.find_class("Calculator").expect("Calculator host class"),
        actor: universe.find_class("Actor").expect("Actor host class"),
        pawn: universe.find_class("Pawn").expect("Pawn host class"),
        universe,
        interface,
    }
}

/// World with every class already exposed
pub fn exposed_world() -> World {
    let mut world = world();
    world.interface.reexpose_all(false, &mut ());
    world
}

pub fn script_class(world: &World, name: &str) -> Rc<ScriptClass> {
    world
        .interface
        .runtime()
        .find_class(name)
        .unwrap_or_else(|| panic!("script class {} missing", name))
}

pub fn generated(class: &HostClass, name: &str) -> Rc<HostFunction> {
    class
        .find_function_local(name)
        .unwrap_or_else(|| panic!("{} was not generated on {}", name, class.name()))
}

/// Call a host function the way the host's dispatcher would
pub fn call(world: &mut World, function: &HostFunction, target: ObjectHandle, params: &mut ParamBuffer) -> bool {
    world
        .universe
        .process_event(&mut world.interface, function, target, params)
}

/// Implement `event` on `class` with a native recording the float argument
pub fn record_hits(class: &Rc<HostClass>, event: &HostFunction) -> Rc<RefCell<Vec<f32>>> {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let recorded = Rc::clone(&hits);
    let native: NativeFn = Rc::new(move |_ctx, frame| {
        if let Ok(amount) = frame.read_f32() {
            recorded.borrow_mut().push(amount);
        }
    });
    class.implement_event(event, native);
    hits
}
