//! Calls in both directions: host into generated functions, script events
//! out to host overrides, and coroutines started from the host.

mod common;

use common::{call, exposed_world, generated, record_hits, script_class, script_runtime};
use skbridge_reflect::{HostFunction, ObjectHandle, ParamBuffer};
use skbridge_script::{ScriptError, ScriptValue};

fn return_offset(function: &HostFunction) -> u32 {
    function.return_property().expect("function has a result").offset()
}

#[test]
fn test_class_method_returns_sum() {
    let mut world = exposed_world();
    let add = generated(&world.calculator, "add");

    let mut params = ParamBuffer::for_function(&add);
    params.write_i32(0, 3);
    params.write_i32(4, 4);

    assert!(call(&mut world, &add, ObjectHandle::NULL, &mut params));
    assert_eq!(params.read_i32(return_offset(&add)), 7);
}

#[test]
fn test_instance_method_returns_string() {
    let mut world = exposed_world();
    let hero = world.universe.spawn("hero", &world.actor);
    let greet = generated(&world.actor, "greet");

    let mut params = ParamBuffer::for_function(&greet);
    params.write_string(0, "Ada");

    assert!(call(&mut world, &greet, hero, &mut params));
    assert_eq!(params.read_string(return_offset(&greet)), "hello Ada");
}

#[test]
fn test_instance_method_on_destroyed_object_is_skipped() {
    let mut world = exposed_world();
    let hero = world.universe.spawn("hero", &world.actor);
    world.universe.destroy(hero);
    let greet = generated(&world.actor, "greet");

    let mut params = ParamBuffer::for_function(&greet);
    params.write_string(0, "Ada");

    assert!(call(&mut world, &greet, hero, &mut params));
    assert_eq!(params.read_string(return_offset(&greet)), "", "result left untouched");
}

#[test]
fn test_call_without_interface_context_is_ignored() {
    let world = exposed_world();
    let add = generated(&world.calculator, "add");

    let mut params = ParamBuffer::for_function(&add);
    params.write_i32(0, 3);
    params.write_i32(4, 4);

    assert!(world.universe.process_event(&mut (), &add, ObjectHandle::NULL, &mut params));
    assert_eq!(params.read_i32(return_offset(&add)), 0);
}

#[test]
fn test_event_without_override_is_dropped() {
    let mut world = exposed_world();
    let hero = world.universe.spawn("hero", &world.actor);
    let take_damage = generated(&world.actor, "take_damage");

    let mut params = ParamBuffer::for_function(&take_damage);
    params.write_f32(0, 12.5);

    assert!(call(&mut world, &take_damage, hero, &mut params));
}

#[test]
fn test_event_reaches_subclass_override() {
    let mut world = exposed_world();
    let stub = generated(&world.actor, "on_hit");
    let hits = record_hits(&world.pawn, &stub);

    let pawn = world.universe.spawn("pawn", &world.pawn);
    let hero = world.universe.spawn("hero", &world.actor);
    let take_damage = generated(&world.actor, "take_damage");

    let mut params = ParamBuffer::for_function(&take_damage);
    params.write_f32(0, 12.5);
    assert!(call(&mut world, &take_damage, pawn, &mut params));
    assert!(call(&mut world, &take_damage, hero, &mut params));

    assert_eq!(*hits.borrow(), vec![12.5], "only the overriding class records the hit");
}

#[test]
fn test_trigger_event_checks_receiver_class() {
    let mut world = exposed_world();
    let stub = generated(&world.actor, "on_hit");
    let hits = record_hits(&world.pawn, &stub);

    let pawn = world.universe.spawn("pawn", &world.pawn);
    let calculator = world.universe.spawn("calc", &world.calculator);
    let on_hit = script_class(&world, "Actor")
        .find_routine("on_hit", false)
        .expect("on_hit routine");

    let args = [ScriptValue::Real(3.0)];
    world
        .interface
        .trigger_event(&world.universe, &on_hit, &ScriptValue::Entity(calculator), &args);
    world
        .interface
        .trigger_event(&world.universe, &on_hit, &ScriptValue::Entity(pawn), &args);
    world
        .interface
        .trigger_event(&world.universe, &on_hit, &ScriptValue::Nil, &args);

    assert_eq!(*hits.borrow(), vec![3.0]);
}

#[test]
fn test_cleared_invokables_keep_functions_callable() {
    let mut world = exposed_world();
    let add = generated(&world.calculator, "add");
    world.interface.clear_all_sk_invokables();

    assert!(world.interface.is_skookum_blueprint_function(&add));

    let mut params = ParamBuffer::for_function(&add);
    params.write_i32(0, 3);
    params.write_i32(4, 4);
    assert!(call(&mut world, &add, ObjectHandle::NULL, &mut params));
    assert_eq!(params.read_i32(return_offset(&add)), 0, "no routine to call");
}

#[test]
fn test_reload_runtime_rebinds_existing_functions() {
    let mut world = exposed_world();
    let add = generated(&world.calculator, "add");
    let stub = generated(&world.actor, "on_hit");
    let hits = record_hits(&world.pawn, &stub);

    world
        .interface
        .reload_runtime(&world.universe, Box::new(script_runtime()));

    assert!(
        std::rc::Rc::ptr_eq(&add, &generated(&world.calculator, "add")),
        "host function survives the reload"
    );

    let mut params = ParamBuffer::for_function(&add);
    params.write_i32(0, 20);
    params.write_i32(4, 22);
    assert!(call(&mut world, &add, ObjectHandle::NULL, &mut params));
    assert_eq!(params.read_i32(return_offset(&add)), 42);

    let pawn = world.universe.spawn("pawn", &world.pawn);
    let take_damage = generated(&world.actor, "take_damage");
    let mut params = ParamBuffer::for_function(&take_damage);
    params.write_f32(0, 1.5);
    assert!(call(&mut world, &take_damage, pawn, &mut params));
    assert_eq!(*hits.borrow(), vec![1.5], "events fire through the new runtime");
}

#[test]
fn test_coroutine_completes_after_updates() {
    let mut world = exposed_world();
    let hero = world.universe.spawn("hero", &world.actor);
    let wait_ticks = generated(&world.actor, "wait_ticks");
    assert!(wait_ticks.return_property().is_none());

    let mut params = ParamBuffer::for_function(&wait_ticks);
    params.write_i32(0, 2);
    assert!(call(&mut world, &wait_ticks, hero, &mut params));
    assert_eq!(world.interface.pending_coroutines(), 1);

    world.interface.update(&world.universe);
    assert!(world.interface.poll_coroutines().is_empty(), "still waiting");

    world.interface.update(&world.universe);
    let finished = world.interface.poll_coroutines();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].routine_name, "Actor@wait_ticks");
    assert_eq!(
        finished[0].binding_index,
        wait_ticks.binding_index().expect("bound") as usize
    );
    assert!(matches!(finished[0].outcome, Ok(ScriptValue::Boolean(true))));
    assert_eq!(world.interface.pending_coroutines(), 0);
}

#[test]
fn test_clearing_invokables_abandons_coroutines() {
    let mut world = exposed_world();
    let hero = world.universe.spawn("hero", &world.actor);
    let wait_ticks = generated(&world.actor, "wait_ticks");

    let mut params = ParamBuffer::for_function(&wait_ticks);
    params.write_i32(0, 5);
    assert!(call(&mut world, &wait_ticks, hero, &mut params));
    assert_eq!(world.interface.pending_coroutines(), 1);

    world.interface.clear_all_sk_invokables();
    assert_eq!(world.interface.pending_coroutines(), 0);

    world.interface.update(&world.universe);
    assert!(world.interface.poll_coroutines().is_empty());
}

#[test]
fn test_coroutine_finishing_immediately_is_reported() {
    let mut world = exposed_world();
    let hero = world.universe.spawn("hero", &world.actor);
    let wait_ticks = generated(&world.actor, "wait_ticks");

    let mut params = ParamBuffer::for_function(&wait_ticks);
    params.write_i32(0, 0);
    assert!(call(&mut world, &wait_ticks, hero, &mut params));

    let finished = world.interface.poll_coroutines();
    assert_eq!(finished.len(), 1);
    assert!(!matches!(finished[0].outcome, Err(ScriptError::Cancelled { .. })));
}
