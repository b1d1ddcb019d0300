use skbridge_script::{Parameter, ScriptClass};

use crate::binding::TypedName;
use crate::types::TypeBindings;

/// Compare a routine's parameters against an existing binding's
///
/// Order, names, script types and host byte sizes must all agree. Parameter
/// names count because host tooling shows them on graph nodes.
pub fn have_identical_signatures<T: AsRef<TypedName>>(
    params: &[Parameter],
    existing: &[T],
    types: &TypeBindings,
) -> bool {
    params.len() == existing.len()
        && params
            .iter()
            .zip(existing)
            .all(|(param, typed_name)| typed_name_matches(typed_name.as_ref(), &param.name, &param.class, types))
}

/// True if `typed_name` describes a slot named `name` holding `class`
pub fn typed_name_matches(typed_name: &TypedName, name: &str, class: &ScriptClass, types: &TypeBindings) -> bool {
    if typed_name.name != name || typed_name.script_type.name() != class.name() {
        return false;
    }

    types
        .layout(class)
        .is_some_and(|(kind, _)| kind.size() == typed_name.byte_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skbridge_reflect::Universe;
    use skbridge_script::{builtin, Routine, RoutineKind};
    use std::rc::Rc;

    struct Fixture {
        types: TypeBindings,
        integer: Rc<ScriptClass>,
        real: Rc<ScriptClass>,
    }

    fn fixture() -> Fixture {
        Fixture {
            types: TypeBindings::new(&Universe::new(), 16),
            integer: ScriptClass::new(builtin::INTEGER, None),
            real: ScriptClass::new(builtin::REAL, None),
        }
    }

    fn existing(f: &Fixture) -> Vec<TypedName> {
        vec![
            TypedName::new("a", 4, Rc::clone(&f.integer)),
            TypedName::new("b", 4, Rc::clone(&f.integer)),
        ]
    }

    #[test]
    fn test_identical() {
        let f = fixture();
        let routine = Routine::new("add", RoutineKind::Method)
            .with_param("a", &f.integer)
            .with_param("b", &f.integer);
        assert!(have_identical_signatures(routine.params(), &existing(&f), &f.types));
    }

    #[test]
    fn test_type_change_is_detected() {
        let f = fixture();
        let routine = Routine::new("add", RoutineKind::Method)
            .with_param("a", &f.integer)
            .with_param("b", &f.real);
        assert!(!have_identical_signatures(routine.params(), &existing(&f), &f.types));
    }

    #[test]
    fn test_rename_and_reorder_are_detected() {
        let f = fixture();
        let renamed = Routine::new("add", RoutineKind::Method)
            .with_param("a", &f.integer)
            .with_param("B", &f.integer);
        assert!(!have_identical_signatures(renamed.params(), &existing(&f), &f.types));

        let fewer = Routine::new("add", RoutineKind::Method).with_param("a", &f.integer);
        assert!(!have_identical_signatures(fewer.params(), &existing(&f), &f.types));
    }

    #[test]
    fn test_unsupported_type_never_matches() {
        let f = fixture();
        let object = ScriptClass::new(builtin::OBJECT, None);
        let existing = vec![TypedName::new("a", 4, Rc::clone(&object))];
        let routine = Routine::new("take", RoutineKind::Method).with_param("a", &object);
        assert!(!have_identical_signatures(routine.params(), &existing, &f.types));
    }
}
