//! Identifier resolution.
//!
//! There are exactly two scopes: the parameters of the function currently
//! being built, then the module's globals. There is no chain of enclosing
//! environments, so a nested lambda cannot see its parent's parameters.
use crate::ir::{FunctionId, Module, Value};

/// Where an identifier was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Parameter(Value),
    Global(Value),
}

impl Resolution {
    pub fn value(self) -> Value {
        match self {
            Self::Parameter(value) | Self::Global(value) => value,
        }
    }
}

/// Looks `name` up among the parameters of `function` (if any), then among
/// the globals of `module`. Parameters shadow globals.
pub fn resolve(module: &Module, function: Option<FunctionId>, name: &str) -> Option<Resolution> {
    let param = function.and_then(|function| {
        module
            .params(function)
            .find(|(param, _)| *param == name)
            .map(|(_, value)| value)
    });
    match param {
        Some(value) => Some(Resolution::Parameter(value)),
        None => module.global(name).map(Resolution::Global),
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve, Resolution};
    use crate::ir::{Module, Value};
    use assert2::{check, let_assert};

    #[test]
    fn parameters_shadow_globals() {
        let mut module = Module::new("test");
        let_assert!(Ok(global_x) = module.add_global("x", Value::Const(1.0)));
        let_assert!(Ok(global_y) = module.add_global("y", Value::Const(2.0)));
        let func = module.add_function(&["x"]);
        let_assert!(Some((_, param_x)) = module.params(func).next());

        check!(resolve(&module, Some(func), "x") == Some(Resolution::Parameter(param_x)));
        check!(resolve(&module, Some(func), "y") == Some(Resolution::Global(global_y)));
        check!(resolve(&module, None, "x") == Some(Resolution::Global(global_x)));
        check!(resolve(&module, Some(func), "z").is_none());
    }

    #[test]
    fn functions_are_not_in_scope() {
        let mut module = Module::new("test");
        let func = Value::Function(module.add_function(&[] as &[&str]));
        let_assert!(Ok(()) = module.set_name(func, "f"));
        check!(resolve(&module, None, "f").is_none());
    }
}
