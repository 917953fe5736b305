use tracing::trace;

use super::{BackendError, BlockId, FloatOpcode, FunctionId, Module, Op, Value};

/// A position at the end of one block of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InsertPoint {
    pub function: FunctionId,
    pub block: BlockId,
}

/// Appends instructions at its insertion point.
///
/// The insertion point is the builder's only state. Code that lowers a nested
/// function should go through [`Builder::with_insertion_point`] so the
/// enclosing function's position is restored afterwards.
#[derive(Debug, Default, Clone)]
pub struct Builder {
    insertion: Option<InsertPoint>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insertion_point(&self) -> Option<InsertPoint> {
        self.insertion
    }

    pub fn position_at_end(&mut self, point: InsertPoint) {
        self.insertion = Some(point);
    }

    pub fn clear_insertion_point(&mut self) {
        self.insertion = None;
    }

    /// Runs `f` with the insertion point moved to `point`, then puts the
    /// previous one back.
    pub fn with_insertion_point<T>(
        &mut self,
        point: InsertPoint,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = self.insertion.replace(point);
        let result = f(self);
        self.insertion = saved;
        result
    }

    /// Builds `lhs <opcode> rhs`. Two constants fold to a constant without
    /// touching the module.
    pub fn build_float_op(
        &mut self,
        module: &mut Module,
        opcode: FloatOpcode,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, BackendError> {
        if !lhs.is_numeric() || !rhs.is_numeric() {
            return Err(BackendError::NotANumber);
        }
        if let (Value::Const(lhs), Value::Const(rhs)) = (lhs, rhs) {
            return Ok(Value::Const(opcode.fold(lhs, rhs)));
        }

        let point = self
            .insertion
            .ok_or(BackendError::NoInsertionPoint(opcode.result_name()))?;
        trace!(%opcode, ?point, "emitting float op");
        module.push_instruction(
            point,
            Some(opcode.result_name()),
            Op::Float { opcode, lhs, rhs },
        )
    }

    pub fn build_ret(&mut self, module: &mut Module, value: Value) -> Result<(), BackendError> {
        if !value.is_numeric() {
            return Err(BackendError::NotANumber);
        }
        let point = self.insertion.ok_or(BackendError::NoInsertionPoint("ret"))?;
        trace!(?point, "emitting ret");
        module.push_instruction(point, None, Op::Ret(value))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Builder;
    use crate::ir::{BackendError, FloatOpcode, Module, Op, Value};
    use assert2::{check, let_assert};

    #[test]
    fn constants_fold() {
        let mut module = Module::new("test");
        let mut builder = Builder::new();
        let folded = builder.build_float_op(
            &mut module,
            FloatOpcode::FMul,
            Value::Const(3.0),
            Value::Const(4.0),
        );
        check!(folded == Ok(Value::Const(12.0)));
        check!(module.functions().count() == 0);
    }

    #[test]
    fn instructions_need_insertion_point() {
        let mut module = Module::new("test");
        let_assert!(Ok(x) = module.add_global("x", Value::Const(1.0)));
        let mut builder = Builder::new();
        check!(
            builder.build_float_op(&mut module, FloatOpcode::FAdd, x, Value::Const(1.0))
                == Err(BackendError::NoInsertionPoint("addOp"))
        );
        check!(builder.build_ret(&mut module, x) == Err(BackendError::NoInsertionPoint("ret")));
    }

    #[test]
    fn names_are_uniquified_per_function() {
        let mut module = Module::new("test");
        let func = module.add_function(&["a"]);
        let_assert!(Ok(entry) = module.append_block(func, "entry"));
        let_assert!(Some((_, a)) = module.params(func).next());

        let mut builder = Builder::new();
        builder.position_at_end(entry);
        let_assert!(Ok(first) = builder.build_float_op(&mut module, FloatOpcode::FAdd, a, a));
        let_assert!(Ok(second) = builder.build_float_op(&mut module, FloatOpcode::FAdd, first, a));
        check!(module.value_name(first) == Some("addOp"));
        check!(module.value_name(second) == Some("addOp1"));

        let_assert!(Ok(()) = builder.build_ret(&mut module, second));
        check!(
            builder.build_float_op(&mut module, FloatOpcode::FSub, a, a)
                == Err(BackendError::BlockTerminated)
        );
        let ops: Vec<_> = module.instructions(func).map(|inst| *inst.op()).collect();
        check!(ops.len() == 3);
        check!(ops[2] == Op::Ret(second));
    }

    #[test]
    fn scoped_insertion_point_is_restored() {
        let mut module = Module::new("test");
        let outer = module.add_function(&[] as &[&str]);
        let inner = module.add_function(&[] as &[&str]);
        let_assert!(Ok(outer_entry) = module.append_block(outer, "entry"));
        let_assert!(Ok(inner_entry) = module.append_block(inner, "entry"));

        let mut builder = Builder::new();
        builder.position_at_end(outer_entry);
        let seen = builder.with_insertion_point(inner_entry, |b| b.insertion_point());
        check!(seen == Some(inner_entry));
        check!(builder.insertion_point() == Some(outer_entry));

        builder.clear_insertion_point();
        builder.with_insertion_point(inner_entry, |_| ());
        check!(builder.insertion_point().is_none());
    }

    #[test]
    fn functions_are_not_numbers() {
        let mut module = Module::new("test");
        let func = Value::Function(module.add_function(&[] as &[&str]));
        let mut builder = Builder::new();
        check!(
            builder.build_float_op(&mut module, FloatOpcode::FAdd, func, Value::Const(1.0))
                == Err(BackendError::NotANumber)
        );
    }
}
