//! Lowers parsed expressions into the [`ir`](crate::ir) backend.
//!
//! For example:
//!
//! (define scale (lambda (x) (* x factor)))
//!
//! with a global `factor` already defined, becomes
//!
//! define double @scale(double %x) {
//! entry:
//!   %mulOp = fmul double %x, @factor
//!   ret double %mulOp
//! }
use tracing::debug;

use crate::{
    ir::{BackendError, Builder, FloatOpcode, Module, Value},
    lexer::tokenize,
    parser::{parse_program, BinaryOperator, Expr},
};

pub mod scope;

#[derive(thiserror::Error, Debug, PartialEq, Clone)]
pub enum CodegenError {
    #[error("unresolved identifier `{0}`")]
    UnresolvedIdentifier(Box<str>),
    #[error("parameter `{0}` is repeated")]
    DuplicateParameter(Box<str>),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<BinaryOperator> for FloatOpcode {
    fn from(op: BinaryOperator) -> Self {
        match op {
            BinaryOperator::Add => Self::FAdd,
            BinaryOperator::Sub => Self::FSub,
            BinaryOperator::Mul => Self::FMul,
            BinaryOperator::Div => Self::FDiv,
        }
    }
}

/// Lowers one expression, returning the value it produces.
///
/// Operands are lowered left before right. A `define` of a lambda names the
/// function itself; any other `define` becomes a global.
pub fn lower(expr: &Expr, module: &mut Module, builder: &mut Builder) -> Result<Value, CodegenError> {
    match expr {
        Expr::Number(value) => Ok(Value::constant(*value)),
        Expr::BinaryOp { op, lhs, rhs } => {
            let lhs = lower(lhs, module, builder)?;
            let rhs = lower(rhs, module, builder)?;
            Ok(builder.build_float_op(module, FloatOpcode::from(*op), lhs, rhs)?)
        }
        Expr::Lambda { params, body } => lower_lambda(params, body, module, builder),
        Expr::Define { name, value } => {
            let value = lower(value, module, builder)?;
            if module.is_function(value) {
                module.set_name(value, name)?;
                debug!(%name, "defined function");
                Ok(value)
            } else {
                let global = module.add_global(name, value)?;
                debug!(%name, "defined global");
                Ok(global)
            }
        }
        Expr::Identifier(name) => {
            let function = builder.insertion_point().map(|point| point.function);
            scope::resolve(module, function, name)
                .map(scope::Resolution::value)
                .ok_or_else(|| CodegenError::UnresolvedIdentifier(name.clone()))
        }
    }
}

fn lower_lambda(
    params: &[Box<str>],
    body: &Expr,
    module: &mut Module,
    builder: &mut Builder,
) -> Result<Value, CodegenError> {
    for (index, param) in params.iter().enumerate() {
        if params[..index].contains(param) {
            return Err(CodegenError::DuplicateParameter(param.clone()));
        }
    }

    let function = module.add_function(params);
    let entry = module.append_block(function, "entry")?;

    builder.with_insertion_point(entry, |builder| -> Result<Value, CodegenError> {
        let result = lower(body, module, builder)?;
        builder.build_ret(module, result)?;
        Ok(Value::Function(function))
    })
}

/// One module that outlives many inputs, as in an interactive session.
///
/// Each call to [`Session::compile`] either applies completely or leaves the
/// module exactly as it was.
#[derive(Debug)]
pub struct Session {
    module: Module,
}

impl Session {
    pub fn new(module_name: impl AsRef<str>) -> Self {
        Self::with_module(Module::new(module_name))
    }

    pub fn with_module(module: Module) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    /// Lexes, parses and lowers every top-level expression of `source`.
    pub fn compile(&mut self, source: &str) -> Result<Vec<Value>, crate::Error> {
        let tokens = tokenize(source)?;
        let exprs = parse_program(&tokens)?;
        Ok(self.lower_all(&exprs)?)
    }

    /// Lowers `exprs` in order with a fresh [`Builder`] each.
    ///
    /// Definitions and lambdas are lowered as they are. Any other expression is
    /// wrapped in an anonymous function without parameters that returns it.
    pub fn lower_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, CodegenError> {
        let checkpoint = self.module.checkpoint();
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match self.lower_top_level(expr) {
                Ok(value) => values.push(value),
                Err(err) => {
                    debug!(%err, "rolling back module");
                    self.module.rollback(checkpoint);
                    return Err(err);
                }
            }
        }
        Ok(values)
    }

    fn lower_top_level(&mut self, expr: &Expr) -> Result<Value, CodegenError> {
        let mut builder = Builder::new();
        match expr {
            Expr::Define { .. } | Expr::Lambda { .. } => lower(expr, &mut self.module, &mut builder),
            _ => {
                let thunk = Expr::Lambda {
                    params: Box::new([]),
                    body: Box::new(expr.clone()),
                };
                lower(&thunk, &mut self.module, &mut builder)
            }
        }
    }
}
