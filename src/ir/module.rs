use core::fmt;
use std::collections::{HashMap, HashSet};

use lasso::{Rodeo, Spur};

use super::{
    fmt_float, BackendError, BlockId, FunctionId, GlobalId, InsertPoint, Instruction, Op, Target,
    Value,
};

// Globals and functions share one namespace, as in LLVM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Global(GlobalId),
    Function(FunctionId),
}

#[derive(Debug, Clone)]
struct Global {
    name: Spur,
    initializer: f64,
}

#[derive(Debug, Clone, Default)]
struct Function {
    /// `None` until a definition names it
    name: Option<Spur>,
    params: Vec<Box<str>>,
    blocks: Vec<Block>,
    instructions: Vec<Instruction>,
    local_names: HashSet<Box<str>>,
}

impl Function {
    fn unique_local_name(&mut self, base: &str) -> Box<str> {
        let mut name = Box::from(base);
        let mut suffix = 0usize;
        while self.local_names.contains(&name) {
            suffix += 1;
            name = Box::from(format!("{base}{suffix}").as_str());
        }
        self.local_names.insert(name.clone());
        name
    }
}

#[derive(Debug, Clone)]
struct Block {
    label: Box<str>,
    instructions: Vec<u32>,
}

/// Marks a state of a [`Module`] that can be returned to with [`Module::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    globals: usize,
    functions: usize,
}

/// Accumulates globals and functions, possibly across many inputs.
#[derive(Debug)]
pub struct Module {
    name: Box<str>,
    target: Option<Target>,
    interner: Rodeo,
    symbols: HashMap<Spur, Symbol>,
    globals: Vec<Global>,
    functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Box::from(name.as_ref()),
            target: None,
            interner: Rodeo::default(),
            symbols: HashMap::new(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = Some(target);
    }

    fn lookup(&self, name: &str) -> Option<Symbol> {
        let spur = self.interner.get(name)?;
        self.symbols.get(&spur).copied()
    }

    fn define_symbol(&mut self, name: &str, symbol: Symbol) -> Result<Spur, BackendError> {
        if self.lookup(name).is_some() {
            return Err(BackendError::DuplicateSymbol(Box::from(name)));
        }
        let spur = self.interner.get_or_intern(name);
        self.symbols.insert(spur, symbol);
        Ok(spur)
    }

    /// Adds a global `double` named `name`.
    ///
    /// The initializer must be a constant, or another global whose value is copied.
    pub fn add_global(&mut self, name: &str, initializer: Value) -> Result<Value, BackendError> {
        let initializer = match initializer {
            Value::Const(value) => value,
            Value::Global(id) => self
                .global_initializer(id)
                .ok_or(BackendError::Dangling("global"))?,
            _ => return Err(BackendError::NonConstantInitializer(Box::from(name))),
        };
        let id = GlobalId(self.globals.len() as u32);
        let name = self.define_symbol(name, Symbol::Global(id))?;
        self.globals.push(Global { name, initializer });
        Ok(Value::Global(id))
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        match self.lookup(name)? {
            Symbol::Global(id) => Some(Value::Global(id)),
            Symbol::Function(_) => None,
        }
    }

    pub fn global_initializer(&self, global: GlobalId) -> Option<f64> {
        self.globals
            .get(global.0 as usize)
            .map(|global| global.initializer)
    }

    pub fn function(&self, name: &str) -> Option<Value> {
        match self.lookup(name)? {
            Symbol::Function(id) => Some(Value::Function(id)),
            Symbol::Global(_) => None,
        }
    }

    /// Adds an anonymous function taking one `double` per entry of `params`
    /// and returning a `double`. It has no blocks yet.
    pub fn add_function(&mut self, params: &[impl AsRef<str>]) -> FunctionId {
        let mut function = Function::default();
        for param in params {
            let name = function.unique_local_name(param.as_ref());
            function.params.push(name);
        }
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    pub fn append_block(
        &mut self,
        function: FunctionId,
        label: &str,
    ) -> Result<InsertPoint, BackendError> {
        let func = self
            .functions
            .get_mut(function.0 as usize)
            .ok_or(BackendError::Dangling("function"))?;
        let block = BlockId(func.blocks.len() as u32);
        func.blocks.push(Block {
            label: Box::from(label),
            instructions: Vec::new(),
        });
        Ok(InsertPoint { function, block })
    }

    /// The parameters of `function`, by name, in declaration order.
    pub fn params(&self, function: FunctionId) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.functions
            .get(function.0 as usize)
            .into_iter()
            .flat_map(move |func| {
                func.params.iter().enumerate().map(move |(index, name)| {
                    (
                        name.as_ref(),
                        Value::Param {
                            function,
                            index: index as u32,
                        },
                    )
                })
            })
    }

    pub fn is_function(&self, value: Value) -> bool {
        matches!(value, Value::Function(id) if (id.0 as usize) < self.functions.len())
    }

    pub fn value_name(&self, value: Value) -> Option<&str> {
        match value {
            Value::Const(_) => None,
            Value::Param { function, index } => self
                .functions
                .get(function.0 as usize)?
                .params
                .get(index as usize)
                .map(AsRef::as_ref),
            Value::Instruction { function, index } => self
                .functions
                .get(function.0 as usize)?
                .instructions
                .get(index as usize)?
                .name(),
            Value::Global(id) => Some(self.interner.resolve(&self.globals.get(id.0 as usize)?.name)),
            Value::Function(id) => {
                let name = self.functions.get(id.0 as usize)?.name.as_ref()?;
                Some(self.interner.resolve(name))
            }
        }
    }

    /// Renames a global or function, releasing its previous name.
    pub fn set_name(&mut self, value: Value, name: &str) -> Result<(), BackendError> {
        let symbol = match value {
            Value::Global(id) if (id.0 as usize) < self.globals.len() => Symbol::Global(id),
            Value::Function(id) if (id.0 as usize) < self.functions.len() => Symbol::Function(id),
            Value::Global(_) | Value::Function(_) => return Err(BackendError::Dangling("symbol")),
            _ => return Err(BackendError::Unnameable),
        };
        match self.lookup(name) {
            Some(existing) if existing == symbol => return Ok(()),
            Some(_) => return Err(BackendError::DuplicateSymbol(Box::from(name))),
            None => {}
        }

        let spur = self.interner.get_or_intern(name);
        let previous = match symbol {
            Symbol::Global(id) => Some(std::mem::replace(
                &mut self.globals[id.0 as usize].name,
                spur,
            )),
            Symbol::Function(id) => self.functions[id.0 as usize].name.replace(spur),
        };
        if let Some(previous) = previous {
            self.symbols.remove(&previous);
        }
        self.symbols.insert(spur, symbol);
        Ok(())
    }

    pub(crate) fn push_instruction(
        &mut self,
        point: InsertPoint,
        name: Option<&str>,
        op: Op,
    ) -> Result<Value, BackendError> {
        let function = self
            .functions
            .get_mut(point.function.0 as usize)
            .ok_or(BackendError::Dangling("function"))?;
        let block = function
            .blocks
            .get(point.block.0 as usize)
            .ok_or(BackendError::Dangling("block"))?;
        let terminated = block
            .instructions
            .last()
            .is_some_and(|&index| function.instructions[index as usize].op.is_terminator());
        if terminated {
            return Err(BackendError::BlockTerminated);
        }

        let name = name.map(|name| function.unique_local_name(name));
        let index = function.instructions.len() as u32;
        function.instructions.push(Instruction { name, op });
        function.blocks[point.block.0 as usize]
            .instructions
            .push(index);
        Ok(Value::Instruction {
            function: point.function,
            index,
        })
    }

    /// Instructions of `function` in block order.
    pub fn instructions(&self, function: FunctionId) -> impl Iterator<Item = &Instruction> + '_ {
        self.functions
            .get(function.0 as usize)
            .into_iter()
            .flat_map(|func| {
                func.blocks.iter().flat_map(move |block| {
                    block
                        .instructions
                        .iter()
                        .map(move |&index| &func.instructions[index as usize])
                })
            })
    }

    pub fn functions(&self) -> impl Iterator<Item = FunctionId> {
        (0..self.functions.len() as u32).map(FunctionId)
    }

    pub fn globals(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.globals
            .iter()
            .map(|global| (self.interner.resolve(&global.name), global.initializer))
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            globals: self.globals.len(),
            functions: self.functions.len(),
        }
    }

    /// Drops every global and function added since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.globals.truncate(checkpoint.globals);
        self.functions.truncate(checkpoint.functions);
        self.symbols.retain(|_, symbol| match symbol {
            Symbol::Global(id) => (id.0 as usize) < checkpoint.globals,
            Symbol::Function(id) => (id.0 as usize) < checkpoint.functions,
        });
    }

    fn function_label(&self, id: FunctionId) -> String {
        match self.functions[id.0 as usize].name.as_ref() {
            Some(name) => format!("@{}", self.interner.resolve(name)),
            None => {
                // unnamed functions are numbered in order, as LLVM does
                let slot = self.functions[..id.0 as usize]
                    .iter()
                    .filter(|func| func.name.is_none())
                    .count();
                format!("@{slot}")
            }
        }
    }

    /// Renders `value` as an operand.
    pub fn display_value(&self, value: Value) -> String {
        match value {
            Value::Const(value) => fmt_float(value),
            Value::Function(id) if (id.0 as usize) < self.functions.len() => {
                self.function_label(id)
            }
            Value::Global(_) => format!("@{}", self.value_name(value).unwrap_or("?")),
            _ => format!("%{}", self.value_name(value).unwrap_or("?")),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        if let Some(target) = self.target() {
            writeln!(f, "target triple = \"{}\"", target.triple())?;
        }
        // every defined function shares one attribute group carrying the target
        let attributes = if self.target.is_some() { " #0" } else { "" };
        let mut defined_any = false;

        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for (name, initializer) in self.globals() {
            writeln!(f, "@{name} = global double {}", fmt_float(initializer))?;
        }

        for id in self.functions() {
            let func = &self.functions[id.0 as usize];
            let params = func
                .params
                .iter()
                .map(|param| format!("double %{param}"))
                .collect::<Vec<_>>()
                .join(", ");

            writeln!(f)?;
            if func.blocks.is_empty() {
                writeln!(f, "declare double {}({params})", self.function_label(id))?;
                continue;
            }
            writeln!(
                f,
                "define double {}({params}){attributes} {{",
                self.function_label(id)
            )?;
            defined_any = true;
            for block in &func.blocks {
                writeln!(f, "{}:", block.label)?;
                for &index in &block.instructions {
                    let inst = &func.instructions[index as usize];
                    match inst.op {
                        Op::Float { opcode, lhs, rhs } => writeln!(
                            f,
                            "  %{} = {opcode} double {}, {}",
                            inst.name().unwrap_or("?"),
                            self.display_value(lhs),
                            self.display_value(rhs)
                        )?,
                        Op::Ret(value) => {
                            writeln!(f, "  ret double {}", self.display_value(value))?
                        }
                    }
                }
            }
            writeln!(f, "}}")?;
        }

        if let Some(target) = self.target().filter(|_| defined_any) {
            write!(f, "\nattributes #0 = {{ \"target-cpu\"=\"{}\"", target.cpu())?;
            if !target.features().is_empty() {
                write!(f, " \"target-features\"=\"{}\"", target.features())?;
            }
            writeln!(f, " }}")?;
        }
        Ok(())
    }
}
