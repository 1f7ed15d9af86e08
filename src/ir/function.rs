//! Basic blocks, functions and the module that holds them.

use std::sync::Arc;

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    ir::{
        builder::FunctionBuilder,
        instruction::Instruction,
        types::Type,
        value::{Constant, GlobalRef, Local},
        BlockId,
        ValueId,
    },
};

/// A maximal straight-line sequence of instructions ending in a terminator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicBlock {
    /// The index of the block within its function.
    pub id: BlockId,

    /// The label of the block.
    pub label: Arc<str>,

    /// The name of the function that contains the block.
    pub parent: Arc<str>,

    /// The instructions of the block, PHI nodes first and the terminator
    /// last.
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Gets the terminator of the block.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    /// Gets the blocks that control can transfer to from this block.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator()
            .map(Instruction::successors)
            .unwrap_or_default()
    }

    /// Gets the PHI nodes at the start of the block.
    pub fn phis(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().take_while(|i| i.is_phi())
    }

    /// Gets the instruction at `index`.
    #[must_use]
    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Checks that the block is well formed: a terminator ends the block and
    /// appears nowhere else.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] located at the offending instruction if the block is
    /// malformed.
    pub fn validate(&self) -> Result<()> {
        let location = self.instructions.last().map_or(0, |i| i.id.0);
        if self.terminator().is_none() {
            return Err(Error::NoTerminator { block: self.id.0 }).locate(location);
        }
        if let Some(early) = self.instructions[..self.instructions.len() - 1]
            .iter()
            .find(|i| i.is_terminator())
        {
            return Err(Error::NoTerminator { block: self.id.0 }).locate(early.id.0);
        }

        Ok(())
    }
}

/// A function definition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Function {
    pub name:        Arc<str>,
    pub params:      Vec<Local>,
    pub return_type: Type,
    pub blocks:      Vec<BasicBlock>,
}

impl Function {
    /// Gets the block with the identifier `id`.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// Gets the block with the provided `label`.
    #[must_use]
    pub fn block_by_label(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label.as_ref() == label)
    }

    /// Gets the entry block of the function.
    #[must_use]
    pub fn entry(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    /// Gets the instruction with the identifier `id`.
    #[must_use]
    pub fn instruction(&self, id: ValueId) -> Option<&Instruction> {
        self.blocks
            .iter()
            .flat_map(|b| b.instructions.iter())
            .find(|i| i.id == id)
    }
}

/// A global variable definition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Global {
    /// The reference through which the global's address is used.
    pub reference: GlobalRef,

    /// The type of the value stored in the global.
    pub value_type: Type,

    /// The initial contents of the global, if it is defined in this module.
    pub initializer: Option<Constant>,

    /// Whether the global is never written.
    pub is_constant: bool,
}

/// A translation unit: global variables and functions.
///
/// The module hands out the [`ValueId`]s for every value defined in it, so
/// identifiers are unique module-wide.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Module {
    name:      String,
    globals:   Vec<Global>,
    functions: Vec<Function>,
    next_id:   u32,
}

impl Module {
    /// Creates an empty module named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Gets the name of the module.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets a fresh value identifier.
    pub fn fresh_id(&mut self) -> ValueId {
        let id = ValueId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds a global variable holding a value of `value_type`, returning the
    /// constant that denotes its address.
    pub fn add_global(
        &mut self,
        name: &str,
        value_type: Type,
        initializer: Option<Constant>,
        is_constant: bool,
    ) -> Constant {
        let reference = GlobalRef {
            id:   self.fresh_id(),
            name: name.into(),
        };
        self.globals.push(Global {
            reference: reference.clone(),
            value_type,
            initializer,
            is_constant,
        });

        Constant::Global(reference)
    }

    /// Starts building a function named `name` with the given parameters.
    ///
    /// The function is added to the module when the builder is finished.
    pub fn build_function(
        &mut self,
        name: &str,
        params: &[(&str, Type)],
        return_type: Type,
    ) -> FunctionBuilder<'_> {
        FunctionBuilder::new(self, name, params, return_type)
    }

    /// Adds a completed function to the module.
    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    /// Gets the global variables of the module.
    #[must_use]
    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// Gets the global named `name`.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.reference.name.as_ref() == name)
    }

    /// Gets the functions defined in the module.
    #[must_use]
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Gets the function named `name`, if it is defined in the module.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name.as_ref() == name)
    }

    /// Gets the names of every function that is defined in the module or
    /// whose address is taken, in first-use order.
    ///
    /// These are the functions that need an address in memory.
    #[must_use]
    pub fn referenced_functions(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.functions.iter().map(|f| f.name.clone()).collect();
        let mut add = |name: &Arc<str>| {
            if !names.contains(name) {
                names.push(name.clone());
            }
        };
        for global in &self.globals {
            if let Some(init) = &global.initializer {
                collect_function_refs(init, &mut add);
            }
        }
        for inst in self.functions.iter().flat_map(|f| &f.blocks).flat_map(|b| &b.instructions) {
            for operand in inst.kind.operands() {
                if let Some(constant) = operand.as_constant() {
                    collect_function_refs(constant, &mut add);
                }
            }
        }

        names
    }
}

/// Calls `add` on the name of every function referenced by `constant`.
fn collect_function_refs(constant: &Constant, add: &mut impl FnMut(&Arc<str>)) {
    match constant {
        Constant::Function(name) => add(name),
        Constant::Aggregate { elements, .. } => {
            elements.iter().for_each(|e| collect_function_refs(e, add));
        }
        Constant::Expr(expr) => {
            expr.operands().into_iter().for_each(|e| collect_function_refs(e, add));
        }
        _ => (),
    }
}
