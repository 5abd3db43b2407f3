//! Function values the VM can dispatch to.

use std::fmt;
use std::sync::Arc;

use kokiri_codegen::Chunk;
use kokiri_types::Packed;

use crate::env::Scope;

/// Host-supplied implementation behind a [`NativeFunction`].
pub type NativeFn = Arc<dyn Fn(&[Packed]) -> Result<Packed, String> + Send + Sync>;

#[derive(Debug, Clone)]
pub enum Function {
    Compiled(CompiledFunction),
    Native(NativeFunction),
}

/// A chunk produced by `Compiler::compile_function`, closed over the scope
/// it was defined in.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub name: String,
    pub params: Vec<String>,
    pub chunk: Arc<Chunk>,
    pub captured: Arc<Scope>,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    call: NativeFn,
}

impl NativeFunction {
    pub fn invoke(&self, args: &[Packed]) -> Result<Packed, String> {
        (self.call)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl Function {
    pub fn native<F>(name: impl Into<String>, arity: usize, call: F) -> Self
    where
        F: Fn(&[Packed]) -> Result<Packed, String> + Send + Sync + 'static,
    {
        Function::Native(NativeFunction {
            name: name.into(),
            arity,
            call: Arc::new(call),
        })
    }

    pub fn compiled(
        name: impl Into<String>,
        params: Vec<String>,
        chunk: Arc<Chunk>,
        captured: Arc<Scope>,
    ) -> Self {
        Function::Compiled(CompiledFunction {
            name: name.into(),
            params,
            chunk,
            captured,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Function::Compiled(f) => &f.name,
            Function::Native(f) => &f.name,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::Compiled(f) => f.params.len(),
            Function::Native(f) => f.arity,
        }
    }
}
