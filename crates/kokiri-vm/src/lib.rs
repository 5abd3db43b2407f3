//! Kokiri virtual machine: evaluates compiled rule chunks.
//!
//! The VM owns nothing but an operand stack. Identifier values and function
//! bindings come from a [`Resolver`] supplied per run, so one compiled rule
//! can be evaluated against any number of world states.

pub mod env;
pub mod error;
pub mod function;
pub mod options;
pub mod vm;

pub use env::{Environment, FunctionRef, Functions, Resolver, Scope};
pub use error::{VmError, VmResult};
pub use function::{CompiledFunction, Function, NativeFn, NativeFunction};
pub use options::VmOptions;
pub use vm::{truthy, Vm};
