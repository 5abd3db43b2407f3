//! Kokiri code generator: lowers rule expression trees to bytecode.
//!
//! # Pipeline
//!
//! 1. **Rewrite**: calls to compiler intrinsics registered in the
//!    [`SymbolTable`] are replaced by whatever tree the intrinsic returns.
//!    Calls to any other name are left alone and resolved by the VM.
//! 2. **Fold**: optional constant folding of literal sub-expressions.
//! 3. **Emit**: a tree walk producing a [`Chunk`]: flat bytecode plus a
//!    constant pool of packed values and a table of names.
//!
//! Short-circuiting `and`/`or` is spelled out with conditional jumps, so a
//! chunk fully determines evaluation order.

pub mod chunk;
pub mod compiler;
pub mod error;
pub mod fingerprint;
pub mod fold;
pub mod intrinsics;
pub mod opcode;
pub mod symbols;

pub use chunk::{Chunk, ChunkBuilder, Instruction, JumpPatch};
pub use compiler::{CompileOptions, Compiler};
pub use error::{CompileError, CompileResult};
pub use fingerprint::{fingerprint, Fingerprint};
pub use intrinsics::{define_macro, register_standard_intrinsics};
pub use opcode::{OpInfo, Opcode, OPCODES};
pub use symbols::{Intrinsic, Symbol, SymbolKind, SymbolState, SymbolTable};
