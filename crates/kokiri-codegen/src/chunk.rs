//! Bytecode chunks and the builder that emits them.

use indexmap::IndexSet;
use kokiri_types::{Packed, Span};

use crate::error::{CompileError, CompileResult};
use crate::opcode::Opcode;

/// A compiled rule: bytecode, its constant pool and its name table.
///
/// Chunks are immutable once built and are shared read-only between any
/// number of evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub name: String,
    pub code: Vec<u8>,
    pub constants: Vec<Packed>,
    /// Identifier and function names referenced by `LOAD_IDENT` and calls.
    pub names: Vec<String>,
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: Opcode,
    /// Pool index, name index or jump target; zero when unused.
    pub operand: u16,
    /// Argument count, only meaningful for `CALL_N`.
    pub argc: u8,
}

impl Instruction {
    pub fn next_offset(&self) -> usize {
        self.offset + self.opcode.width()
    }
}

impl Chunk {
    /// Decode the instruction at `offset`, or `None` if the bytes there are
    /// not a complete, known instruction.
    pub fn decode(&self, offset: usize) -> Option<Instruction> {
        let opcode = Opcode::from_byte(*self.code.get(offset)?)?;
        let operands = self.code.get(offset + 1..offset + opcode.width())?;
        let operand = match operands {
            [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
            _ => 0,
        };
        let argc = match (opcode, operands) {
            (Opcode::CallN, [_, _, argc]) => *argc,
            _ => 0,
        };
        Some(Instruction {
            offset,
            opcode,
            operand,
            argc,
        })
    }

    /// Decoded instructions in code order. Stops early at malformed bytes.
    pub fn instructions(&self) -> impl Iterator<Item = Instruction> + '_ {
        let mut offset = 0;
        std::iter::from_fn(move || {
            let inst = self.decode(offset)?;
            offset = inst.next_offset();
            Some(inst)
        })
    }

    /// The value of a chunk that does nothing but return a constant.
    ///
    /// Rules like `True` compile to `LOAD_CONST k; RETURN`; callers can skip
    /// the VM for them.
    pub fn constant_result(&self) -> Option<Packed> {
        match self.code.as_slice() {
            [load, lo, hi, ret]
                if *load == Opcode::LoadConst as u8 && *ret == Opcode::Return as u8 =>
            {
                self.constants
                    .get(u16::from_le_bytes([*lo, *hi]) as usize)
                    .copied()
            }
            _ => None,
        }
    }

    pub fn name_at(&self, index: u16) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    /// One instruction per line, for diagnostics.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for inst in self.instructions() {
            out.push_str(&format!("{:04} {}", inst.offset, inst.opcode));
            match inst.opcode {
                Opcode::LoadConst => {
                    let value = self.constants.get(inst.operand as usize);
                    out.push_str(&format!(" {} ({:?})", inst.operand, value));
                }
                Opcode::LoadIdent | Opcode::Call0 | Opcode::Call1 | Opcode::Call2 => {
                    let name = self.name_at(inst.operand).unwrap_or("?");
                    out.push_str(&format!(" {} ({name})", inst.operand));
                }
                Opcode::CallN => {
                    let name = self.name_at(inst.operand).unwrap_or("?");
                    out.push_str(&format!(" {} ({name}) argc={}", inst.operand, inst.argc));
                }
                op if op.is_jump() => out.push_str(&format!(" -> {:04}", inst.operand)),
                _ => {}
            }
            out.push('\n');
        }
        out
    }
}

/// Placeholder for a jump whose target is not known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a jump must be patched"]
pub struct JumpPatch(usize);

/// Appends instructions to a chunk under construction.
///
/// Constants and names are de-duplicated, so a pool never holds the same
/// value twice.
#[derive(Debug)]
pub struct ChunkBuilder {
    name: String,
    code: Vec<u8>,
    constants: IndexSet<Packed>,
    names: IndexSet<String>,
}

impl ChunkBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: Vec::new(),
            constants: IndexSet::new(),
            names: IndexSet::new(),
        }
    }

    /// Offset the next instruction will be written at.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    pub fn emit(&mut self, op: Opcode) {
        self.code.push(op as u8);
    }

    fn emit_u16(&mut self, op: Opcode, operand: u16) {
        self.code.push(op as u8);
        self.code.extend_from_slice(&operand.to_le_bytes());
    }

    pub fn load_const(&mut self, value: Packed, span: Span) -> CompileResult<()> {
        let (index, _) = self.constants.insert_full(value);
        let index = self.pool_index(index, "constant", span)?;
        self.emit_u16(Opcode::LoadConst, index);
        Ok(())
    }

    pub fn load_ident(&mut self, name: &str, span: Span) -> CompileResult<()> {
        let index = self.name_index(name, span)?;
        self.emit_u16(Opcode::LoadIdent, index);
        Ok(())
    }

    /// Emit the call instruction for `argc` arguments already on the stack.
    pub fn call(&mut self, name: &str, argc: usize, span: Span) -> CompileResult<()> {
        let index = self.name_index(name, span)?;
        match Opcode::call_for(argc) {
            Some(op) => self.emit_u16(op, index),
            None => {
                let argc = u8::try_from(argc)
                    .map_err(|_| CompileError::TooManyArguments { count: argc, span })?;
                self.emit_u16(Opcode::CallN, index);
                self.code.push(argc);
            }
        }
        Ok(())
    }

    /// Emit a jump with a placeholder target.
    pub fn emit_jump(&mut self, op: Opcode) -> JumpPatch {
        debug_assert!(op.is_jump());
        let at = self.code.len();
        self.emit_u16(op, u16::MAX);
        JumpPatch(at)
    }

    /// Point a pending jump at the current position.
    pub fn patch_jump(&mut self, patch: JumpPatch, span: Span) -> CompileResult<()> {
        let target = u16::try_from(self.code.len()).map_err(|_| CompileError::ChunkTooLarge {
            chunk: self.name.clone(),
            span,
        })?;
        let [lo, hi] = target.to_le_bytes();
        self.code[patch.0 + 1] = lo;
        self.code[patch.0 + 2] = hi;
        Ok(())
    }

    pub fn finish(self) -> Chunk {
        Chunk {
            name: self.name,
            code: self.code,
            constants: self.constants.into_iter().collect(),
            names: self.names.into_iter().collect(),
        }
    }

    fn name_index(&mut self, name: &str, span: Span) -> CompileResult<u16> {
        let index = match self.names.get_index_of(name) {
            Some(index) => index,
            None => self.names.insert_full(name.to_owned()).0,
        };
        self.pool_index(index, "name", span)
    }

    fn pool_index(&self, index: usize, pool: &'static str, span: Span) -> CompileResult<u16> {
        u16::try_from(index).map_err(|_| CompileError::PoolOverflow {
            chunk: self.name.clone(),
            pool,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::default()
    }

    #[test]
    fn constant_chunk_round_trip() {
        let mut b = ChunkBuilder::new("pi");
        b.load_const(Packed::pack_f64(3.14), sp()).unwrap();
        b.emit(Opcode::Return);
        let chunk = b.finish();
        assert_eq!(chunk.code, vec![0, 0, 0, 17]);
        assert_eq!(chunk.constant_result(), Some(Packed::pack_f64(3.14)));
    }

    #[test]
    fn constants_and_names_are_deduplicated() {
        let mut b = ChunkBuilder::new("dupes");
        b.load_const(Packed::TRUE, sp()).unwrap();
        b.load_const(Packed::FALSE, sp()).unwrap();
        b.load_const(Packed::TRUE, sp()).unwrap();
        b.load_ident("is_adult", sp()).unwrap();
        b.call("is_adult", 0, sp()).unwrap();
        let chunk = b.finish();
        assert_eq!(chunk.constants, vec![Packed::TRUE, Packed::FALSE]);
        assert_eq!(chunk.names, vec!["is_adult".to_string()]);
        let ops: Vec<_> = chunk.instructions().map(|i| (i.opcode, i.operand)).collect();
        assert_eq!(
            ops,
            vec![
                (Opcode::LoadConst, 0),
                (Opcode::LoadConst, 1),
                (Opcode::LoadConst, 0),
                (Opcode::LoadIdent, 0),
                (Opcode::Call0, 0),
            ]
        );
    }

    #[test]
    fn wide_calls_carry_argc() {
        let mut b = ChunkBuilder::new("wide");
        b.call("has_all", 4, sp()).unwrap();
        let chunk = b.finish();
        let inst = chunk.decode(0).unwrap();
        assert_eq!(inst.opcode, Opcode::CallN);
        assert_eq!(inst.argc, 4);
        assert_eq!(inst.next_offset(), 4);
    }

    #[test]
    fn too_many_arguments() {
        let mut b = ChunkBuilder::new("huge");
        let err = b.call("f", 300, sp()).unwrap_err();
        assert!(matches!(err, CompileError::TooManyArguments { count: 300, .. }));
    }

    #[test]
    fn jumps_are_patched_to_absolute_targets() {
        let mut b = ChunkBuilder::new("jump");
        b.load_ident("a", sp()).unwrap();
        let j = b.emit_jump(Opcode::JumpFalse);
        b.load_ident("b", sp()).unwrap();
        b.patch_jump(j, sp()).unwrap();
        b.emit(Opcode::Return);
        let chunk = b.finish();
        let jump = chunk.decode(3).unwrap();
        assert_eq!(jump.opcode, Opcode::JumpFalse);
        assert_eq!(jump.operand, 9);
        assert_eq!(chunk.decode(9).unwrap().opcode, Opcode::Return);
    }

    #[test]
    fn truncated_instruction_does_not_decode() {
        let chunk = Chunk {
            name: "bad".into(),
            code: vec![Opcode::LoadConst as u8, 0],
            constants: vec![],
            names: vec![],
        };
        assert_eq!(chunk.decode(0), None);
        assert_eq!(chunk.instructions().count(), 0);
        assert_eq!(chunk.constant_result(), None);
    }

    #[test]
    fn listing_names_operands() {
        let mut b = ChunkBuilder::new("l");
        b.load_ident("is_child", sp()).unwrap();
        b.emit(Opcode::Return);
        let text = b.finish().listing();
        assert!(text.contains("0000 LOAD_IDENT 0 (is_child)"));
        assert!(text.contains("0003 RETURN"));
    }
}
