//! Instruction set and its static metadata table.
//!
//! Every instruction is one opcode byte followed by a fixed number of
//! operand bytes. Multi-byte operands are little-endian.
//!
//! | Opcode       | Operands              | Stack effect          |
//! |--------------|-----------------------|-----------------------|
//! | `LOAD_CONST` | u16 constant index    | → value               |
//! | `LOAD_IDENT` | u16 name index        | → value               |
//! | `EQ` `NEQ` `LT` | –                  | a b → bool            |
//! | `AND` `OR`   | –                     | a b → bool            |
//! | `NOT`        | –                     | a → bool              |
//! | `JUMP`       | u16 absolute target   | –                     |
//! | `JUMP_FALSE` `JUMP_TRUE` | u16 target | test →              |
//! | `POP`        | –                     | a →                   |
//! | `CALL0..2`   | u16 name index        | args → result         |
//! | `CALL_N`     | u16 name index, u8 argc | args → result       |
//! | `SET_RETURN` | –                     | a →  (into return slot) |
//! | `RETURN`     | –                     | ends the chunk        |

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    LoadConst = 0,
    LoadIdent = 1,
    Eq = 2,
    NotEq = 3,
    Less = 4,
    And = 5,
    Or = 6,
    Not = 7,
    Jump = 8,
    JumpFalse = 9,
    JumpTrue = 10,
    Pop = 11,
    Call0 = 12,
    Call1 = 13,
    Call2 = 14,
    CallN = 15,
    SetReturn = 16,
    Return = 17,
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub opcode: Opcode,
    pub mnemonic: &'static str,
    /// Operand bytes following the opcode byte.
    pub operand_bytes: u8,
}

const fn op(opcode: Opcode, mnemonic: &'static str, operand_bytes: u8) -> OpInfo {
    OpInfo {
        opcode,
        mnemonic,
        operand_bytes,
    }
}

/// Metadata for every opcode, indexed by opcode byte.
pub static OPCODES: [OpInfo; 18] = [
    op(Opcode::LoadConst, "LOAD_CONST", 2),
    op(Opcode::LoadIdent, "LOAD_IDENT", 2),
    op(Opcode::Eq, "EQ", 0),
    op(Opcode::NotEq, "NEQ", 0),
    op(Opcode::Less, "LT", 0),
    op(Opcode::And, "AND", 0),
    op(Opcode::Or, "OR", 0),
    op(Opcode::Not, "NOT", 0),
    op(Opcode::Jump, "JUMP", 2),
    op(Opcode::JumpFalse, "JUMP_FALSE", 2),
    op(Opcode::JumpTrue, "JUMP_TRUE", 2),
    op(Opcode::Pop, "POP", 0),
    op(Opcode::Call0, "CALL0", 2),
    op(Opcode::Call1, "CALL1", 2),
    op(Opcode::Call2, "CALL2", 2),
    op(Opcode::CallN, "CALL_N", 3),
    op(Opcode::SetReturn, "SET_RETURN", 0),
    op(Opcode::Return, "RETURN", 0),
];

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        OPCODES.get(byte as usize).map(|info| info.opcode)
    }

    pub fn info(self) -> &'static OpInfo {
        &OPCODES[self as usize]
    }

    /// Total encoded width: opcode byte plus operands.
    pub fn width(self) -> usize {
        1 + self.info().operand_bytes as usize
    }

    /// The fixed-arity call opcode for `argc` arguments, if there is one.
    pub fn call_for(argc: usize) -> Option<Opcode> {
        match argc {
            0 => Some(Opcode::Call0),
            1 => Some(Opcode::Call1),
            2 => Some(Opcode::Call2),
            _ => None,
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpFalse | Opcode::JumpTrue)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().mnemonic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_opcode_byte() {
        for (i, info) in OPCODES.iter().enumerate() {
            assert_eq!(info.opcode as usize, i, "{} out of place", info.mnemonic);
            assert_eq!(Opcode::from_byte(i as u8), Some(info.opcode));
        }
        assert_eq!(Opcode::from_byte(OPCODES.len() as u8), None);
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn widths() {
        assert_eq!(Opcode::LoadConst.width(), 3);
        assert_eq!(Opcode::CallN.width(), 4);
        assert_eq!(Opcode::Return.width(), 1);
    }

    #[test]
    fn call_opcodes_by_arity() {
        assert_eq!(Opcode::call_for(0), Some(Opcode::Call0));
        assert_eq!(Opcode::call_for(2), Some(Opcode::Call2));
        assert_eq!(Opcode::call_for(3), None);
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Opcode::JumpFalse.to_string(), "JUMP_FALSE");
        assert_eq!(Opcode::NotEq.to_string(), "NEQ");
    }
}
