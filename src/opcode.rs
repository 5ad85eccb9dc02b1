use std::fmt;

/// # Opcodes
///
/// CHIP-8 opcodes are 16 bits, read big-endian from two consecutive memory
/// cells. Nibbles are numbered from the least significant:
///
/// ```text
///   3    2    1    0
/// [fam][ x ][ y ][ n ]
///           [  kk    ]
///      [    addr     ]
/// ```
///
/// The family nibble picks the instruction; families 0x0, 0x8, 0xE and 0xF
/// need nibble 0 or the low byte as well.
pub trait Opcode {
    /// nibble `index`, 0 being the least significant
    fn nibble(&self, index: u8) -> u8;

    /// `[f___]`
    fn family(&self) -> u8 {
        self.nibble(3)
    }

    /// `[_x__]`
    fn x(&self) -> u8 {
        self.nibble(2)
    }

    /// `[__y_]`
    fn y(&self) -> u8 {
        self.nibble(1)
    }

    /// `[___n]`
    fn n(&self) -> u8 {
        self.nibble(0)
    }

    /// `[__kk]`
    fn kk(&self) -> u8;

    /// `[_adr]`
    fn addr(&self) -> u16;
}

impl Opcode for u16 {
    fn nibble(&self, index: u8) -> u8 {
        ((self >> (4 * u16::from(index & 0x3))) & 0xf) as u8
    }

    fn kk(&self) -> u8 {
        (self & 0x00ff) as u8
    }

    fn addr(&self) -> u16 {
        self & 0x0fff
    }
}

/// A decoded instruction. Register operands are indices 0x0-0xF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// 0NNN, a COSMAC machine code routine; ignored
    Sys(u16),
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipEqImm(u8, u8),
    /// 4XNN
    SkipNeImm(u8, u8),
    /// 5XY0
    SkipEqReg(u8, u8),
    /// 6XNN
    LoadImm(u8, u8),
    /// 7XNN
    AddImm(u8, u8),
    /// 8XY0
    Move(u8, u8),
    /// 8XY1
    Or(u8, u8),
    /// 8XY2
    And(u8, u8),
    /// 8XY3
    Xor(u8, u8),
    /// 8XY4
    AddReg(u8, u8),
    /// 8XY5
    Sub(u8, u8),
    /// 8XY6
    ShiftRight(u8, u8),
    /// 8XY7
    SubFrom(u8, u8),
    /// 8XYE
    ShiftLeft(u8, u8),
    /// 9XY0
    SkipNeReg(u8, u8),
    /// ANNN
    LoadIndex(u16),
    /// BNNN
    JumpOffset(u16),
    /// CXNN
    Random(u8, u8),
    /// DXYN
    Draw(u8, u8, u8),
    /// EX9E
    SkipKeyDown(u8),
    /// EXA1
    SkipKeyUp(u8),
    /// FX07
    ReadDelay(u8),
    /// FX0A
    AwaitKey(u8),
    /// FX15
    SetDelay(u8),
    /// FX18
    SetSound(u8),
    /// FX1E
    AddIndex(u8),
    /// FX29
    FontGlyph(u8),
    /// FX33
    Bcd(u8),
    /// FX55
    StoreRegs(u8),
    /// FX65
    LoadRegs(u8),
}

impl Instruction {
    /// `None` for words that don't map to any instruction
    pub fn decode(op: u16) -> Option<Instruction> {
        use Instruction::*;

        let (x, y) = (op.x(), op.y());
        let ins = match (op.family(), op.n()) {
            (0x0, _) => match op {
                0x00e0 => Cls,
                0x00ee => Ret,
                _ => Sys(op.addr()),
            },
            (0x1, _) => Jump(op.addr()),
            (0x2, _) => Call(op.addr()),
            (0x3, _) => SkipEqImm(x, op.kk()),
            (0x4, _) => SkipNeImm(x, op.kk()),
            (0x5, 0x0) => SkipEqReg(x, y),
            (0x6, _) => LoadImm(x, op.kk()),
            (0x7, _) => AddImm(x, op.kk()),
            (0x8, 0x0) => Move(x, y),
            (0x8, 0x1) => Or(x, y),
            (0x8, 0x2) => And(x, y),
            (0x8, 0x3) => Xor(x, y),
            (0x8, 0x4) => AddReg(x, y),
            (0x8, 0x5) => Sub(x, y),
            (0x8, 0x6) => ShiftRight(x, y),
            (0x8, 0x7) => SubFrom(x, y),
            (0x8, 0xe) => ShiftLeft(x, y),
            (0x9, 0x0) => SkipNeReg(x, y),
            (0xa, _) => LoadIndex(op.addr()),
            (0xb, _) => JumpOffset(op.addr()),
            (0xc, _) => Random(x, op.kk()),
            (0xd, n) => Draw(x, y, n),
            (0xe, _) => match op.kk() {
                0x9e => SkipKeyDown(x),
                0xa1 => SkipKeyUp(x),
                _ => return None,
            },
            (0xf, _) => match op.kk() {
                0x07 => ReadDelay(x),
                0x0a => AwaitKey(x),
                0x15 => SetDelay(x),
                0x18 => SetSound(x),
                0x1e => AddIndex(x),
                0x29 => FontGlyph(x),
                0x33 => Bcd(x),
                0x55 => StoreRegs(x),
                0x65 => LoadRegs(x),
                _ => return None,
            },
            _ => return None,
        };
        Some(ins)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Sys(a) => write!(f, "SYS {:#05x}", a),
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jump(a) => write!(f, "JP {:#05x}", a),
            Call(a) => write!(f, "CALL {:#05x}", a),
            SkipEqImm(x, kk) => write!(f, "SE V{:X}, {:#04x}", x, kk),
            SkipNeImm(x, kk) => write!(f, "SNE V{:X}, {:#04x}", x, kk),
            SkipEqReg(x, y) => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImm(x, kk) => write!(f, "LD V{:X}, {:#04x}", x, kk),
            AddImm(x, kk) => write!(f, "ADD V{:X}, {:#04x}", x, kk),
            Move(x, y) => write!(f, "LD V{:X}, V{:X}", x, y),
            Or(x, y) => write!(f, "OR V{:X}, V{:X}", x, y),
            And(x, y) => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor(x, y) => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg(x, y) => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub(x, y) => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight(x, _) => write!(f, "SHR V{:X}", x),
            SubFrom(x, y) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft(x, _) => write!(f, "SHL V{:X}", x),
            SkipNeReg(x, y) => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex(a) => write!(f, "LD I, {:#05x}", a),
            JumpOffset(a) => write!(f, "JP V0, {:#05x}", a),
            Random(x, kk) => write!(f, "RND V{:X}, {:#04x}", x, kk),
            Draw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipKeyDown(x) => write!(f, "SKP V{:X}", x),
            SkipKeyUp(x) => write!(f, "SKNP V{:X}", x),
            ReadDelay(x) => write!(f, "LD V{:X}, DT", x),
            AwaitKey(x) => write!(f, "LD V{:X}, K", x),
            SetDelay(x) => write!(f, "LD DT, V{:X}", x),
            SetSound(x) => write!(f, "LD ST, V{:X}", x),
            AddIndex(x) => write!(f, "ADD I, V{:X}", x),
            FontGlyph(x) => write!(f, "LD F, V{:X}", x),
            Bcd(x) => write!(f, "LD B, V{:X}", x),
            StoreRegs(x) => write!(f, "LD [I], V{:X}", x),
            LoadRegs(x) => write!(f, "LD V{:X}, [I]", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibbles() {
        let op: u16 = 0xABCD;
        assert_eq!(op.nibble(0), 0xD);
        assert_eq!(op.nibble(1), 0xC);
        assert_eq!(op.nibble(2), 0xB);
        assert_eq!(op.nibble(3), 0xA);
        assert_eq!(op.family(), 0xA);
    }

    #[test]
    fn test_fields() {
        let op: u16 = 0xABCD;
        assert_eq!(op.x(), 0xB);
        assert_eq!(op.y(), 0xC);
        assert_eq!(op.n(), 0xD);
        assert_eq!(op.kk(), 0xCD);
        assert_eq!(op.addr(), 0x0BCD);
    }

    #[test]
    fn test_decode_families() {
        use Instruction::*;
        let cases: &[(u16, Instruction)] = &[
            (0x0123, Sys(0x123)),
            (0x00e0, Cls),
            (0x00ee, Ret),
            (0x1234, Jump(0x234)),
            (0x2456, Call(0x456)),
            (0x3a12, SkipEqImm(0xa, 0x12)),
            (0x4b34, SkipNeImm(0xb, 0x34)),
            (0x5120, SkipEqReg(1, 2)),
            (0x6005, LoadImm(0, 5)),
            (0x7003, AddImm(0, 3)),
            (0x8120, Move(1, 2)),
            (0x8121, Or(1, 2)),
            (0x8122, And(1, 2)),
            (0x8123, Xor(1, 2)),
            (0x8124, AddReg(1, 2)),
            (0x8125, Sub(1, 2)),
            (0x8126, ShiftRight(1, 2)),
            (0x8127, SubFrom(1, 2)),
            (0x812e, ShiftLeft(1, 2)),
            (0x9120, SkipNeReg(1, 2)),
            (0xa2f0, LoadIndex(0x2f0)),
            (0xb300, JumpOffset(0x300)),
            (0xc7ff, Random(7, 0xff)),
            (0xd015, Draw(0, 1, 5)),
            (0xe39e, SkipKeyDown(3)),
            (0xe3a1, SkipKeyUp(3)),
            (0xf207, ReadDelay(2)),
            (0xf20a, AwaitKey(2)),
            (0xf215, SetDelay(2)),
            (0xf218, SetSound(2)),
            (0xf21e, AddIndex(2)),
            (0xf229, FontGlyph(2)),
            (0xf233, Bcd(2)),
            (0xf255, StoreRegs(2)),
            (0xf265, LoadRegs(2)),
        ];
        assert_eq!(cases.len(), 35);
        for (op, expected) in cases {
            assert_eq!(Instruction::decode(*op), Some(*expected), "{:04x}", op);
        }
    }

    #[test]
    fn test_decode_unknown() {
        for op in [0x5121, 0x8128, 0x800f, 0x9121, 0xe19f, 0xf100, 0xf1ff] {
            assert_eq!(Instruction::decode(op), None, "{:04x}", op);
        }
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Instruction::Jump(0x200).to_string(), "JP 0x200");
        assert_eq!(Instruction::Draw(0, 1, 5).to_string(), "DRW V0, V1, 5");
        assert_eq!(Instruction::LoadImm(0xa, 0x05).to_string(), "LD VA, 0x05");
    }
}
