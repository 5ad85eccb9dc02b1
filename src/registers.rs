use crate::diag::Diagnostics;
use crate::error::Chip8Error;
use crate::memory::{SafeArray, CHIP8_PROGRAM_ADDR};

pub const NUM_REGISTERS: usize = 16;

/// nesting depth of CALL
pub const STACK_DEPTH: usize = 16;

/// index of the carry/borrow/collision flag register
pub const VF: usize = 0xf;

/// Return addresses pushed by CALL and popped by RETURN.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallStack {
    addrs: [u16; STACK_DEPTH],
    depth: usize,
}

impl CallStack {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// `None` when the stack is already full
    fn push(&mut self, addr: u16) -> Option<()> {
        let slot = self.addrs.get_mut(self.depth)?;
        *slot = addr;
        self.depth += 1;
        Some(())
    }

    fn pop(&mut self) -> Option<u16> {
        self.depth = self.depth.checked_sub(1)?;
        Some(self.addrs[self.depth])
    }
}

/// V0-VF, I, the program counter and the call stack.
pub struct Registers {
    v: SafeArray<NUM_REGISTERS>,
    pub i: u16,
    pub pc: u16,
    stack: CallStack,
}

impl Registers {
    pub fn new(diag: Diagnostics) -> Self {
        Registers {
            v: SafeArray::new("register", diag),
            i: 0,
            pc: CHIP8_PROGRAM_ADDR as u16,
            stack: CallStack::default(),
        }
    }

    pub fn v(&self, x: usize) -> u8 {
        self.v.get(x)
    }

    pub fn set_v(&mut self, x: usize, val: u8) {
        self.v.set(x, val)
    }

    pub fn v_slice(&self) -> &[u8] {
        self.v.as_slice()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    /// push the address after this instruction and jump to `target`
    pub fn call(&mut self, target: u16) -> Result<(), Chip8Error> {
        let pc = self.pc;
        self.stack
            .push(pc.wrapping_add(2))
            .ok_or(Chip8Error::StackOverflow {
                pc,
                depth: self.stack.depth(),
            })?;
        self.pc = target;
        Ok(())
    }

    /// pop the most recent return address into the program counter
    pub fn ret(&mut self) -> Result<(), Chip8Error> {
        let pc = self.pc;
        self.pc = self
            .stack
            .pop()
            .ok_or(Chip8Error::StackUnderflow { pc })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let r = Registers::new(Diagnostics::default());
        assert_eq!(r.pc, 0x200);
        assert_eq!(r.i, 0);
        assert_eq!(r.v_slice(), &[0; 16]);
        assert_eq!(r.stack_depth(), 0);
    }

    #[test]
    fn test_call_ret_nesting() -> Result<(), Chip8Error> {
        let mut r = Registers::new(Diagnostics::default());
        let mut expected = Vec::new();
        for depth in 0..STACK_DEPTH {
            expected.push(r.pc + 2);
            r.call(0x300 + 2 * depth as u16)?;
        }
        assert_eq!(r.stack_depth(), 16);
        while let Some(ret) = expected.pop() {
            r.ret()?;
            assert_eq!(r.pc, ret);
        }
        Ok(())
    }

    #[test]
    fn test_seventeenth_call_overflows() {
        let mut r = Registers::new(Diagnostics::default());
        for _ in 0..STACK_DEPTH {
            r.call(0x200).unwrap();
        }
        assert!(matches!(
            r.call(0x200),
            Err(Chip8Error::StackOverflow { pc: 0x200, depth: 16 })
        ));
        // the failed push leaves the machine where it was
        assert_eq!(r.pc, 0x200);
        assert_eq!(r.stack_depth(), 16);
    }

    #[test]
    fn test_ret_on_empty_stack_underflows() {
        let mut r = Registers::new(Diagnostics::default());
        assert!(matches!(
            r.ret(),
            Err(Chip8Error::StackUnderflow { pc: 0x200 })
        ));
        assert_eq!(r.pc, 0x200);
    }

    #[test]
    fn test_out_of_range_register() {
        let mut r = Registers::new(Diagnostics::default());
        r.set_v(0x10, 0xff);
        assert_eq!(r.v(0x10), 0);
        assert_eq!(r.v_slice(), &[0; 16]);
    }
}
