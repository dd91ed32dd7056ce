//! The virtual machine.
//!
//! Memory layout, low to high: the bytecode, copied to offset 0; the
//! globals area and the stack, growing upward from the bytecode's end
//! (`gp`); the heap region at the top. Four registers drive execution:
//! `ip` (instruction), `fp` (frame base), `sp` (stack top) and `gp`
//! (globals base, equal to the original bytecode length); the heap keeps
//! its own free-list head.
//!
//! Stack values are raw byte sequences; every sized instruction carries
//! its operand size explicitly, so the stack needs no tags. Binary
//! operators pop their right operand first (the emitter pushes left to
//! right).

use std::io::{Read, Write};

use f12c_ops::{codec, Op};
use f12c_util::sizes;

use crate::error::VmError;
use crate::heap::Heap;

/// VM sizing knobs.
#[derive(Clone, Copy, Debug)]
pub struct VmOptions {
    /// Total memory, bytecode + stack + heap.
    pub memory_size: usize,
    /// Bytes reserved for the heap at the top of memory.
    pub heap_size: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            memory_size: 1024 * 1024,
            heap_size: 256 * 1024,
        }
    }
}

/// The machine. Generic over its I/O handles so tests can capture stdout
/// and feed stdin.
pub struct Vm<R: Read = std::io::Stdin, W: Write = std::io::Stdout> {
    memory: Vec<u8>,
    ip: usize,
    fp: usize,
    sp: usize,
    gp: usize,
    /// First byte past the stack region (the heap's start).
    stack_end: usize,
    heap: Heap,
    running: bool,
    stdin: R,
    stdout: W,
}

impl Vm {
    /// A VM over the process's stdin/stdout with default sizing.
    pub fn new(code: &[u8]) -> Result<Self, VmError> {
        Self::with_io(
            code,
            VmOptions::default(),
            std::io::stdin(),
            std::io::stdout(),
        )
    }
}

impl<R: Read, W: Write> Vm<R, W> {
    /// A VM over explicit I/O handles.
    pub fn with_io(code: &[u8], options: VmOptions, stdin: R, stdout: W) -> Result<Self, VmError> {
        let heap_start = options
            .memory_size
            .checked_sub(options.heap_size)
            .ok_or(VmError::ProgramTooLarge)?;
        if code.len() > heap_start {
            return Err(VmError::ProgramTooLarge);
        }

        let mut memory = vec![0u8; options.memory_size];
        memory[..code.len()].copy_from_slice(code);
        let heap = Heap::new(&mut memory, heap_start, options.memory_size)?;

        Ok(Self {
            memory,
            ip: 0,
            fp: code.len(),
            sp: code.len(),
            gp: code.len(),
            stack_end: heap_start,
            heap,
            running: true,
            stdin,
            stdout,
        })
    }

    /// Run until `EXIT` or a runtime error.
    pub fn run(&mut self) -> Result<(), VmError> {
        while self.running {
            self.step()?;
        }
        self.stdout.flush()?;
        Ok(())
    }

    /// Fetch, decode and execute one instruction.
    pub fn step(&mut self) -> Result<(), VmError> {
        let at = self.ip;
        let (raw, next) = codec::op_code_from_bytes(&self.memory, at)?;
        self.ip = next;

        let op = Op::from_code(raw).ok_or(VmError::UnknownOpCode {
            code: raw,
            offset: at,
        })?;

        match op {
            Op::Pop => {
                let count = self.read_int_operand()?;
                self.drop_bytes(count as usize)?;
            }
            Op::PopPushN => {
                let count = self.read_int_operand()? as usize;
                let times = self.read_int_operand()?;
                let bytes = self.pop_bytes(count)?;
                for _ in 0..times {
                    self.push_bytes(&bytes)?;
                }
            }
            Op::PushInt => {
                let value = self.read_int_operand()?;
                self.push_int(value)?;
            }
            Op::PushBool => {
                let value = self.read_bool_operand()?;
                self.push_byte(codec::bool_to_byte(value))?;
            }
            Op::PushFloat => {
                let value = self.read_float_operand()?;
                self.push_bytes(&codec::float_to_bytes(value))?;
            }
            Op::PushChar => {
                let value = self.read_char_operand()?;
                self.push_byte(codec::char_to_byte(value))?;
            }

            Op::AllocateInStack => {
                let count = self.read_int_operand()? as usize;
                if self.sp + count > self.stack_end {
                    return Err(VmError::StackOverflow);
                }
                self.sp += count;
            }
            Op::SetGlobal => {
                let slot = self.read_int_operand()? as usize;
                let size = self.read_int_operand()? as usize;
                let bytes = self.pop_bytes(size)?;
                self.write_memory(self.gp + slot, &bytes)?;
            }
            Op::SetLocal => {
                let slot = self.read_int_operand()? as usize;
                let size = self.read_int_operand()? as usize;
                let bytes = self.pop_bytes(size)?;
                self.write_memory(self.fp + slot, &bytes)?;
            }
            Op::GetGlobal => {
                let slot = self.read_int_operand()? as usize;
                let size = self.read_int_operand()? as usize;
                let bytes = self.read_memory(self.gp + slot, size)?.to_vec();
                self.push_bytes(&bytes)?;
            }
            Op::GetLocal => {
                let slot = self.read_int_operand()? as usize;
                let size = self.read_int_operand()? as usize;
                let bytes = self.read_memory(self.fp + slot, size)?.to_vec();
                self.push_bytes(&bytes)?;
            }

            Op::FnCallBegin => {
                // Placeholders for the saved ip, fp and sp.
                self.push_int(0)?;
                self.push_int(0)?;
                self.push_int(0)?;
            }
            Op::FnCall => {
                let target = self.read_int_operand()?;
                let args_bytes = self.read_int_operand()? as usize;
                self.fn_call(self.address(target)?, args_bytes)?;
            }
            Op::Ret => self.ret()?,
            Op::RetValue => {
                let size = self.read_int_operand()? as usize;
                let value = self.pop_bytes(size)?;
                self.ret()?;
                self.push_bytes(&value)?;
            }
            Op::Jz => {
                let target = self.read_int_operand()?;
                let condition = self.pop_byte()?;
                if condition == 0 {
                    self.ip = self.address(target)?;
                }
            }
            Op::Jmp => {
                let target = self.read_int_operand()?;
                self.ip = self.address(target)?;
            }

            Op::AddInt => self.int_binary(|l, r| Ok(l.wrapping_add(r)))?,
            Op::SubInt => self.int_binary(|l, r| Ok(l.wrapping_sub(r)))?,
            Op::MulInt => self.int_binary(|l, r| Ok(l.wrapping_mul(r)))?,
            Op::DivInt => self.int_binary(|l, r| {
                if r == 0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(l.wrapping_div(r))
                }
            })?,
            Op::ModInt => self.int_binary(|l, r| {
                if r == 0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(l.wrapping_rem(r))
                }
            })?,
            Op::PowInt => self.int_binary(|l, r| {
                if r < 0 {
                    Err(VmError::NegativeExponent)
                } else {
                    Ok(l.wrapping_pow(r as u32))
                }
            })?,

            Op::AddFloat => self.float_binary(|l, r| Ok(l + r))?,
            Op::SubFloat => self.float_binary(|l, r| Ok(l - r))?,
            Op::MulFloat => self.float_binary(|l, r| Ok(l * r))?,
            Op::DivFloat => self.float_binary(|l, r| {
                if r == 0.0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(l / r)
                }
            })?,
            Op::ModFloat => self.float_binary(|l, r| {
                if r == 0.0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(l % r)
                }
            })?,
            Op::PowFloat => self.float_binary(|l, r| Ok(l.powf(r)))?,

            Op::UnaryPlusInt | Op::UnaryPlusFloat => {}
            Op::UnaryMinusInt => {
                let value = self.pop_int()?;
                self.push_int(value.wrapping_neg())?;
            }
            Op::UnaryMinusFloat => {
                let value = self.pop_float()?;
                self.push_bytes(&codec::float_to_bytes(-value))?;
            }

            Op::Not => {
                let value = self.pop_byte()?;
                self.push_byte(if value == 0 { 1 } else { 0 })?;
            }
            Op::Or => {
                let right = self.pop_byte()?;
                let left = self.pop_byte()?;
                self.push_byte(codec::bool_to_byte(left != 0 || right != 0))?;
            }
            Op::And => {
                let right = self.pop_byte()?;
                let left = self.pop_byte()?;
                self.push_byte(codec::bool_to_byte(left != 0 && right != 0))?;
            }
            Op::Eq | Op::Ne => {
                let size = self.read_int_operand()? as usize;
                let right = self.pop_bytes(size)?;
                let left = self.pop_bytes(size)?;
                let equal = left == right;
                self.push_byte(codec::bool_to_byte(if op == Op::Eq {
                    equal
                } else {
                    !equal
                }))?;
            }

            Op::GtInt => self.int_compare(|l, r| l > r)?,
            Op::GeInt => self.int_compare(|l, r| l >= r)?,
            Op::LtInt => self.int_compare(|l, r| l < r)?,
            Op::LeInt => self.int_compare(|l, r| l <= r)?,
            Op::GtFloat => self.float_compare(|l, r| l > r)?,
            Op::GeFloat => self.float_compare(|l, r| l >= r)?,
            Op::LtFloat => self.float_compare(|l, r| l < r)?,
            Op::LeFloat => self.float_compare(|l, r| l <= r)?,

            Op::MemoryAllocate => {
                let size = self.pop_int()?;
                if size < 0 {
                    return Err(VmError::InvalidAddress {
                        address: size as i64,
                    });
                }
                let address = self.heap.allocate(&mut self.memory, size as usize)?;
                self.push_int(address as i32)?;
            }
            Op::MemoryFree => {
                let address = self.pop_int()?;
                let address = self.address(address)?;
                self.heap.free(&mut self.memory, address)?;
            }
            Op::MemorySet => {
                let size = self.read_int_operand()? as usize;
                let address = self.pop_int()?;
                let address = self.address(address)?;
                let bytes = self.pop_bytes(size)?;
                self.write_memory(address, &bytes)?;
            }
            Op::MemorySetPush => {
                let size = self.read_int_operand()? as usize;
                let times = self.read_int_operand()?;
                let address = self.pop_int()?;
                let target = self.address(address)?;
                let bytes = self.pop_bytes(size)?;
                self.write_memory(target, &bytes)?;
                for _ in 0..times {
                    self.push_int(address)?;
                }
            }
            Op::MemoryGet => {
                let size = self.read_int_operand()? as usize;
                let address = self.pop_int()?;
                let address = self.address(address)?;
                let bytes = self.read_memory(address, size)?.to_vec();
                self.push_bytes(&bytes)?;
            }

            Op::ToStdoutInt => {
                let value = self.pop_int()?;
                write!(self.stdout, "{}", value)?;
            }
            Op::ToStdoutFloat => {
                let value = self.pop_float()?;
                write!(self.stdout, "{}", value)?;
            }
            Op::ToStdoutString => {
                let address = self.pop_int()?;
                let address = self.address(address)?;
                let (text, _) = codec::string_from_bytes(&self.memory, address)?;
                write!(self.stdout, "{}", text)?;
            }
            Op::ToStdoutChar => {
                let value = self.pop_byte()?;
                write!(self.stdout, "{}", value as char)?;
            }
            Op::ToStdoutBool => {
                let value = self.pop_byte()?;
                write!(self.stdout, "{}", value != 0)?;
            }
            Op::FromStdin => {
                let mut buffer = [0u8; 1];
                let read = self.stdin.read(&mut buffer)?;
                self.push_byte(if read == 0 { 0 } else { buffer[0] })?;
            }

            Op::ClearScreen => {
                write!(self.stdout, "\x1b[2J\x1b[H")?;
            }
            Op::PutCharXY => {
                let y = self.pop_int()?;
                let x = self.pop_int()?;
                let c = self.pop_byte()?;
                write!(self.stdout, "\x1b[{};{}H{}", y, x, c as char)?;
            }
            Op::Sleep => {
                let ms = self.pop_int()?;
                if ms > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(ms as u64));
                }
            }

            Op::MarkerStaticStart => {
                return Err(VmError::EnteredStaticData { offset: at });
            }
            Op::Exit => {
                self.running = false;
            }
        }

        Ok(())
    }

    // ---- calling convention ----

    fn fn_call(&mut self, target: usize, args_bytes: usize) -> Result<(), VmError> {
        let new_fp = self
            .sp
            .checked_sub(args_bytes)
            .ok_or(VmError::StackUnderflow)?;
        let saved_ip_slot = new_fp
            .checked_sub(3 * sizes::INT)
            .ok_or(VmError::StackUnderflow)?;
        let saved_fp_slot = new_fp - 2 * sizes::INT;
        let saved_sp_slot = new_fp - sizes::INT;

        self.write_memory(saved_ip_slot, &codec::int_to_bytes(self.ip as i32))?;
        self.write_memory(saved_fp_slot, &codec::int_to_bytes(self.fp as i32))?;
        // The pre-call stack top: where FN_CALL_BEGIN pushed its first slot.
        self.write_memory(saved_sp_slot, &codec::int_to_bytes(saved_ip_slot as i32))?;

        self.ip = target;
        self.fp = new_fp;
        self.sp = new_fp;
        Ok(())
    }

    fn ret(&mut self) -> Result<(), VmError> {
        let old_ip = self.read_int_at(self.fp - 3 * sizes::INT)?;
        let old_fp = self.read_int_at(self.fp - 2 * sizes::INT)?;
        let old_sp = self.read_int_at(self.fp - sizes::INT)?;

        self.ip = self.address(old_ip)?;
        self.fp = self.address(old_fp)?;
        self.sp = self.address(old_sp)?;
        Ok(())
    }

    // ---- operand reads (advance ip) ----

    fn read_int_operand(&mut self) -> Result<i32, VmError> {
        let (value, next) = codec::int_from_bytes(&self.memory, self.ip)?;
        self.ip = next;
        Ok(value)
    }

    fn read_float_operand(&mut self) -> Result<f64, VmError> {
        let (value, next) = codec::float_from_bytes(&self.memory, self.ip)?;
        self.ip = next;
        Ok(value)
    }

    fn read_char_operand(&mut self) -> Result<char, VmError> {
        let (value, next) = codec::char_from_bytes(&self.memory, self.ip)?;
        self.ip = next;
        Ok(value)
    }

    fn read_bool_operand(&mut self) -> Result<bool, VmError> {
        let (value, next) = codec::bool_from_bytes(&self.memory, self.ip)?;
        self.ip = next;
        Ok(value)
    }

    // ---- stack ----

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), VmError> {
        if self.sp + bytes.len() > self.stack_end {
            return Err(VmError::StackOverflow);
        }
        self.memory[self.sp..self.sp + bytes.len()].copy_from_slice(bytes);
        self.sp += bytes.len();
        Ok(())
    }

    fn pop_bytes(&mut self, count: usize) -> Result<Vec<u8>, VmError> {
        if self.sp < self.gp + count {
            return Err(VmError::StackUnderflow);
        }
        self.sp -= count;
        Ok(self.memory[self.sp..self.sp + count].to_vec())
    }

    fn drop_bytes(&mut self, count: usize) -> Result<(), VmError> {
        if self.sp < self.gp + count {
            return Err(VmError::StackUnderflow);
        }
        self.sp -= count;
        Ok(())
    }

    fn push_int(&mut self, value: i32) -> Result<(), VmError> {
        self.push_bytes(&codec::int_to_bytes(value))
    }

    fn pop_int(&mut self) -> Result<i32, VmError> {
        let bytes = self.pop_bytes(sizes::INT)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn pop_float(&mut self) -> Result<f64, VmError> {
        let bytes = self.pop_bytes(sizes::FLOAT)?;
        let mut raw = [0u8; sizes::FLOAT];
        raw.copy_from_slice(&bytes);
        Ok(f64::from_le_bytes(raw))
    }

    fn push_byte(&mut self, byte: u8) -> Result<(), VmError> {
        self.push_bytes(&[byte])
    }

    fn pop_byte(&mut self) -> Result<u8, VmError> {
        let bytes = self.pop_bytes(1)?;
        Ok(bytes[0])
    }

    // ---- arithmetic helpers ----

    fn int_binary(
        &mut self,
        apply: impl FnOnce(i32, i32) -> Result<i32, VmError>,
    ) -> Result<(), VmError> {
        let right = self.pop_int()?;
        let left = self.pop_int()?;
        let result = apply(left, right)?;
        self.push_int(result)
    }

    fn float_binary(
        &mut self,
        apply: impl FnOnce(f64, f64) -> Result<f64, VmError>,
    ) -> Result<(), VmError> {
        let right = self.pop_float()?;
        let left = self.pop_float()?;
        let result = apply(left, right)?;
        self.push_bytes(&codec::float_to_bytes(result))
    }

    fn int_compare(&mut self, apply: impl FnOnce(i32, i32) -> bool) -> Result<(), VmError> {
        let right = self.pop_int()?;
        let left = self.pop_int()?;
        self.push_byte(codec::bool_to_byte(apply(left, right)))
    }

    fn float_compare(&mut self, apply: impl FnOnce(f64, f64) -> bool) -> Result<(), VmError> {
        let right = self.pop_float()?;
        let left = self.pop_float()?;
        self.push_byte(codec::bool_to_byte(apply(left, right)))
    }

    // ---- memory ----

    fn address(&self, value: i32) -> Result<usize, VmError> {
        if value < 0 || value as usize >= self.memory.len() {
            return Err(VmError::InvalidAddress {
                address: value as i64,
            });
        }
        Ok(value as usize)
    }

    fn read_int_at(&self, address: usize) -> Result<i32, VmError> {
        let (value, _) = codec::int_from_bytes(&self.memory, address)?;
        Ok(value)
    }

    fn read_memory(&self, address: usize, len: usize) -> Result<&[u8], VmError> {
        self.memory
            .get(address..address + len)
            .ok_or(VmError::InvalidAddress {
                address: address as i64,
            })
    }

    fn write_memory(&mut self, address: usize, bytes: &[u8]) -> Result<(), VmError> {
        let end = address + bytes.len();
        if end > self.memory.len() {
            return Err(VmError::InvalidAddress {
                address: address as i64,
            });
        }
        self.memory[address..end].copy_from_slice(bytes);
        Ok(())
    }

    // ---- inspection (used by the driver and by tests) ----

    /// The int on top of the stack, if at least one is there.
    pub fn stack_top_int(&self) -> Option<i32> {
        if self.sp < self.gp + sizes::INT {
            return None;
        }
        let at = self.sp - sizes::INT;
        Some(i32::from_be_bytes([
            self.memory[at],
            self.memory[at + 1],
            self.memory[at + 2],
            self.memory[at + 3],
        ]))
    }

    /// The free list as `(address, data_size)` pairs.
    pub fn heap_free_list(&self) -> Vec<(usize, usize)> {
        self.heap.free_list(&self.memory)
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn fp(&self) -> usize {
        self.fp
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn gp(&self) -> usize {
        self.gp
    }

    /// Borrow the stdout handle (to inspect captured output in tests).
    pub fn output(&self) -> &W {
        &self.stdout
    }
}
