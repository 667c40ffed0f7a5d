//! The run loop (C8) and instruction executor (C6): fetch the word at
//! `PC`, advance `PC`, decode, and dispatch. Every opcode here follows
//! the LC-3 instruction set reference exactly, including the
//! requirement that PC-relative computations use the *already
//! incremented* `PC`.

use crate::error::Error;
use crate::input::Input;
use crate::instruction::Instruction;
use crate::memory::Memory;
use crate::output::Output;
use crate::registers::{Register::*, Registers};
use crate::sign_extend::SignExtend;
use crate::trap::{self, TrapVector};

pub struct Cpu<I, O> {
    registers: Registers,
    memory: Memory,
    input: I,
    output: O,
}

impl<I: Input, O: Output> Cpu<I, O> {
    pub fn new(memory: Memory, input: I, output: O) -> Self {
        Self { registers: Registers::new(), memory, input, output }
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.registers.set_pc(pc);
    }

    #[cfg(test)]
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    #[cfg(test)]
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Runs fetch-decode-execute until a `HALT` trap or a fatal
    /// illegal-instruction condition ends the program.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            let pc = self.registers.pc();
            let raw = self.memory.read(pc, &mut self.input);
            let instruction = Instruction::decode(raw);
            if self.step(instruction)? {
                return Ok(());
            }
        }
    }

    /// Executes one already-decoded instruction, after first
    /// advancing `PC` past it — every PC-relative computation below
    /// uses that already-incremented value. Returns `Ok(true)` when
    /// the program should stop (a `HALT` trap).
    fn step(&mut self, instruction: Instruction) -> Result<bool, Error> {
        let pc = self.registers.pc();
        self.registers.set_pc(pc.wrapping_add(1));

        match instruction {
            // BR - Conditional Branch
            //
            // The condition codes specified by the state of bits
            // [11:9] are tested. If any of the condition codes tested
            // is set, the program branches to the location specified
            // by adding the sign-extended PCoffset9 field to the
            // incremented PC. `BR` with mask 0 is a no-op; mask 0b111
            // is an unconditional branch. Never updates flags.
            Instruction::Br(mask, pc_offset) => {
                if self.registers.condition().matches(mask) {
                    let pc = self.registers.pc();
                    self.registers.set_pc(pc.wrapping_add(pc_offset.sign_extend(9)));
                }
            }

            // ADD - Addition. Register form: DR <- SR1 + SR2.
            Instruction::Add(dr, sr1, sr2) => {
                let value = self.registers.read(sr1).wrapping_add(self.registers.read(sr2));
                self.registers.write(dr, value);
            }
            // ADD - immediate form: DR <- SR1 + sext(imm5).
            Instruction::AddImm(dr, sr1, imm5) => {
                let value = self.registers.read(sr1).wrapping_add(imm5);
                self.registers.write(dr, value);
            }

            // LD - Load. DR <- mem[PC + sext(PCoffset9)].
            Instruction::Ld(dr, pc_offset) => {
                let addr = self.registers.pc().wrapping_add(pc_offset.sign_extend(9));
                let value = self.memory.read(addr, &mut self.input);
                self.registers.write(dr, value);
            }

            // ST - Store. mem[PC + sext(PCoffset9)] <- SR. Never
            // updates flags; bypasses MMIO synthesis (plain write).
            Instruction::St(sr, pc_offset) => {
                let addr = self.registers.pc().wrapping_add(pc_offset.sign_extend(9));
                self.memory.write(addr, self.registers.read(sr));
            }

            // JSR - Jump to Subroutine (PC-relative form). R7 is
            // loaded with the incremented PC *before* PC is
            // overwritten, so the saved return address is correct
            // regardless of evaluation order here.
            Instruction::Jsr(pc_offset) => {
                let return_addr = self.registers.pc();
                let target = return_addr.wrapping_add(pc_offset.sign_extend(11));
                self.registers.set_pc(target);
                self.registers.write_unflagged(R7, return_addr);
            }

            // JSRR - Jump to Subroutine (register form). The target
            // is read out of BaseR before R7 is overwritten, which
            // matters when BaseR is R7 itself.
            Instruction::Jsrr(base_r) => {
                let return_addr = self.registers.pc();
                let target = self.registers.read(base_r);
                self.registers.set_pc(target);
                self.registers.write_unflagged(R7, return_addr);
            }

            // AND - Bitwise AND, register and immediate forms.
            Instruction::And(dr, sr1, sr2) => {
                let value = self.registers.read(sr1) & self.registers.read(sr2);
                self.registers.write(dr, value);
            }
            Instruction::AndImm(dr, sr1, imm5) => {
                let value = self.registers.read(sr1) & imm5;
                self.registers.write(dr, value);
            }

            // LDR - Load Base+offset. DR <- mem[BaseR + sext(offset6)].
            Instruction::Ldr(dr, base_r, offset) => {
                let addr = self.registers.read(base_r).wrapping_add(offset.sign_extend(6));
                let value = self.memory.read(addr, &mut self.input);
                self.registers.write(dr, value);
            }

            // STR - Store Base+offset. Never updates flags.
            Instruction::Str(sr, base_r, offset) => {
                let addr = self.registers.read(base_r).wrapping_add(offset.sign_extend(6));
                self.memory.write(addr, self.registers.read(sr));
            }

            // RTI - not executable outside privileged mode, which
            // this emulator never enters. Fatal.
            Instruction::Rti => {
                return Err(self.illegal("RTI executed outside privileged mode"));
            }

            // NOT - Bitwise complement. DR <- ~SR.
            Instruction::Not(dr, sr) => {
                let value = !self.registers.read(sr);
                self.registers.write(dr, value);
            }

            // LDI - Load Indirect. Both reads are MMIO-aware.
            // DR <- mem[mem[PC + sext(PCoffset9)]].
            Instruction::Ldi(dr, pc_offset) => {
                let indirect_addr = self.registers.pc().wrapping_add(pc_offset.sign_extend(9));
                let addr = self.memory.read(indirect_addr, &mut self.input);
                let value = self.memory.read(addr, &mut self.input);
                self.registers.write(dr, value);
            }

            // STI - Store Indirect. Never updates flags.
            Instruction::Sti(sr, pc_offset) => {
                let indirect_addr = self.registers.pc().wrapping_add(pc_offset.sign_extend(9));
                let addr = self.memory.read(indirect_addr, &mut self.input);
                self.memory.write(addr, self.registers.read(sr));
            }

            // JMP / RET - PC <- BaseR. RET is BaseR = R7. Never
            // updates flags.
            Instruction::Jmp(base_r) => {
                self.registers.set_pc(self.registers.read(base_r));
            }

            // Reserved opcode - never executable in a valid image.
            // Fatal.
            Instruction::Reserved => {
                return Err(self.illegal("reserved opcode executed"));
            }

            // LEA - Load Effective Address. DR <- PC + sext(PCoffset9).
            // No memory read. This crate follows the source artefact
            // in updating flags on LEA (see SPEC_FULL.md's resolved
            // open question on this point).
            Instruction::Lea(dr, pc_offset) => {
                let value = self.registers.pc().wrapping_add(pc_offset.sign_extend(9));
                self.registers.write(dr, value);
            }

            // TRAP - R7 <- PC, then dispatch on trapvect8.
            Instruction::Trap(vector) => {
                self.registers.write_unflagged(R7, self.registers.pc());

                let trap_vector = TrapVector::decode(vector).ok_or_else(|| {
                    Error::IllegalInstruction {
                        pc: self.registers.pc(),
                        detail: format!("unknown trap vector {:#04x}", vector),
                    }
                })?;

                let halted = trap::service(
                    trap_vector,
                    &mut self.registers,
                    &mut self.memory,
                    &mut self.input,
                    &mut self.output,
                )
                .map_err(|source| Error::Io { pc: self.registers.pc(), source })?;

                return Ok(halted);
            }
        }

        Ok(false)
    }

    fn illegal(&self, detail: &str) -> Error {
        Error::IllegalInstruction { pc: self.registers.pc(), detail: detail.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::test_support::Fake as FakeInput;
    use crate::output::test_support::Fake as FakeOutput;
    use crate::registers::Condition;

    fn new_cpu() -> Cpu<FakeInput, FakeOutput> {
        let mut cpu = Cpu::new(Memory::new(), FakeInput::empty(), FakeOutput::new());
        cpu.set_pc(0x3000);
        cpu
    }

    /// S1 - immediate add and flags.
    #[test]
    fn scenario_add_immediate_and_flags() {
        let mut cpu = new_cpu();
        cpu.memory_mut().write(0x3000, 0x127F); // ADD R1, R1, #-1

        let halted = cpu.step(Instruction::decode(0x127F)).unwrap();

        assert!(!halted);
        assert_eq!(cpu.registers().read(R1), 0xFFFF);
        assert_eq!(cpu.registers().condition(), Condition::N);
    }

    /// S2 - LDI indirect load.
    #[test]
    fn scenario_ldi_indirect_load() {
        let mut cpu = new_cpu();
        cpu.memory_mut().write(0x3003, 0x3100);
        cpu.memory_mut().write(0x3100, 0x1234);

        cpu.step(Instruction::decode(0xA402)).unwrap(); // LDI R2, #2

        assert_eq!(cpu.registers().read(R2), 0x1234);
        assert_eq!(cpu.registers().condition(), Condition::P);
    }

    /// S3 - JSR saves R7 then jumps.
    #[test]
    fn scenario_jsr_saves_r7_then_jumps() {
        let mut cpu = new_cpu();

        cpu.step(Instruction::decode(0x4803)).unwrap(); // JSR #3

        assert_eq!(cpu.registers().read(R7), 0x3001);
        assert_eq!(cpu.registers().pc(), 0x3004);
    }

    #[test]
    fn jsrr_reads_base_register_before_overwriting_r7() {
        let mut cpu = new_cpu();
        cpu.registers.write(R7, 0x5000);

        // JSRR R7 (base_r = R7): target must be the original R7 (0x5000).
        cpu.step(Instruction::Jsrr(R7)).unwrap();

        assert_eq!(cpu.registers().pc(), 0x5000);
        assert_eq!(cpu.registers().read(R7), 0x3001);
    }

    /// S4 - HALT terminates, output contains exactly "HALT\n".
    #[test]
    fn scenario_halt_terminates() {
        let mut cpu = new_cpu();

        let halted = cpu.step(Instruction::decode(0xF025)).unwrap();

        assert!(halted);
    }

    /// S5 - PUTS.
    #[test]
    fn scenario_puts() {
        let mut cpu = new_cpu();
        cpu.registers.write(R0, 0x3003);
        cpu.memory_mut().write(0x3003, u16::from(b'H'));
        cpu.memory_mut().write(0x3004, u16::from(b'i'));
        cpu.memory_mut().write(0x3005, 0);

        cpu.step(Instruction::Trap(0x22)).unwrap();

        assert_eq!(cpu.output.as_string(), "Hi");
    }

    #[test]
    fn br_unconditional_always_branches() {
        let mut cpu = new_cpu();
        cpu.registers.set_condition(Condition::Z);

        cpu.step(Instruction::Br(0b111, 5)).unwrap();

        assert_eq!(cpu.registers().pc(), 0x3006);
    }

    #[test]
    fn br_zero_mask_never_branches() {
        let mut cpu = new_cpu();
        cpu.registers.set_condition(Condition::Z);

        cpu.step(Instruction::Br(0b000, 5)).unwrap();

        assert_eq!(cpu.registers().pc(), 0x3001);
    }

    #[test]
    fn jmp_ret_restores_pc_from_r7() {
        let mut cpu = new_cpu();
        cpu.registers.write_unflagged(R7, 0x3042);

        cpu.step(Instruction::Jmp(R7)).unwrap();

        assert_eq!(cpu.registers().pc(), 0x3042);
    }

    #[test]
    fn lea_computes_address_and_updates_flags() {
        let mut cpu = new_cpu();

        cpu.step(Instruction::Lea(R1, 2)).unwrap();

        assert_eq!(cpu.registers().read(R1), 0x3003);
        assert_eq!(cpu.registers().condition(), Condition::P);
    }

    #[test]
    fn rti_is_fatal() {
        let mut cpu = new_cpu();
        assert!(cpu.step(Instruction::Rti).is_err());
    }

    #[test]
    fn reserved_opcode_is_fatal() {
        let mut cpu = new_cpu();
        assert!(cpu.step(Instruction::Reserved).is_err());
    }

    #[test]
    fn unknown_trap_vector_is_fatal() {
        let mut cpu = new_cpu();
        assert!(cpu.step(Instruction::Trap(0xAB)).is_err());
    }

    #[test]
    fn str_and_ldr_round_trip_without_touching_flags() {
        let mut cpu = new_cpu();
        cpu.registers.write(R2, 2);
        cpu.registers.write(R1, 42);
        cpu.registers.set_condition(Condition::N);

        cpu.step(Instruction::Str(R1, R2, 3)).unwrap();
        assert_eq!(cpu.registers().condition(), Condition::N);

        cpu.step(Instruction::Ldr(R3, R2, 3)).unwrap();
        assert_eq!(cpu.registers().read(R3), 42);
        assert_eq!(cpu.registers().condition(), Condition::P);
    }

    #[test]
    fn run_loop_executes_until_halt() {
        // 0x3000: ADD R0, R0, #1 ; 0x3001: TRAP HALT
        let mut cpu = new_cpu();
        cpu.memory_mut().write(0x3000, 0x1021);
        cpu.memory_mut().write(0x3001, 0xF025);

        cpu.run().unwrap();

        assert_eq!(cpu.registers().read(R0), 1);
        assert_eq!(cpu.output.as_string(), "HALT\n");
    }
}
