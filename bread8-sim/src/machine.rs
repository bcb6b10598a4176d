//! The complete board: lines, registers, ALU, memory and sequencer wired together.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::alu::{Alu, AluMasks};
use crate::clock::{Clock, Phase};
use crate::control::{ControlWord, Mask};
use crate::error::{SimulationError, SimulationResult};
use crate::image;
use crate::line::{ControlLine, FlagLine, PortLine};
use crate::memory::{Memory, MemoryMasks};
use crate::register::{Register, RegisterMasks};
use crate::sequencer::{Microcode, Sequencer};
use crate::terminal::Terminal;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MachineConfig {
    /// Fail a phase in which more than one component drove the port.
    pub check_bus_contention: bool
}

/// Standard wiring of the board.
pub mod wiring {
    use super::*;

    pub fn reg_a() -> RegisterMasks {
        RegisterMasks::new(Mask::Any(ControlWord::AI), Mask::Any(ControlWord::AO), Mask::Never, Mask::Never)
    }

    pub fn reg_b() -> RegisterMasks {
        RegisterMasks::new(Mask::Any(ControlWord::BI), Mask::Any(ControlWord::BO), Mask::Never, Mask::Never)
    }

    pub fn reg_instr() -> RegisterMasks {
        RegisterMasks::new(Mask::Any(ControlWord::II), Mask::Never, Mask::Never, Mask::Never)
    }

    /// Latches the flag line (not the port) when the ALU result is taken.
    pub fn reg_flags() -> RegisterMasks {
        RegisterMasks::new(Mask::Any(ControlWord::EOFI), Mask::Never, Mask::Never, Mask::Never)
    }

    /// Free-running micro-step counter; only the sequencer clears it.
    pub fn reg_steps() -> RegisterMasks {
        RegisterMasks::new(Mask::Never, Mask::Never, Mask::Always, Mask::Never)
    }

    pub fn reg_pc() -> RegisterMasks {
        RegisterMasks::new(Mask::Any(ControlWord::CI), Mask::Any(ControlWord::CO), Mask::Any(ControlWord::CEME), Mask::Any(ControlWord::HI))
    }

    pub fn reg_mar() -> RegisterMasks {
        RegisterMasks::new(Mask::Any(ControlWord::MI), Mask::Never, Mask::Any(ControlWord::CEME), Mask::Any(ControlWord::HI))
    }

    pub fn alu() -> AluMasks {
        AluMasks {
            output: Mask::Any(ControlWord::EOFI),
            invert: Mask::Any(ControlWord::ES),
            carry: Mask::Any(ControlWord::EC)
        }
    }

    pub fn memory() -> MemoryMasks {
        MemoryMasks {
            input: Mask::Any(ControlWord::RI),
            output: Mask::Any(ControlWord::RO)
        }
    }
}

/// Snapshot of every visible value on the board.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MachineState {
    pub cycle: u64,
    pub a: u16,
    pub b: u16,
    pub instr: u16,
    pub flags: u16,
    pub step: u16,
    pub pc: u16,
    pub mar: u16,
    pub port: u8,
    pub flag_line: u8,
    pub ctrl: ControlWord
}
impl Display for MachineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<8} PC={:04X} MAR={:04X} IR={:02X}.{:X} A={:02X} B={:02X} F={:03b} BUS={:02X} [{}]",
            self.cycle,
            self.pc,
            self.mar,
            self.instr & 0xFF,
            self.step & 0xF,
            self.a & 0xFF,
            self.b & 0xFF,
            self.flags & 0b111,
            self.port,
            self.ctrl
        )
    }
}

pub struct Machine {
    port: PortLine,
    ctrl: ControlLine,
    flag_line: FlagLine,
    sequencer: Sequencer,
    reg_a: Register,
    reg_b: Register,
    reg_instr: Register,
    reg_flags: Register,
    reg_steps: Register,
    reg_pc: Register,
    reg_mar: Register,
    alu: Alu,
    memory: Memory,
    terminal: Rc<Terminal>,
    config: MachineConfig,
    cycle: u64
}
impl Machine {
    pub fn new(rom: &[u8], microcode: Microcode, terminal: Rc<Terminal>, config: MachineConfig) -> Self {
        let port = PortLine::new();
        let ctrl = ControlLine::new();
        let flag_line = FlagLine::new();

        let reg_a = Register::new(port.socket(), ctrl.probe(), wiring::reg_a());
        let reg_b = Register::new(port.socket(), ctrl.probe(), wiring::reg_b());
        let reg_instr = Register::new(port.socket(), ctrl.probe(), wiring::reg_instr());
        let reg_flags = Register::new(flag_line.socket(), ctrl.probe(), wiring::reg_flags());
        let reg_steps = Register::new(port.socket(), ctrl.probe(), wiring::reg_steps());
        let reg_pc = Register::new(port.socket(), ctrl.probe(), wiring::reg_pc());
        let reg_mar = Register::new(port.socket(), ctrl.probe(), wiring::reg_mar());

        let alu = Alu::new(
            port.socket(),
            ctrl.probe(),
            reg_a.probe(),
            reg_b.probe(),
            flag_line.socket(),
            wiring::alu()
        );
        let memory = Memory::new(port.socket(), ctrl.probe(), reg_mar.probe(), terminal.clone(), wiring::memory())
            .with_rom(rom);
        let sequencer = Sequencer::new(
            port.socket(),
            ctrl.socket(),
            reg_instr.probe(),
            reg_flags.probe(),
            reg_steps.socket(),
            microcode
        );

        Machine {
            port,
            ctrl,
            flag_line,
            sequencer,
            reg_a,
            reg_b,
            reg_instr,
            reg_flags,
            reg_steps,
            reg_pc,
            reg_mar,
            alu,
            memory,
            terminal,
            config,
            cycle: 0
        }
    }

    /// Loads all three images before building anything, so a failure leaves nothing behind.
    pub fn from_images<P, Q, R>(
        rom: P,
        ctrl_lsb: Q,
        ctrl_msb: R,
        terminal: Rc<Terminal>,
        config: MachineConfig
    ) -> SimulationResult<Self>
        where
            P: AsRef<Path>,
            Q: AsRef<Path>,
            R: AsRef<Path>
    {
        let rom = image::load_rom(rom)?;
        let microcode = image::load_microcode(ctrl_lsb, ctrl_msb)?;
        debug!("{:?}, {} ROM bytes", microcode, rom.len());

        Ok(Self::new(&rom, microcode, terminal, config))
    }

    /// Components in broadcast order.
    fn components(&mut self) -> [&mut dyn Clock; 10] {
        [
            &mut self.sequencer,
            &mut self.reg_a,
            &mut self.reg_b,
            &mut self.reg_instr,
            &mut self.reg_flags,
            &mut self.reg_steps,
            &mut self.reg_pc,
            &mut self.reg_mar,
            &mut self.alu,
            &mut self.memory
        ]
    }

    /// Broadcasts a single phase to every component.
    pub fn phase(&mut self, phase: Phase) -> SimulationResult<()> {
        self.port.begin_phase();
        for component in self.components().iter_mut() {
            component.phase(phase)?;
        }

        if self.config.check_bus_contention && self.port.drivers() > 1 {
            return Err(SimulationError::BusContention {
                cycle: self.cycle,
                phase,
                ctrl: self.ctrl.get(),
                drivers: self.port.drivers()
            });
        }
        Ok(())
    }

    /// Runs one full clock cycle.
    pub fn cycle(&mut self) -> SimulationResult<()> {
        for &phase in Phase::ALL.iter() {
            self.phase(phase)?;
        }
        self.cycle += 1;
        trace!("{}", self.state());
        Ok(())
    }

    /// Clears every register and line. ROM, RAM and microcode are left alone.
    pub fn reset(&mut self) {
        for component in self.components().iter_mut() {
            component.reset();
        }
        self.port.reset();
        self.ctrl.reset();
        self.flag_line.reset();
        self.cycle = 0;
    }

    /// Halt is HI asserted on its own; together with transfer signals HI selects a high byte.
    pub fn halted(&self) -> bool {
        self.ctrl.get() == ControlWord::HI
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn control_word(&self) -> ControlWord {
        self.ctrl.get()
    }

    pub fn terminal(&self) -> &Rc<Terminal> {
        &self.terminal
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn state(&self) -> MachineState {
        MachineState {
            cycle: self.cycle,
            a: self.reg_a.get(),
            b: self.reg_b.get(),
            instr: self.reg_instr.get(),
            flags: self.reg_flags.get(),
            step: self.reg_steps.get(),
            pc: self.reg_pc.get(),
            mar: self.reg_mar.get(),
            port: self.port.get(),
            flag_line: self.flag_line.get(),
            ctrl: self.ctrl.get()
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::alu::{CARRY, ZERO};
    use crate::clock::Phase;
    use crate::control::ControlWord;
    use crate::error::{SimulationError, SimulationErrorKind};
    use crate::machine::{Machine, MachineConfig, MachineState};
    use crate::sequencer::{Microcode, MICROCODE_SIZE};
    use crate::terminal::Terminal;

    const CO: ControlWord = ControlWord::CO;
    const CI: ControlWord = ControlWord::CI;
    const MI: ControlWord = ControlWord::MI;
    const HI: ControlWord = ControlWord::HI;
    const RO: ControlWord = ControlWord::RO;
    const RI: ControlWord = ControlWord::RI;
    const II: ControlWord = ControlWord::II;
    const AI: ControlWord = ControlWord::AI;
    const AO: ControlWord = ControlWord::AO;
    const BI: ControlWord = ControlWord::BI;
    const BO: ControlWord = ControlWord::BO;
    const EOFI: ControlWord = ControlWord::EOFI;
    const ES: ControlWord = ControlWord::ES;
    const EC: ControlWord = ControlWord::EC;
    const IC: ControlWord = ControlWord::IC;
    const CEME: ControlWord = ControlWord::CEME;

    const NOP: u8 = 0x00;
    const LDI: u8 = 0x01;
    const ADI: u8 = 0x02;
    const OUT: u8 = 0x03;
    const HLT: u8 = 0x04;
    const JC: u8 = 0x05;
    const SBI: u8 = 0x06;
    const INP: u8 = 0x07;
    const STA: u8 = 0x08;
    const LDA: u8 = 0x09;

    /// Small instruction set: three fetch steps shared by every opcode, then the body.
    fn microcode() -> Microcode {
        let fetch = [CO | MI, CO | MI | HI, RO | II | CEME];
        let mut words = vec![ControlWord::NONE; MICROCODE_SIZE];

        for flags in 0..8u16 {
            for opcode in 0..64u16 {
                let body: Vec<ControlWord> = match opcode as u8 {
                    LDI => vec![RO | AI | CEME, IC],
                    ADI => vec![RO | BI | CEME, EOFI | AI, IC],
                    SBI => vec![RO | BI | CEME, EOFI | ES | EC | AI, IC],
                    OUT => vec![RO | MI | HI | CEME, AO | RI, IC],
                    INP => vec![RO | MI | HI | CEME, RO | AI, IC],
                    // little-endian address operand, low byte parked in B
                    STA => vec![RO | BI | CEME, RO | MI | HI | CEME, BO | MI, AO | RI, IC],
                    LDA => vec![RO | BI | CEME, RO | MI | HI | CEME, BO | MI, RO | AI, IC],
                    HLT => vec![HI; 13],
                    JC if flags & CARRY as u16 != 0 => vec![RO | CI | CEME, RO | CI | HI, IC],
                    JC => vec![CEME, CEME, IC],
                    _ => vec![IC]
                };

                for (step, &word) in fetch.iter().chain(body.iter()).enumerate() {
                    words[Microcode::index(flags, opcode, step as u16)] = word;
                }
            }
        }

        Microcode::from_words(words)
    }

    fn machine(rom: &[u8], config: MachineConfig) -> Machine {
        let mut machine = Machine::new(rom, microcode(), Rc::new(Terminal::new()), config);
        machine.reset();
        machine
    }

    fn run(machine: &mut Machine, limit: u64) -> u64 {
        while !machine.halted() && machine.cycles() < limit {
            machine.cycle().unwrap();
        }
        machine.cycles()
    }

    #[test]
    fn add_and_print() {
        let rom = [LDI, b'A', ADI, 1, OUT, 0x80, HLT];
        let mut machine = machine(&rom, MachineConfig { check_bus_contention: true });

        let cycles = run(&mut machine, 1000);
        assert!(machine.halted());
        assert_eq!(cycles, 18);
        assert_eq!(machine.terminal().take_output(), b"B".to_vec());

        let state = machine.state();
        assert_eq!(state.a, b'B' as u16);
        assert_eq!(state.pc, 0x0007);
    }

    #[test]
    fn fetch_cycle() {
        let rom = [LDI, 0x55];
        let mut machine = machine(&rom, MachineConfig::default());

        machine.cycle().unwrap();
        assert_eq!(machine.control_word(), CO | MI);
        machine.cycle().unwrap();
        assert_eq!(machine.control_word(), CO | MI | HI);
        assert!(!machine.halted());
        machine.cycle().unwrap();
        assert_eq!(machine.control_word(), RO | II | CEME);

        let state = machine.state();
        assert_eq!(state.instr, LDI as u16);
        assert_eq!(state.pc, 1);
        assert_eq!(state.mar, 1);
        assert_eq!(state.step, 3);
    }

    #[test]
    fn instruction_complete_costs_no_cycle() {
        let rom = [LDI, 0x55, NOP];
        let mut machine = machine(&rom, MachineConfig::default());

        for _ in 0..4 {
            machine.cycle().unwrap();
        }
        assert_eq!(machine.state().a, 0x55);

        // step 4 of LDI is IC: the same cycle already runs step 0 of the next fetch
        machine.cycle().unwrap();
        assert_eq!(machine.control_word(), CO | MI);
        assert_eq!(machine.state().step, 1);
    }

    #[test]
    fn conditional_jump_taken() {
        let rom = [
            LDI, 0xFF,
            ADI, 0x01,
            JC, 0x0A, 0x00,
            HLT,
            NOP, NOP,
            LDI, b'C',
            OUT, 0x80,
            HLT
        ];
        let mut machine = machine(&rom, MachineConfig { check_bus_contention: true });

        run(&mut machine, 1000);
        assert!(machine.halted());
        assert_eq!(machine.state().flags, (ZERO | CARRY) as u16);
        assert_eq!(machine.terminal().take_output(), b"C".to_vec());
    }

    #[test]
    fn conditional_jump_not_taken() {
        let rom = [
            LDI, 0x10,
            ADI, 0x01,
            JC, 0x0A, 0x00,
            HLT,
            NOP, NOP,
            LDI, b'C',
            OUT, 0x80,
            HLT
        ];
        let mut machine = machine(&rom, MachineConfig::default());

        run(&mut machine, 1000);
        assert!(machine.halted());
        assert_eq!(machine.state().pc, 0x0008);
        assert!(machine.terminal().take_output().is_empty());
    }

    #[test]
    fn subtract_sets_flags() {
        let rom = [LDI, 5, SBI, 5, HLT];
        let mut machine = machine(&rom, MachineConfig::default());

        run(&mut machine, 1000);
        let state = machine.state();
        assert_eq!(state.a, 0);
        assert_eq!(state.flags, (ZERO | CARRY) as u16);
    }

    #[test]
    fn echo_terminal_input() {
        let rom = [INP, 0x80, OUT, 0x80, INP, 0x80, OUT, 0x80, HLT];
        let mut machine = machine(&rom, MachineConfig::default());
        machine.terminal().extend_input(b"x".iter().copied());

        run(&mut machine, 1000);
        // second read finds the queue empty and yields 0, which is never printed
        assert_eq!(machine.terminal().take_output(), b"x".to_vec());
        assert_eq!(machine.state().a, 0);
    }

    #[test]
    fn ram_store_and_load() {
        let rom = [LDI, 0x5A, STA, 0x00, 0x30, LDI, 0x00, LDA, 0x00, 0x30, HLT];
        let mut machine = machine(&rom, MachineConfig { check_bus_contention: true });

        run(&mut machine, 1000);
        assert_eq!(machine.state().a, 0x5A);
        assert_eq!(machine.memory().peek(0x3000), 0x5A);
    }

    #[test]
    fn rom_store_is_ignored() {
        let rom = [LDI, 0x5A, STA, 0x00, 0x00, HLT];
        let mut machine = machine(&rom, MachineConfig::default());

        run(&mut machine, 1000);
        assert!(machine.halted());
        assert_eq!(machine.memory().peek(0x0000), LDI);
    }

    #[test]
    fn bus_contention_is_reported() {
        let mut words = vec![ControlWord::NONE; MICROCODE_SIZE];
        words[0] = AO | BO;
        let terminal = Rc::new(Terminal::new());
        let mut machine = Machine::new(&[], Microcode::from_words(words), terminal, MachineConfig {
            check_bus_contention: true
        });

        let error = machine.cycle().unwrap_err();
        assert_eq!(error.kind(), SimulationErrorKind::BusContention);
        match error {
            SimulationError::BusContention { cycle, phase, ctrl, drivers } => {
                assert_eq!(cycle, 0);
                assert_eq!(phase, Phase::BeingLow);
                assert_eq!(ctrl, AO | BO);
                assert_eq!(drivers, 2);
            }
            other => panic!("unexpected error: {}", other)
        }
    }

    #[test]
    fn bus_contention_unchecked_last_writer_wins() {
        let mut words = vec![ControlWord::NONE; MICROCODE_SIZE];
        words[0] = CO | RO;
        let mut machine = Machine::new(&[0x99], Microcode::from_words(words), Rc::new(Terminal::new()), MachineConfig::default());

        machine.phase(Phase::FallingEdge).unwrap();
        machine.phase(Phase::BeingLow).unwrap();
        // memory is visited after the program counter
        assert_eq!(machine.state().port, 0x99);
    }

    #[test]
    fn reset_twice_equals_once() {
        let rom = [LDI, b'A', ADI, 1, OUT, 0x80, HLT];
        let mut machine = machine(&rom, MachineConfig::default());
        run(&mut machine, 10);

        machine.reset();
        let once = machine.state();
        machine.reset();
        assert_eq!(machine.state(), once);
        assert_eq!(once, MachineState::default());
    }

    #[test]
    fn images_round_trip_through_disk() {
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let (lsb, msb) = microcode().to_planes();
        fs::write(dir.path().join("ROM.bin"), vec![LDI, b'Z', OUT, 0x80, HLT]).unwrap();
        fs::write(dir.path().join("CTRL_LSB.bin"), lsb).unwrap();
        fs::write(dir.path().join("CTRL_MSB.bin"), msb).unwrap();

        let mut machine = Machine::from_images(
            dir.path().join("ROM.bin"),
            dir.path().join("CTRL_LSB.bin"),
            dir.path().join("CTRL_MSB.bin"),
            Rc::new(Terminal::new()),
            MachineConfig::default()
        ).unwrap();
        machine.reset();

        run(&mut machine, 1000);
        assert_eq!(machine.terminal().take_output(), b"Z".to_vec());
    }

    #[test]
    fn missing_image_builds_nothing() {
        let dir = tempfile::tempdir().unwrap();

        let error = Machine::from_images(
            dir.path().join("ROM.bin"),
            dir.path().join("CTRL_LSB.bin"),
            dir.path().join("CTRL_MSB.bin"),
            Rc::new(Terminal::new()),
            MachineConfig::default()
        ).err().unwrap();
        assert_eq!(error.kind(), SimulationErrorKind::ImageNotFound);
    }
}
