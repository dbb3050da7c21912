/// Software model of a PIC16F152xx in low-voltage programming mode
///
/// Decodes the line transitions the host produces: the key sequence after
/// MCLR drops, 8-bit commands and 24-bit payloads latched on falling clock
/// edges, and read payloads driven on rising clock edges. Delays don't sleep,
/// they only add up in `elapsed()`.

use std::collections::HashMap;
use std::time::Duration;

use super::{
	Direction,
	Line,
	Lines,
};
use crate::config::{
	address,
	ERASED_WORD,
	LVP_KEY,
};
use crate::icsp::opcode;

const PAYLOAD_BITS: u32 = 24;
const WORD_MASK: u16 = 0x3fff;
const ROW_SIZE: u32 = 32;
const PROGRAM_WORDS: u32 = 2048;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Load {
	SetPc,
	Latch { increment: bool },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
	// not in programming mode (MCLR high or unpowered)
	Off,
	Key { count: u32, value: u32 },
	// wrong key; ignores everything until MCLR drops again
	Locked,
	Command { count: u32, value: u32 },
	Input { load: Load, count: u32, value: u32 },
	Output { frame: u32, remaining: u32, increment: bool },
}

#[derive(Clone, Debug)]
pub struct SimTarget {
	state: State,
	directions: HashMap<Line, Direction>,
	levels: HashMap<Line, bool>,
	driven: Option<bool>,
	has_power: bool,
	pc: u32,
	nvm: HashMap<u32, u16>,
	read_only: HashMap<u32, u16>,
	latches: HashMap<u32, u16>,
	commands: Vec<u8>,
	elapsed: Duration,
	stuck_low: HashMap<u32, u16>,
	stuck_high: HashMap<u32, u16>,
}

impl SimTarget {
	pub const DEVICE_ID: u16 = 0x30e3;
	pub const REVISION_ID: u16 = 0x2002;

	/// Blank (erased) PIC16F15213 with a power line
	pub fn new() -> Self {
		let mut read_only = HashMap::new();
		read_only.insert(address::DEVICE_ID, Self::DEVICE_ID);
		read_only.insert(address::REVISION_ID, Self::REVISION_ID);
		read_only.insert(address::ERASE_ROW_SIZE, ROW_SIZE as u16);
		read_only.insert(address::WRITE_LATCHES, ROW_SIZE as u16);
		read_only.insert(address::USER_ROWS, (PROGRAM_WORDS / ROW_SIZE) as u16);
		read_only.insert(address::EEPROM_SIZE, 0);
		read_only.insert(address::PIN_COUNT, 8);
		for i in 0..address::MICROCHIP_UID_WORDS as u32 {
			read_only.insert(address::MICROCHIP_UID + i, 0x1000 + i as u16);
		}
		for i in 0..address::EXTERNAL_UID_WORDS as u32 {
			read_only.insert(address::EXTERNAL_UID + i, 0x2000 + i as u16);
		}

		SimTarget {
			state: State::Off,
			directions: HashMap::new(),
			levels: HashMap::new(),
			driven: None,
			has_power: true,
			pc: 0,
			nvm: HashMap::new(),
			read_only,
			latches: HashMap::new(),
			commands: Vec::new(),
			elapsed: Duration::from_secs(0),
			stuck_low: HashMap::new(),
			stuck_high: HashMap::new(),
		}
	}

	/// Target powered externally; the host has no power line
	pub fn without_power_line() -> Self {
		SimTarget {
			has_power: false,
			..SimTarget::new()
		}
	}

	/// Bits in `mask` of the word at `address` read back as zero, whatever
	/// gets programmed (a broken cell)
	pub fn stick_low(&mut self, address: u32, mask: u16) {
		self.stuck_low.insert(address, mask);
	}

	/// Bits in `mask` of the word at `address` always read back as one
	/// (unimplemented configuration bits)
	pub fn stick_high(&mut self, address: u32, mask: u16) {
		self.stuck_high.insert(address, mask);
	}

	pub fn word(&self, address: u32) -> u16 {
		if let Some(&w) = self.read_only.get(&address) {
			return w;
		}
		let w = self.nvm.get(&address).cloned().unwrap_or(ERASED_WORD);
		let low = self.stuck_low.get(&address).cloned().unwrap_or(0);
		let high = self.stuck_high.get(&address).cloned().unwrap_or(0);
		(w & !low) | high
	}

	pub fn set_word(&mut self, address: u32, value: u16) {
		self.nvm.insert(address, value & WORD_MASK);
	}

	/// Opcodes received since the last `clear_commands`
	pub fn commands(&self) -> &[u8] {
		&self.commands
	}

	pub fn clear_commands(&mut self) {
		self.commands.clear();
	}

	/// Sum of all requested delays
	pub fn elapsed(&self) -> Duration {
		self.elapsed
	}

	pub fn in_programming_mode(&self) -> bool {
		match self.state {
			State::Off | State::Key { .. } | State::Locked => false,
			_ => true,
		}
	}

	fn level(&self, line: Line) -> bool {
		self.levels.get(&line).cloned().unwrap_or(false)
	}

	fn on_rising_clock(&mut self) {
		if let State::Output { frame, remaining, .. } = self.state {
			self.driven = Some(0 != frame & (1 << (remaining - 1)));
		}
	}

	fn on_falling_clock(&mut self) {
		let bit = if self.level(Line::Data) { 1 } else { 0 };
		let state = self.state;
		self.state = match state {
			State::Key { count, value } => {
				let value = (value << 1) | bit;
				if count + 1 < 32 {
					State::Key { count: count + 1, value }
				} else if value == LVP_KEY {
					State::Command { count: 0, value: 0 }
				} else {
					State::Locked
				}
			},
			State::Command { count, value } => {
				let value = (value << 1) | bit;
				if count + 1 < 8 {
					State::Command { count: count + 1, value }
				} else {
					self.execute(value as u8)
				}
			},
			State::Input { load, count, value } => {
				let value = (value << 1) | bit;
				if count + 1 < PAYLOAD_BITS {
					State::Input { load, count: count + 1, value }
				} else {
					self.load((value >> 1) & 0x3f_ffff, load);
					State::Command { count: 0, value: 0 }
				}
			},
			State::Output { frame, remaining, increment } => {
				// `driven` stays valid until the host samples it
				if remaining > 1 {
					State::Output { frame, remaining: remaining - 1, increment }
				} else {
					if increment {
						self.pc += 1;
					}
					State::Command { count: 0, value: 0 }
				}
			},
			s => s,
		};
	}

	fn execute(&mut self, op: u8) -> State {
		self.commands.push(op);
		let output = |word: u16, increment: bool| State::Output {
			frame: ((word as u32) << 1) & 0x7f_fffe,
			remaining: PAYLOAD_BITS,
			increment,
		};
		match op {
			opcode::SET_PC => return State::Input { load: Load::SetPc, count: 0, value: 0 },
			opcode::LOAD_NVM => return State::Input { load: Load::Latch { increment: false }, count: 0, value: 0 },
			opcode::LOAD_NVM_INC => return State::Input { load: Load::Latch { increment: true }, count: 0, value: 0 },
			opcode::READ_NVM => return output(self.word(self.pc), false),
			opcode::READ_NVM_INC => return output(self.word(self.pc), true),
			opcode::INC_PC => self.pc += 1,
			opcode::BULK_ERASE => self.bulk_erase(),
			opcode::ROW_ERASE => {
				let base = self.pc - self.pc % ROW_SIZE;
				for a in base..base + ROW_SIZE {
					self.nvm.remove(&a);
				}
			},
			opcode::BEGIN_INT_PROGRAM | opcode::BEGIN_EXT_PROGRAM => self.commit(),
			opcode::END_EXT_PROGRAM => (),
			_ => (),
		}
		State::Command { count: 0, value: 0 }
	}

	fn load(&mut self, payload: u32, load: Load) {
		match load {
			Load::SetPc => self.pc = payload & 0xffff,
			Load::Latch { increment } => {
				self.latches.insert(self.pc, payload as u16 & WORD_MASK);
				if increment {
					self.pc += 1;
				}
			},
		}
	}

	fn commit(&mut self) {
		for (address, value) in self.latches.drain() {
			if !self.read_only.contains_key(&address) {
				self.nvm.insert(address, value);
			}
		}
	}

	fn bulk_erase(&mut self) {
		// with PC in the configuration region user IDs and configuration words
		// get erased too
		let erase_config = self.pc >= address::USER_ID;
		self.nvm.retain(|&a, _| a >= PROGRAM_WORDS && !erase_config);
		self.latches.clear();
	}
}

impl Default for SimTarget {
	fn default() -> Self {
		SimTarget::new()
	}
}

impl Lines for SimTarget {
	fn set_direction(&mut self, line: Line, direction: Direction) {
		if line == Line::Data && direction == Direction::Output {
			self.driven = None;
		}
		self.directions.insert(line, direction);
	}

	fn set_level(&mut self, line: Line, high: bool) {
		if line == Line::Power && !self.has_power {
			return;
		}
		let previous = self.level(line);
		self.levels.insert(line, high);
		if previous == high {
			return;
		}
		match (line, high) {
			(Line::Clock, true) => self.on_rising_clock(),
			(Line::Clock, false) => self.on_falling_clock(),
			(Line::Mclr, false) => self.state = State::Key { count: 0, value: 0 },
			(Line::Mclr, true) | (Line::Power, false) => {
				self.state = State::Off;
				self.latches.clear();
			},
			_ => (),
		}
	}

	fn read_level(&mut self, line: Line) -> bool {
		let input = self.directions.get(&line) == Some(&Direction::Input);
		if line == Line::Data && input {
			self.driven.unwrap_or(false)
		} else {
			self.level(line)
		}
	}

	fn has_line(&self, line: Line) -> bool {
		line != Line::Power || self.has_power
	}

	fn delay(&mut self, duration: Duration) {
		self.elapsed += duration;
	}
}
