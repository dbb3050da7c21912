use std::time::Duration;

use crate::config::Timing;
use crate::gpio::{
	Direction,
	Line,
	Lines,
};

const STOP_BITS: u32 = 1;

/// Shift a payload value over the trailing stop bit
pub fn frame(value: u32) -> u32 {
	value << STOP_BITS
}

/// Drop the leading start bit and the trailing stop bit of a `bits` wide frame
pub fn unframe(raw: u32, bits: u32) -> u32 {
	(raw & !(1u32 << (bits - 1))) >> STOP_BITS
}

/// Clocked serial transfer over ICSPCLK/ICSPDAT
///
/// The target latches ICSPDAT on the falling ICSPCLK edge; when reading it
/// drives ICSPDAT after the rising edge, and we sample right after the
/// falling edge. Everything is sent most significant bit first.
pub struct Transfer<L: Lines> {
	lines: L,
	timing: Timing,
	payload_bits: u32,
}

impl<L: Lines> Transfer<L> {
	pub fn new(lines: L, timing: Timing, payload_bits: u32) -> Self {
		assert!(payload_bits > 2 && payload_bits <= 32);
		Transfer {
			lines,
			timing,
			payload_bits,
		}
	}

	pub fn lines(&mut self) -> &mut L {
		&mut self.lines
	}

	pub fn timing(&self) -> &Timing {
		&self.timing
	}

	pub fn delay(&mut self, duration: Duration) {
		self.lines.delay(duration);
	}

	pub fn settle(&mut self) {
		let settle = self.timing.settle;
		self.lines.delay(settle);
	}

	/// send the `bits` lowest bits of `word`, highest first
	pub fn transmit(&mut self, word: u32, bits: u32) {
		assert!(bits > 0 && bits <= 32);
		self.lines.set_direction(Line::Clock, Direction::Output);
		self.lines.set_direction(Line::Data, Direction::Output);
		for bit in (0..bits).rev() {
			self.lines.set_level(Line::Data, 0 != word & (1u32 << bit));
			self.clock_pulse();
		}
	}

	/// clock in a `bits` wide frame, returning the value without start/stop bit
	pub fn receive(&mut self, bits: u32) -> u32 {
		assert!(bits > 2 && bits <= 32);
		unframe(self.receive_raw(bits), bits)
	}

	fn receive_raw(&mut self, bits: u32) -> u32 {
		self.lines.set_direction(Line::Clock, Direction::Output);
		self.lines.set_direction(Line::Data, Direction::Input);
		let mut result = 0u32;
		for bit in (0..bits).rev() {
			self.lines.set_level(Line::Clock, true);
			self.lines.delay(self.timing.clock_high);
			self.lines.set_level(Line::Clock, false);
			if self.lines.read_level(Line::Data) {
				result |= 1u32 << bit;
			}
			self.lines.delay(self.timing.clock_low);
		}
		result
	}

	fn clock_pulse(&mut self) {
		self.lines.set_level(Line::Clock, true);
		self.lines.delay(self.timing.clock_high);
		self.lines.set_level(Line::Clock, false);
		self.lines.delay(self.timing.clock_low);
	}

	/// 8-bit command opcode; no framing
	pub fn command(&mut self, opcode: u8) {
		trace!("ICSP command 0x{:02x}", opcode);
		self.transmit(opcode as u32, 8);
		self.settle();
	}

	pub fn transmit_payload(&mut self, value: u32) {
		let bits = self.payload_bits;
		self.transmit(frame(value), bits);
		self.settle();
	}

	pub fn receive_payload(&mut self) -> u32 {
		let bits = self.payload_bits;
		let value = self.receive(bits);
		self.settle();
		value
	}
}

#[cfg(test)]
mod test {
	use super::*;

	// data latched on falling clock edges while ICSPDAT is an output gets
	// played back on rising edges while it is an input
	#[derive(Default)]
	struct Loopback {
		clock: bool,
		data: bool,
		data_input: bool,
		latched: Vec<bool>,
		position: usize,
		driven: bool,
	}

	impl Lines for Loopback {
		fn set_direction(&mut self, line: Line, direction: Direction) {
			if line == Line::Data {
				self.data_input = direction == Direction::Input;
			}
		}

		fn set_level(&mut self, line: Line, high: bool) {
			match line {
				Line::Data => self.data = high,
				Line::Clock => {
					if high && !self.clock && self.data_input {
						self.driven = self.latched[self.position];
						self.position += 1;
					} else if !high && self.clock && !self.data_input {
						self.latched.push(self.data);
					}
					self.clock = high;
				},
				_ => (),
			}
		}

		fn read_level(&mut self, line: Line) -> bool {
			line == Line::Data && self.driven
		}

		fn delay(&mut self, _duration: Duration) {}
	}

	fn loopback() -> Transfer<Loopback> {
		Transfer::new(Loopback::default(), Timing::PIC16F152XX, 24)
	}

	#[test]
	fn frame_roundtrip() {
		for &v in [0u32, 1, 0x3fff, 0x2aaa, 0x15_5555, 0x3f_ffff].iter() {
			assert_eq!(unframe(frame(v), 24), v, "value 0x{:x}", v);
		}
	}

	#[test]
	fn unframe_ignores_start_bit() {
		assert_eq!(unframe(0x80_0000 | frame(0x1234), 24), 0x1234);
		assert_eq!(unframe(0xff_ffff, 24), 0x3f_ffff);
	}

	#[test]
	fn transmit_receive_loopback() {
		for &bits in [8u32, 16, 24, 32].iter() {
			let max = 1u32 << (bits - 2);
			for &v in [0u32, 1, max / 3, max - 1].iter() {
				let mut t = loopback();
				t.transmit(frame(v), bits);
				assert_eq!(t.receive(bits), v, "{} bits, value 0x{:x}", bits, v);
			}
		}
	}

	#[test]
	fn transmit_msb_first() {
		let mut t = loopback();
		t.transmit(0b1000_0010, 8);
		assert_eq!(t.lines().latched, vec![true, false, false, false, false, false, true, false]);
	}

	#[test]
	fn payload_carries_stop_bit() {
		let mut t = loopback();
		t.transmit_payload(0x3fff);
		let latched = &t.lines().latched;
		assert_eq!(latched.len(), 24);
		assert!(!latched[0], "start bit");
		assert!(!latched[23], "stop bit");
		assert_eq!(latched.iter().filter(|&&b| b).count(), 14);
	}
}
