/// 14-bit instruction set of the PIC16 enhanced mid-range core
///
/// `f`: 7-bit file register address (bank offset), `b`: 3-bit bit index,
/// `k`: literal or address. `Dest::F` stores the result back into `f`.

use std::fmt;

pub const CALL_ADDRESS_MASK: u16 = 0x07ff;
pub const GOTO_ADDRESS_MASK: u16 = 0x07ff;

const FILE_MASK: u16 = 0x7f;
const BIT_MASK: u16 = 0x07;
const LITERAL_MASK: u16 = 0xff;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Dest {
	W,
	F,
}

impl Dest {
	fn bit(self) -> u16 {
		match self {
			Dest::W => 0,
			Dest::F => 0x80,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Instruction {
	// byte-oriented file register operations
	Addwf { f: u8, d: Dest },
	Andwf { f: u8, d: Dest },
	Clrf { f: u8 },
	Clrw,
	Comf { f: u8, d: Dest },
	Decf { f: u8, d: Dest },
	Decfsz { f: u8, d: Dest },
	Incf { f: u8, d: Dest },
	Incfsz { f: u8, d: Dest },
	Iorwf { f: u8, d: Dest },
	Movf { f: u8, d: Dest },
	Movwf { f: u8 },
	Rlf { f: u8, d: Dest },
	Rrf { f: u8, d: Dest },
	Subwf { f: u8, d: Dest },
	Swapf { f: u8, d: Dest },
	Xorwf { f: u8, d: Dest },

	// bit-oriented file register operations
	Bcf { f: u8, b: u8 },
	Bsf { f: u8, b: u8 },
	Btfsc { f: u8, b: u8 },
	Btfss { f: u8, b: u8 },

	// literal and control operations
	Addlw { k: u8 },
	Andlw { k: u8 },
	Iorlw { k: u8 },
	Movlw { k: u8 },
	Retlw { k: u8 },
	Sublw { k: u8 },
	Xorlw { k: u8 },
	Movlb { k: u8 },
	Movlp { k: u8 },
	Bra { k: i16 },
	Call { address: u16 },
	Goto { address: u16 },
	Return,
	Retfie,
	Clrwdt,
	Sleep,
	Reset,
	Nop,
}

fn file_op(opcode: u16, f: u8, d: Dest) -> u16 {
	opcode << 8 | d.bit() | (f as u16 & FILE_MASK)
}

fn bit_op(opcode: u16, f: u8, b: u8) -> u16 {
	opcode << 10 | (b as u16 & BIT_MASK) << 7 | (f as u16 & FILE_MASK)
}

fn literal_op(opcode: u16, k: u8) -> u16 {
	opcode << 8 | (k as u16 & LITERAL_MASK)
}

impl Instruction {
	pub fn encode(&self) -> u16 {
		use self::Instruction::*;

		match *self {
			Addwf { f, d } => file_op(0b00_0111, f, d),
			Andwf { f, d } => file_op(0b00_0101, f, d),
			Clrf { f } => file_op(0b00_0001, f, Dest::F),
			Clrw => 0b00_0001_0000_0000,
			Comf { f, d } => file_op(0b00_1001, f, d),
			Decf { f, d } => file_op(0b00_0011, f, d),
			Decfsz { f, d } => file_op(0b00_1011, f, d),
			Incf { f, d } => file_op(0b00_1010, f, d),
			Incfsz { f, d } => file_op(0b00_1111, f, d),
			Iorwf { f, d } => file_op(0b00_0100, f, d),
			Movf { f, d } => file_op(0b00_1000, f, d),
			Movwf { f } => file_op(0b00_0000, f, Dest::F),
			Rlf { f, d } => file_op(0b00_1101, f, d),
			Rrf { f, d } => file_op(0b00_1100, f, d),
			Subwf { f, d } => file_op(0b00_0010, f, d),
			Swapf { f, d } => file_op(0b00_1110, f, d),
			Xorwf { f, d } => file_op(0b00_0110, f, d),

			Bcf { f, b } => bit_op(0b01_00, f, b),
			Bsf { f, b } => bit_op(0b01_01, f, b),
			Btfsc { f, b } => bit_op(0b01_10, f, b),
			Btfss { f, b } => bit_op(0b01_11, f, b),

			Addlw { k } => literal_op(0b11_1110, k),
			Andlw { k } => literal_op(0b11_1001, k),
			Iorlw { k } => literal_op(0b11_1000, k),
			Movlw { k } => literal_op(0b11_0000, k),
			Retlw { k } => literal_op(0b11_0100, k),
			Sublw { k } => literal_op(0b11_1100, k),
			Xorlw { k } => literal_op(0b11_1010, k),
			Movlb { k } => 0b00_0000_0010_0000 | (k as u16 & 0x1f),
			Movlp { k } => 0b11_0001_1000_0000 | (k as u16 & 0x7f),
			Bra { k } => 0b11_0010_0000_0000 | (k as u16 & 0x1ff),
			Call { address } => 0b10_0000_0000_0000 | (address & CALL_ADDRESS_MASK),
			Goto { address } => 0b10_1000_0000_0000 | (address & GOTO_ADDRESS_MASK),
			Return => 0b00_0000_0000_1000,
			Retfie => 0b00_0000_0000_1001,
			Clrwdt => 0b00_0000_0110_0100,
			Sleep => 0b00_0000_0110_0011,
			Reset => 0b00_0000_0000_0001,
			Nop => 0b00_0000_0000_0000,
		}
	}

	pub fn mnemonic(&self) -> &'static str {
		use self::Instruction::*;

		match *self {
			Addwf { .. } => "ADDWF",
			Andwf { .. } => "ANDWF",
			Clrf { .. } => "CLRF",
			Clrw => "CLRW",
			Comf { .. } => "COMF",
			Decf { .. } => "DECF",
			Decfsz { .. } => "DECFSZ",
			Incf { .. } => "INCF",
			Incfsz { .. } => "INCFSZ",
			Iorwf { .. } => "IORWF",
			Movf { .. } => "MOVF",
			Movwf { .. } => "MOVWF",
			Rlf { .. } => "RLF",
			Rrf { .. } => "RRF",
			Subwf { .. } => "SUBWF",
			Swapf { .. } => "SWAPF",
			Xorwf { .. } => "XORWF",
			Bcf { .. } => "BCF",
			Bsf { .. } => "BSF",
			Btfsc { .. } => "BTFSC",
			Btfss { .. } => "BTFSS",
			Addlw { .. } => "ADDLW",
			Andlw { .. } => "ANDLW",
			Iorlw { .. } => "IORLW",
			Movlw { .. } => "MOVLW",
			Retlw { .. } => "RETLW",
			Sublw { .. } => "SUBLW",
			Xorlw { .. } => "XORLW",
			Movlb { .. } => "MOVLB",
			Movlp { .. } => "MOVLP",
			Bra { .. } => "BRA",
			Call { .. } => "CALL",
			Goto { .. } => "GOTO",
			Return => "RETURN",
			Retfie => "RETFIE",
			Clrwdt => "CLRWDT",
			Sleep => "SLEEP",
			Reset => "RESET",
			Nop => "NOP",
		}
	}
}

impl fmt::Display for Instruction {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		use self::Instruction::*;

		let dest = |d: Dest| match d {
			Dest::W => "W",
			Dest::F => "F",
		};
		let m = self.mnemonic();
		match *self {
			Addwf { f: r, d } | Andwf { f: r, d } | Comf { f: r, d } | Decf { f: r, d }
			| Decfsz { f: r, d } | Incf { f: r, d } | Incfsz { f: r, d } | Iorwf { f: r, d }
			| Movf { f: r, d } | Rlf { f: r, d } | Rrf { f: r, d } | Subwf { f: r, d }
			| Swapf { f: r, d } | Xorwf { f: r, d } => write!(f, "{} 0x{:02x}, {}", m, r, dest(d)),
			Clrf { f: r } | Movwf { f: r } => write!(f, "{} 0x{:02x}", m, r),
			Bcf { f: r, b } | Bsf { f: r, b } | Btfsc { f: r, b } | Btfss { f: r, b } => write!(f, "{} 0x{:02x}, {}", m, r, b),
			Addlw { k } | Andlw { k } | Iorlw { k } | Movlw { k } | Retlw { k } | Sublw { k }
			| Xorlw { k } | Movlb { k } | Movlp { k } => write!(f, "{} 0x{:02x}", m, k),
			Bra { k } => write!(f, "{} {}", m, k),
			Call { address } | Goto { address } => write!(f, "{} 0x{:03x}", m, address),
			_ => f.write_str(m),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use super::Instruction::*;

	#[test]
	fn encode_control() {
		assert_eq!(Nop.encode(), 0x0000);
		assert_eq!(Return.encode(), 0x0008);
		assert_eq!(Retfie.encode(), 0x0009);
		assert_eq!(Sleep.encode(), 0x0063);
		assert_eq!(Clrwdt.encode(), 0x0064);
		assert_eq!(Reset.encode(), 0x0001);
		assert_eq!(Call { address: 0x004 }.encode(), 0x2004);
		assert_eq!(Goto { address: 0x7ff }.encode(), 0x2fff);
	}

	#[test]
	fn encode_call_masks_address() {
		assert_eq!(Call { address: 0x0900 }.encode(), 0x2100);
		assert_eq!(Goto { address: 0x0800 }.encode(), 0x2800);
	}

	#[test]
	fn encode_file_ops() {
		assert_eq!(Movwf { f: 0x70 }.encode(), 0x00f0);
		assert_eq!(Clrf { f: 0x0c }.encode(), 0x018c);
		assert_eq!(Clrw.encode(), 0x0100);
		assert_eq!(Decfsz { f: 0x70, d: Dest::F }.encode(), 0x0bf0);
		assert_eq!(Movf { f: 0x20, d: Dest::W }.encode(), 0x0820);
		assert_eq!(Addwf { f: 0x7f, d: Dest::F }.encode(), 0x07ff);
	}

	#[test]
	fn encode_bit_ops() {
		assert_eq!(Bcf { f: 0x12, b: 2 }.encode(), 0x1112);
		assert_eq!(Bsf { f: 0x18, b: 2 }.encode(), 0x1518);
		assert_eq!(Btfsc { f: 0x03, b: 2 }.encode(), 0x1903);
		assert_eq!(Btfss { f: 0x7f, b: 7 }.encode(), 0x1fff);
	}

	#[test]
	fn encode_literal_ops() {
		assert_eq!(Movlw { k: 0xff }.encode(), 0x30ff);
		assert_eq!(Retlw { k: 0x42 }.encode(), 0x3442);
		assert_eq!(Addlw { k: 0x01 }.encode(), 0x3e01);
		assert_eq!(Xorlw { k: 0x10 }.encode(), 0x3a10);
		assert_eq!(Movlb { k: 0x3f }.encode(), 0x003f);
		assert_eq!(Movlp { k: 0x05 }.encode(), 0x3185);
		assert_eq!(Bra { k: -1 }.encode(), 0x33ff);
		assert_eq!(Bra { k: 2 }.encode(), 0x3202);
	}

	#[test]
	fn all_encodings_fit_14_bits() {
		let samples = [
			Addwf { f: 0xff, d: Dest::F },
			Bsf { f: 0xff, b: 0xff },
			Movlw { k: 0xff },
			Movlp { k: 0xff },
			Bra { k: -256 },
			Call { address: 0xffff },
			Goto { address: 0xffff },
		];
		for i in samples.iter() {
			assert_eq!(i.encode() & !0x3fff, 0, "{}", i);
		}
	}

	#[test]
	fn display() {
		assert_eq!(Call { address: 4 }.to_string(), "CALL 0x004");
		assert_eq!(Decfsz { f: 0x70, d: Dest::F }.to_string(), "DECFSZ 0x70, F");
		assert_eq!(Bcf { f: 0x12, b: 2 }.to_string(), "BCF 0x12, 2");
		assert_eq!(Nop.to_string(), "NOP");
	}
}
