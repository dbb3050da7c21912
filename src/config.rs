/// Timings, memory geometry and pin assignment for the PIC16F152xx family
///
/// Values follow the "PIC16F152xx Family Programming Specification"
/// (DS40002149). Timings are minimums; the line backend only ever sleeps
/// longer, never shorter.

use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Timing {
	pub entry_setup: Duration,        // TENTS: MCLR/VDD up before data/clock
	pub entry_hold: Duration,         // TENTH: between MCLR low and key, and after key
	pub clock_high: Duration,         // TCKH
	pub clock_low: Duration,          // TCKL
	pub settle: Duration,             // TDLY: between command and payload
	pub entry_settle: Duration,       // target power-up before MCLR is dropped
	pub bulk_erase: Duration,         // TERAB
	pub row_erase: Duration,          // TERAR
	pub internal_program: Duration,   // TPINT
	pub external_program: Duration,   // TPEXT
	pub discharge: Duration,          // TDIS
	pub exit: Duration,               // TEXIT
}

impl Timing {
	pub const PIC16F152XX: Timing = Timing {
		entry_setup: Duration::from_micros(1),
		entry_hold: Duration::from_micros(250),
		clock_high: Duration::from_micros(1),
		clock_low: Duration::from_micros(1),
		settle: Duration::from_micros(1),
		entry_settle: Duration::from_millis(10),
		bulk_erase: Duration::from_micros(13_000),
		row_erase: Duration::from_micros(2_800),
		internal_program: Duration::from_micros(2_800),
		external_program: Duration::from_micros(2_100),
		discharge: Duration::from_micros(300),
		exit: Duration::from_micros(1),
	};
}

impl Default for Timing {
	fn default() -> Self {
		Timing::PIC16F152XX
	}
}

/// How a fully loaded row of write latches gets committed to NVM
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RowCommit {
	/// "Begin Internally Timed Programming"
	Internal,
	/// "Begin Externally Timed Programming" + "End Externally Timed Programming"
	External,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Geometry {
	/// words per row; unit of erase/program/verify
	pub row_size: usize,
	/// program memory size in words
	pub program_words: usize,
	/// width of a framed data payload (start bit + value + stop bit)
	pub payload_bits: u32,
	pub row_commit: RowCommit,
}

impl Geometry {
	pub const PIC16F152XX: Geometry = Geometry {
		row_size: 32,
		program_words: 2048,
		payload_bits: 24,
		row_commit: RowCommit::Internal,
	};

	pub fn row_base(&self, address: u32) -> u32 {
		address - address % self.row_size as u32
	}
}

impl Default for Geometry {
	fn default() -> Self {
		Geometry::PIC16F152XX
	}
}

/// BCM GPIO numbers the target is wired to
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PinMap {
	pub mclr: u8,
	pub clock: u8,
	pub data: u8,
	pub power: Option<u8>,
}

impl Default for PinMap {
	fn default() -> Self {
		PinMap {
			mclr: 9,
			clock: 11,
			data: 10,
			power: Some(22),
		}
	}
}

/// Address map of the configuration memory region
pub mod address {
	pub const USER_ID: u32 = 0x8000;
	pub const USER_ID_WORDS: usize = 4;
	pub const REVISION_ID: u32 = 0x8005;
	pub const DEVICE_ID: u32 = 0x8006;
	pub const CONFIGURATION: u32 = 0x8007;
	pub const CONFIGURATION_WORDS: usize = 5;

	// device information area
	pub const MICROCHIP_UID: u32 = 0x8100;
	pub const MICROCHIP_UID_WORDS: usize = 9;
	pub const EXTERNAL_UID: u32 = 0x810a;
	pub const EXTERNAL_UID_WORDS: usize = 8;

	// device configuration information
	pub const ERASE_ROW_SIZE: u32 = 0x8200;
	pub const WRITE_LATCHES: u32 = 0x8201;
	pub const USER_ROWS: u32 = 0x8202;
	pub const EEPROM_SIZE: u32 = 0x8203;
	pub const PIN_COUNT: u32 = 0x8204;
}

/// 32-bit key clocked in after MCLR drops: "MCHP"
pub const LVP_KEY: u32 = 0x4d43_4850;

/// Mask of significant bits of the revision ID word
pub const REVISION_ID_MASK: u16 = 0x0fff;

/// Value of an erased NVM word
pub const ERASED_WORD: u16 = 0x3fff;
