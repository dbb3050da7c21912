/// Low-voltage ICSP protocol of the PIC16F152xx family
///
/// Entering programming mode: MCLR low, then the 32-bit key "MCHP" clocked in
/// MSB first.
///
/// Every command starts with an 8-bit opcode. Some commands are followed by
/// a 24-bit payload (sent or received), framed as:
/// - Start bit: "0"
/// - 22-bit value (14 significant bits for NVM words, 16 for addresses)
/// - Stop bit: "0"
///
/// Opcodes:
/// - 0x80: load PC address, send payload
/// - 0xF8: increment PC
/// - 0xFC: read NVM at PC, recv payload
/// - 0xFE: read NVM at PC and increment PC, recv payload
/// - 0x00: load data for NVM (write latch at PC), send payload
/// - 0x02: load data for NVM and increment PC, send payload
/// - 0x18: bulk erase (program memory; with PC >= 0x8000 also configuration)
/// - 0xF0: row erase (row addressed by PC)
/// - 0xE0: begin internally timed programming
/// - 0xC0: begin externally timed programming
/// - 0x82: end externally timed programming

mod device;
mod row;
mod session;
mod transfer;

pub mod opcode {
	pub const SET_PC: u8 = 0x80;
	pub const INC_PC: u8 = 0xf8;
	pub const READ_NVM: u8 = 0xfc;
	pub const READ_NVM_INC: u8 = 0xfe;
	pub const LOAD_NVM: u8 = 0x00;
	pub const LOAD_NVM_INC: u8 = 0x02;
	pub const BULK_ERASE: u8 = 0x18;
	pub const ROW_ERASE: u8 = 0xf0;
	pub const BEGIN_INT_PROGRAM: u8 = 0xe0;
	pub const BEGIN_EXT_PROGRAM: u8 = 0xc0;
	pub const END_EXT_PROGRAM: u8 = 0x82;
}

pub use self::device::{
	Characteristics,
	DeviceInfo,
	DeviceInformationArea,
};

pub use self::row::{
	Mismatch,
	RowWriter,
	Verification,
};

pub use self::session::{
	Session,
	SessionState,
};

pub use self::transfer::{
	Transfer,
	frame,
	unframe,
};
