/// Minimal assembler for program images
///
/// No parser: programs get emitted instruction by instruction. The only
/// symbolic references are CALL targets, resolved when linking.

mod error;
mod instruction;
mod linker;

pub use self::error::AsmError;

pub use self::instruction::{
	CALL_ADDRESS_MASK,
	Dest,
	GOTO_ADDRESS_MASK,
	Instruction,
};

pub use self::linker::{
	Assembler,
	Relocation,
	UploadReport,
};
