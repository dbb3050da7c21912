/// Built-in test program: toggles one PORTA pin forever

use crate::asm::{
	AsmError,
	Assembler,
	Dest,
	Instruction,
};

// bank 0 special function registers (PIC16F152xx)
pub const PORTA: u8 = 0x0c;
pub const TRISA: u8 = 0x12;
pub const LATA: u8 = 0x18;

// common RAM, reachable from every bank
const DELAY_INNER: u8 = 0x70;
const DELAY_OUTER: u8 = 0x71;

/// CONFIG1..CONFIG5 at 0x8007: internal oscillator, no watchdog, LVP kept
/// enabled, no code protection
pub const CONFIGURATION: [u16; 5] = [0x0111, 0x3218, 0x0000, 0x2b98, 0x0001];

pub fn blink(asm: &mut Assembler, pin: u8) -> Result<(), AsmError> {
	use self::Instruction::*;

	let pin = pin & 0x7;

	asm.emit(Movlb { k: 0 })?;
	asm.emit(Bcf { f: LATA, b: pin })?;
	asm.emit(Bcf { f: TRISA, b: pin })?;
	let top = asm.emit_label("loop", Bsf { f: LATA, b: pin })?;
	asm.emit_call("delay")?;
	asm.emit(Bcf { f: LATA, b: pin })?;
	asm.emit_call("delay")?;
	asm.emit(Goto { address: top as u16 })?;

	// 255 * 255 iterations
	asm.emit_label("delay", Movlw { k: 0xff })?;
	asm.emit(Movwf { f: DELAY_OUTER })?;
	let outer = asm.emit(Movlw { k: 0xff })?;
	asm.emit(Movwf { f: DELAY_INNER })?;
	let inner = asm.emit(Decfsz { f: DELAY_INNER, d: Dest::F })?;
	asm.emit(Goto { address: inner as u16 })?;
	asm.emit(Decfsz { f: DELAY_OUTER, d: Dest::F })?;
	asm.emit(Goto { address: outer as u16 })?;
	asm.emit(Return)?;

	Ok(())
}
