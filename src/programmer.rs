/// Complete programming run: erase, program memory, user IDs, configuration

use crate::asm::Assembler;
use crate::config::address;
use crate::gpio::Lines;
use crate::icsp::{
	Session,
	Verification,
};

#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Plan {
	/// bulk erase program memory, user IDs and configuration first
	pub erase: bool,
	pub user_ids: Vec<u16>,
	pub configuration: Option<Vec<u16>>,
}

// program single words from `base` on; returns the failed ones
fn program_words<L: Lines>(
	session: &mut Session<L>,
	region: &str,
	base: u32,
	words: &[u16],
	full_compare: bool,
) -> crate::AResult<Vec<Verification>> {
	let mut failed = Vec::new();
	for (i, &value) in words.iter().enumerate() {
		let mask = if full_compare { !0 } else { value };
		let v = session.program_word(base + i as u32, value, mask)?;
		if v.is_ok() {
			debug!("{} {}", region, v);
		} else {
			error!("{} {}", region, v);
			failed.push(v);
		}
	}
	Ok(failed)
}

fn check(region: &str, failed: Vec<Verification>) -> crate::AResult<()> {
	match failed.into_iter().next() {
		None => Ok(()),
		Some(v) => with_context!(("{} verify failed", region), v.into_result()),
	}
}

/// User ID words at 0x8000; compared in full
pub fn write_user_ids<L: Lines>(session: &mut Session<L>, ids: &[u16]) -> crate::AResult<()> {
	ensure!(ids.len() <= address::USER_ID_WORDS, "At most {} user ID words, got {}", address::USER_ID_WORDS, ids.len());
	let failed = program_words(session, "User ID", address::USER_ID, ids, true)?;
	check("User ID", failed)
}

/// Configuration words at 0x8007; only bits set in the written value are
/// compared (unimplemented bits read back differently)
pub fn write_configuration<L: Lines>(session: &mut Session<L>, words: &[u16]) -> crate::AResult<()> {
	ensure!(words.len() <= address::CONFIGURATION_WORDS,
		"At most {} configuration words, got {}", address::CONFIGURATION_WORDS, words.len()
	);
	let failed = program_words(session, "Configuration", address::CONFIGURATION, words, false)?;
	check("Configuration", failed)
}

/// Run `plan` on an open session; stops before user IDs/configuration if
/// program memory didn't verify
pub fn program<L: Lines>(session: &mut Session<L>, image: &mut Assembler, plan: &Plan) -> crate::AResult<()> {
	ensure!(session.is_open(), "ICSP session not open");

	if plan.erase {
		info!("Erasing device");
		// with PC in the configuration region bulk erase includes it
		session.set_program_counter(address::USER_ID)?;
		session.bulk_erase()?;
	}

	let report = image.upload(session)?;
	report.into_result()?;

	if !plan.user_ids.is_empty() {
		info!("Writing {} user ID words", plan.user_ids.len());
		write_user_ids(session, &plan.user_ids)?;
	}

	if let Some(ref configuration) = plan.configuration {
		info!("Writing {} configuration words", configuration.len());
		write_configuration(session, configuration)?;
	}

	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::config::{
		ERASED_WORD,
		Geometry,
	};
	use crate::firmware;
	use crate::gpio::SimTarget;

	fn open() -> Session<SimTarget> {
		let mut s = Session::with_defaults(SimTarget::new());
		s.open().expect("open session");
		s
	}

	fn blink() -> Assembler {
		let mut asm = Assembler::new(&Geometry::PIC16F152XX);
		firmware::blink(&mut asm, 2).unwrap();
		asm
	}

	#[test]
	fn configuration_words_verify() {
		let mut s = open();
		let words = [0x0111, 0x3218, 0x0000, 0x2b98, 0x0001];
		write_configuration(&mut s, &words).unwrap();
		for (i, &w) in words.iter().enumerate() {
			assert_eq!(s.lines().word(0x8007 + i as u32), w);
		}
	}

	#[test]
	fn configuration_ignores_bits_reading_high() {
		let mut s = open();
		s.lines().stick_high(0x800a, 0x0040);
		write_configuration(&mut s, &firmware::CONFIGURATION).unwrap();
	}

	#[test]
	fn user_ids_compared_in_full() {
		let mut s = open();
		s.lines().stick_high(0x8001, 0x0100);
		assert!(write_user_ids(&mut s, &[0x0001, 0x0002]).is_err());
		let mut s = open();
		write_user_ids(&mut s, &[0x0001, 0x0002, 0x0003, 0x0004]).unwrap();
		assert_eq!(s.read_words(address::USER_ID, 4).unwrap(), vec![1, 2, 3, 4]);
	}

	#[test]
	fn too_many_words_rejected() {
		let mut s = open();
		s.lines().clear_commands();
		assert!(write_user_ids(&mut s, &[0; 5]).is_err());
		assert!(write_configuration(&mut s, &[0; 6]).is_err());
		assert!(s.lines().commands().is_empty());
	}

	#[test]
	fn full_run() {
		let mut s = open();
		s.lines().set_word(0x8007, 0x0000);
		s.lines().set_word(0x100, 0x1234);
		let plan = Plan {
			erase: true,
			user_ids: vec![0x0a, 0x0b],
			configuration: Some(firmware::CONFIGURATION.to_vec()),
		};
		let mut asm = blink();
		program(&mut s, &mut asm, &plan).unwrap();
		s.release();

		let target = s.lines();
		assert_eq!(target.word(4), 0x2008);
		assert_eq!(target.word(0x100), ERASED_WORD);
		assert_eq!(target.word(0x8000), 0x0a);
		assert_eq!(target.word(0x8001), 0x0b);
		assert_eq!(target.word(0x8002), ERASED_WORD);
		assert_eq!(target.word(0x8007), 0x0111);
		assert_eq!(target.word(0x800b), 0x0001);
		assert!(!target.in_programming_mode());
	}

	#[test]
	fn failed_row_skips_configuration() {
		let mut s = open();
		s.lines().stick_low(3, 0x0400);
		let plan = Plan {
			erase: false,
			user_ids: vec![1],
			configuration: Some(firmware::CONFIGURATION.to_vec()),
		};
		let mut asm = blink();
		assert!(program(&mut s, &mut asm, &plan).is_err());
		assert_eq!(s.lines().word(0x8000), ERASED_WORD);
		assert_eq!(s.lines().word(0x8007), ERASED_WORD);
	}

	#[test]
	fn program_needs_open_session() {
		let mut s = Session::with_defaults(SimTarget::new());
		let mut asm = blink();
		assert!(program(&mut s, &mut asm, &Plan::default()).is_err());
		assert!(!asm.is_frozen());
	}
}
