use std::fmt;

use crate::config::RowCommit;
use crate::gpio::Lines;

use super::session::Session;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mismatch {
	pub address: u32,
	pub expected: u16,
	pub found: u16,
}

impl fmt::Display for Mismatch {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:04x}: expected 0x{:04x}, found 0x{:04x}", self.address, self.expected, self.found)
	}
}

/// Result of reading back programmed words
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Verification {
	pub address: u32,
	pub words: usize,
	pub mismatches: Vec<Mismatch>,
}

impl Verification {
	pub fn is_ok(&self) -> bool {
		self.mismatches.is_empty()
	}

	pub fn into_result(self) -> crate::AResult<()> {
		match self.mismatches.first() {
			None => Ok(()),
			Some(m) => bail!("Verify failed at {} ({} of {} words differ)", m, self.mismatches.len(), self.words),
		}
	}
}

impl fmt::Display for Verification {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		if self.is_ok() {
			write!(f, "0x{:04x}: {} words verified", self.address, self.words)
		} else {
			write!(f, "0x{:04x}: {} of {} words differ", self.address, self.mismatches.len(), self.words)?;
			for m in &self.mismatches {
				write!(f, "\n  {}", m)?;
			}
			Ok(())
		}
	}
}

/// Program one row and read it back
pub trait RowWriter {
	fn row_size(&self) -> usize;

	/// `data` must be exactly one row; `address` the first word of a row
	fn write_row(&mut self, address: u32, data: &[u16]) -> crate::AResult<Verification>;
}

impl<L: Lines> RowWriter for Session<L> {
	fn row_size(&self) -> usize {
		self.geometry().row_size
	}

	fn write_row(&mut self, address: u32, data: &[u16]) -> crate::AResult<Verification> {
		let row_size = self.row_size();
		ensure!(data.len() == row_size, "Row data has {} words, need exactly {}", data.len(), row_size);
		ensure!(self.geometry().row_base(address) == address, "Row address 0x{:04x} not aligned to {} words", address, row_size);

		// fill write latches, then program them at once
		self.write_words(address, data)?;
		self.set_program_counter(address)?;
		match self.geometry().row_commit {
			RowCommit::Internal => self.begin_internal_programming()?,
			RowCommit::External => {
				self.begin_external_programming()?;
				self.end_external_programming()?;
			},
		}

		let found = self.read_words(address, data.len())?;
		let mismatches: Vec<Mismatch> = data.iter().zip(found.iter()).enumerate()
			.filter(|&(_, (e, f))| e != f)
			.map(|(i, (&expected, &found))| Mismatch {
				address: address + i as u32,
				expected,
				found,
			})
			.collect();

		let verification = Verification {
			address,
			words: data.len(),
			mismatches,
		};
		debug!("Row {}", verification);
		Ok(verification)
	}
}

impl<L: Lines> Session<L> {
	/// Program a single word (user ID / configuration) and read it back
	///
	/// Only bits in `mask` are compared.
	pub fn program_word(&mut self, address: u32, value: u16, mask: u16) -> crate::AResult<Verification> {
		self.set_program_counter(address)?;
		self.write_word(value)?;
		self.commit()?;
		let found = self.read_word()?;

		let mut mismatches = Vec::new();
		if found & mask != value & mask {
			mismatches.push(Mismatch {
				address,
				expected: value,
				found,
			});
		}
		Ok(Verification {
			address,
			words: 1,
			mismatches,
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::config::{
		Geometry,
		Timing,
	};
	use crate::gpio::SimTarget;

	fn open(geometry: Geometry) -> Session<SimTarget> {
		let mut s = Session::new(SimTarget::new(), Timing::default(), geometry);
		s.open().expect("open session");
		s.lines().clear_commands();
		s
	}

	fn row(seed: u16) -> Vec<u16> {
		(0..32u16).map(|i| (seed.wrapping_mul(31).wrapping_add(i * 0x111)) & 0x3fff).collect()
	}

	#[test]
	fn write_row_programs_and_verifies() {
		let mut s = open(Geometry::PIC16F152XX);
		let data = row(7);
		let v = s.write_row(0x40, &data).unwrap();
		assert!(v.is_ok(), "{}", v);
		assert_eq!(v.words, 32);
		for (i, &w) in data.iter().enumerate() {
			assert_eq!(s.lines().word(0x40 + i as u32), w);
		}
	}

	#[test]
	fn write_row_rejects_wrong_length() {
		let mut s = open(Geometry::PIC16F152XX);
		let elapsed = s.lines().elapsed();
		assert!(s.write_row(0, &[0u16; 31]).is_err());
		assert!(s.write_row(0, &[0u16; 33]).is_err());
		assert!(s.write_row(0, &[]).is_err());
		assert!(s.lines().commands().is_empty());
		assert_eq!(s.lines().elapsed(), elapsed);
	}

	#[test]
	fn write_row_rejects_unaligned_address() {
		let mut s = open(Geometry::PIC16F152XX);
		assert!(s.write_row(0x10, &row(1)).is_err());
		assert!(s.lines().commands().is_empty());
	}

	#[test]
	fn write_row_reports_all_mismatches() {
		let mut s = open(Geometry::PIC16F152XX);
		s.lines().stick_low(0x22, 0x0001);
		s.lines().stick_low(0x3f, 0x2000);
		let data = vec![0x3fff; 32];
		let v = s.write_row(0x20, &data).unwrap();
		assert!(!v.is_ok());
		assert_eq!(v.mismatches, vec![
			Mismatch { address: 0x22, expected: 0x3fff, found: 0x3ffe },
			Mismatch { address: 0x3f, expected: 0x3fff, found: 0x1fff },
		]);
		assert!(v.into_result().is_err());
	}

	#[test]
	fn write_row_commits_once() {
		let mut s = open(Geometry::PIC16F152XX);
		s.write_row(0, &row(3)).unwrap();
		let commits = s.lines().commands().iter()
			.filter(|&&op| op == crate::icsp::opcode::BEGIN_INT_PROGRAM)
			.count();
		assert_eq!(commits, 1);
	}

	#[test]
	fn write_row_external_commit() {
		let geometry = Geometry {
			row_commit: RowCommit::External,
			..Geometry::PIC16F152XX
		};
		let mut s = open(geometry);
		let v = s.write_row(0x60, &row(9)).unwrap();
		assert!(v.is_ok(), "{}", v);
		let ops = s.lines().commands();
		assert!(ops.contains(&crate::icsp::opcode::BEGIN_EXT_PROGRAM));
		assert!(ops.contains(&crate::icsp::opcode::END_EXT_PROGRAM));
		assert!(!ops.contains(&crate::icsp::opcode::BEGIN_INT_PROGRAM));
	}

	#[test]
	fn program_word_masked_compare() {
		let mut s = open(Geometry::PIC16F152XX);
		s.lines().stick_high(0x8008, 0x0c00);
		// bits reading back as one where zero was written only fail a full compare
		let v = s.program_word(0x8008, 0x3218, 0x3218).unwrap();
		assert!(v.is_ok(), "{}", v);
		let v = s.program_word(0x8008, 0x3218, 0x3fff).unwrap();
		assert_eq!(v.mismatches, vec![Mismatch { address: 0x8008, expected: 0x3218, found: 0x3e18 }]);
	}

	#[test]
	fn program_word_detects_missing_bits() {
		let mut s = open(Geometry::PIC16F152XX);
		s.lines().stick_low(0x8000, 0x0001);
		let v = s.program_word(0x8000, 0x0011, 0x0011).unwrap();
		assert_eq!(v.mismatches.len(), 1);
		assert_eq!(v.mismatches[0].found, 0x0010);
	}
}
