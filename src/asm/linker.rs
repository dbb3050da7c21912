use std::collections::HashMap;

use crate::config::Geometry;
use crate::icsp::{
	RowWriter,
	Verification,
};

use super::error::AsmError;
use super::instruction::{
	CALL_ADDRESS_MASK,
	Instruction,
};

/// Instruction at `address` needs the address of `symbol` patched in
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Relocation {
	pub address: usize,
	pub symbol: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UploadReport {
	pub rows: usize,
	pub failed: Vec<Verification>,
}

impl UploadReport {
	pub fn is_ok(&self) -> bool {
		self.failed.is_empty()
	}

	pub fn into_result(self) -> crate::AResult<()> {
		if self.failed.is_empty() {
			return Ok(());
		}
		let addresses: Vec<String> = self.failed.iter().map(|v| format!("0x{:04x}", v.address)).collect();
		bail!("Verify failed for {} of {} rows: {}", self.failed.len(), self.rows, addresses.join(", "))
	}
}

/// Program image under construction
///
/// Two passes: emitting collects labels and call sites, `link` patches all
/// call sites afterwards, so calls may reference labels defined later.
#[derive(Clone, Debug)]
pub struct Assembler {
	row_size: usize,
	program_words: usize,
	image: Vec<Instruction>,
	labels: HashMap<String, usize>,
	relocations: Vec<Relocation>,
	frozen: bool,
}

impl Assembler {
	pub fn new(geometry: &Geometry) -> Self {
		assert!(geometry.row_size > 0);
		Assembler {
			row_size: geometry.row_size,
			program_words: geometry.program_words,
			image: Vec::new(),
			labels: HashMap::new(),
			relocations: Vec::new(),
			frozen: false,
		}
	}

	/// address of the next emitted instruction
	pub fn here(&self) -> usize {
		self.image.len()
	}

	pub fn len(&self) -> usize {
		self.image.len()
	}

	pub fn is_empty(&self) -> bool {
		self.image.is_empty()
	}

	pub fn label(&self, name: &str) -> Option<usize> {
		self.labels.get(name).cloned()
	}

	pub fn relocations(&self) -> &[Relocation] {
		&self.relocations
	}

	pub fn is_frozen(&self) -> bool {
		self.frozen
	}

	/// Append `word`
	///
	/// With `is_call_site` the instruction gets `label`'s address patched in
	/// by `link`; otherwise `label` (if any) is defined at the address of
	/// `word`. Returns the address of `word`.
	pub fn emit_tagged(&mut self, word: Instruction, label: Option<&str>, is_call_site: bool) -> Result<usize, AsmError> {
		let address = self.image.len();
		if self.frozen {
			return Err(AsmError::Frozen { address });
		}
		match label {
			Some(name) if is_call_site => {
				self.relocations.push(Relocation {
					address,
					symbol: name.to_string(),
				});
			},
			Some(name) => {
				if let Some(&defined) = self.labels.get(name) {
					return Err(AsmError::DuplicateLabel { name: name.to_string(), address: defined });
				}
				self.labels.insert(name.to_string(), address);
			},
			None => (),
		}
		self.image.push(word);
		Ok(address)
	}

	pub fn emit(&mut self, word: Instruction) -> Result<usize, AsmError> {
		self.emit_tagged(word, None, false)
	}

	pub fn emit_label(&mut self, name: &str, word: Instruction) -> Result<usize, AsmError> {
		self.emit_tagged(word, Some(name), false)
	}

	pub fn emit_call(&mut self, name: &str) -> Result<usize, AsmError> {
		self.emit_tagged(Instruction::Call { address: 0 }, Some(name), true)
	}

	/// `word` turned into a CALL of `symbol`, as if emitted at `here()`
	pub fn resolve(&self, word: Instruction, symbol: &str) -> Result<Instruction, AsmError> {
		self.resolve_at(self.here(), word, symbol)
	}

	fn resolve_at(&self, address: usize, word: Instruction, symbol: &str) -> Result<Instruction, AsmError> {
		let target = match self.labels.get(symbol) {
			Some(&t) => t,
			None => return Err(AsmError::UnresolvedSymbol { name: symbol.to_string() }),
		};
		match word {
			Instruction::Call { .. } => Ok(Instruction::Call {
				address: target as u16 & CALL_ADDRESS_MASK,
			}),
			other => Err(AsmError::UnsupportedRelocation {
				mnemonic: other.mnemonic(),
				address,
				name: symbol.to_string(),
			}),
		}
	}

	/// Patch all call sites and pad with NOPs to a full row
	pub fn link(&mut self) -> Result<Vec<u16>, AsmError> {
		for r in &self.relocations {
			let resolved = self.resolve_at(r.address, self.image[r.address], &r.symbol)?;
			trace!("0x{:03x}: {} -> {}", r.address, r.symbol, resolved);
			self.image[r.address] = resolved;
		}
		while self.image.len() % self.row_size != 0 {
			self.image.push(Instruction::Nop);
		}
		Ok(self.image.iter().map(Instruction::encode).collect())
	}

	/// Link and program every row; failing rows don't stop the upload
	pub fn upload<W: RowWriter>(&mut self, writer: &mut W) -> crate::AResult<UploadReport> {
		ensure!(writer.row_size() == self.row_size,
			"Row size mismatch: image uses {} words, target {} words", self.row_size, writer.row_size()
		);
		let words = self.link()?;
		ensure!(words.len() <= self.program_words,
			"Image too large: {} words, program memory has {} words", words.len(), self.program_words
		);
		self.frozen = true;

		let mut report = UploadReport {
			rows: 0,
			failed: Vec::new(),
		};
		for (index, row) in words.chunks(self.row_size).enumerate() {
			let address = (index * self.row_size) as u32;
			let verification = writer.write_row(address, row)?;
			if !verification.is_ok() {
				error!("Row {}", verification);
				report.failed.push(verification);
			}
			report.rows += 1;
		}
		info!("Uploaded {} words in {} rows ({} failed)", words.len(), report.rows, report.failed.len());
		Ok(report)
	}
}
