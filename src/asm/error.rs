use failure::Fail;

#[derive(Clone, PartialEq, Eq, Debug, Fail)]
pub enum AsmError {
	#[fail(display = "label {:?} already defined at 0x{:03x}", name, address)]
	DuplicateLabel { name: String, address: usize },

	#[fail(display = "unresolved symbol {:?}", name)]
	UnresolvedSymbol { name: String },

	#[fail(display = "relocation of {} at 0x{:03x} to {:?} not implemented (only CALL targets)", mnemonic, address, name)]
	UnsupportedRelocation { mnemonic: &'static str, address: usize, name: String },

	#[fail(display = "image already uploaded, can't emit at 0x{:03x}", address)]
	Frozen { address: usize },
}
