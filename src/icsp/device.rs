use std::fmt;

/// Device configuration information (DCI), as reported by the target
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Characteristics {
	pub erase_row_size: u16,  // words
	pub write_latches: u16,   // words per row
	pub user_rows: u16,       // user erasable rows
	pub eeprom_size: u16,     // bytes
	pub pin_count: u16,
}

impl Characteristics {
	/// program memory size in words
	pub fn program_words(&self) -> usize {
		self.erase_row_size as usize * self.user_rows as usize
	}
}

impl fmt::Display for Characteristics {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "Erase row size: {} words", self.erase_row_size)?;
		writeln!(f, "Write latches per row: {} words", self.write_latches)?;
		writeln!(f, "User erasable rows: {} rows", self.user_rows)?;
		writeln!(f, "Data EEPROM size: {} bytes", self.eeprom_size)?;
		write!(f, "Pin count: {} pins", self.pin_count)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DeviceInfo {
	pub device_id: u16,
	pub revision_id: u16, // already masked
	pub characteristics: Characteristics,
}

impl DeviceInfo {
	// MJRREV[11:6], MNRREV[5:0]; major revision 0 is "A"
	pub fn major_revision(&self) -> u8 {
		((self.revision_id >> 6) & 0x3f) as u8
	}

	pub fn minor_revision(&self) -> u8 {
		(self.revision_id & 0x3f) as u8
	}

	/// 0x0000 / 0x3fff: nothing answered (or the key wasn't accepted)
	pub fn is_plausible(&self) -> bool {
		self.device_id != 0x0000 && self.device_id != 0x3fff
	}
}

impl fmt::Display for DeviceInfo {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let major = self.major_revision();
		if major < 26 {
			write!(f, "Device 0x{:04x} rev. {}{}", self.device_id, (b'A' + major) as char, self.minor_revision())
		} else {
			write!(f, "Device 0x{:04x} rev. 0x{:03x}", self.device_id, self.revision_id)
		}
	}
}

/// Device information area (DIA)
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DeviceInformationArea {
	pub microchip_uid: Vec<u16>,
	pub external_uid: Vec<u16>,
}

fn write_words(f: &mut fmt::Formatter, words: &[u16]) -> fmt::Result {
	for (i, w) in words.iter().enumerate() {
		if i > 0 {
			f.write_str(" ")?;
		}
		write!(f, "{:04x}", w)?;
	}
	Ok(())
}

impl fmt::Display for DeviceInformationArea {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("Microchip unique ID: ")?;
		write_words(f, &self.microchip_uid)?;
		f.write_str("\nExternal unique ID: ")?;
		write_words(f, &self.external_uid)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn info(revision_id: u16) -> DeviceInfo {
		DeviceInfo {
			device_id: 0x30e3,
			revision_id,
			characteristics: Characteristics {
				erase_row_size: 32,
				write_latches: 32,
				user_rows: 64,
				eeprom_size: 0,
				pin_count: 8,
			},
		}
	}

	#[test]
	fn revision_letter() {
		assert_eq!(info(0x002).to_string(), "Device 0x30e3 rev. A2");
		assert_eq!(info(0x041).to_string(), "Device 0x30e3 rev. B1");
	}

	#[test]
	fn program_words_from_characteristics() {
		assert_eq!(info(0).characteristics.program_words(), 2048);
	}

	#[test]
	fn blank_id_is_not_plausible() {
		let mut i = info(0);
		assert!(i.is_plausible());
		i.device_id = 0;
		assert!(!i.is_plausible());
		i.device_id = 0x3fff;
		assert!(!i.is_plausible());
	}
}
