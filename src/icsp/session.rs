use crate::config::{
	address,
	Geometry,
	LVP_KEY,
	REVISION_ID_MASK,
	Timing,
};
use crate::gpio::{
	Direction,
	Line,
	Lines,
};

use super::device::{
	Characteristics,
	DeviceInfo,
	DeviceInformationArea,
};
use super::opcode;
use super::transfer::Transfer;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum SessionState {
	Closed,
	Entering,
	Ready,
	Exiting,
}

/// Programming mode session with one target
///
/// Owns the lines for its whole lifetime. Leaves programming mode on `close`
/// or when dropped.
pub struct Session<L: Lines> {
	wire: Transfer<L>,
	geometry: Geometry,
	state: SessionState,
	device: Option<DeviceInfo>,
}

impl<L: Lines> Session<L> {
	pub fn new(lines: L, timing: Timing, geometry: Geometry) -> Self {
		Session {
			wire: Transfer::new(lines, timing, geometry.payload_bits),
			geometry,
			state: SessionState::Closed,
			device: None,
		}
	}

	pub fn with_defaults(lines: L) -> Self {
		Self::new(lines, Timing::default(), Geometry::default())
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn is_open(&self) -> bool {
		self.state == SessionState::Ready
	}

	pub fn geometry(&self) -> &Geometry {
		&self.geometry
	}

	/// identification read while opening; `None` before the first `open`
	pub fn device(&self) -> Option<&DeviceInfo> {
		self.device.as_ref()
	}

	pub fn lines(&mut self) -> &mut L {
		self.wire.lines()
	}

	fn ensure_active(&self) -> crate::AResult<()> {
		match self.state {
			SessionState::Ready | SessionState::Entering => Ok(()),
			s => bail!("ICSP session not open (state: {:?})", s),
		}
	}

	pub fn open(&mut self) -> crate::AResult<DeviceInfo> {
		ensure!(self.state == SessionState::Closed, "ICSP session already open");
		info!("Entering low-voltage programming mode");
		self.state = SessionState::Entering;
		self.enter();

		let device = match self.identify() {
			Ok(d) => d,
			Err(e) => {
				self.close();
				return Err(e);
			},
		};
		info!("{}", device);
		for line in device.characteristics.to_string().lines() {
			info!("{}", line);
		}
		if !device.is_plausible() {
			warn!("Device ID 0x{:04x} doesn't look like a target answering; check wiring", device.device_id);
		}
		if device.characteristics.erase_row_size as usize != self.geometry.row_size {
			warn!(
				"Target reports erase row size of {} words, programming with {} words",
				device.characteristics.erase_row_size,
				self.geometry.row_size,
			);
		}
		if device.characteristics.program_words() != self.geometry.program_words {
			warn!(
				"Target reports {} words of program memory, image limit is {} words",
				device.characteristics.program_words(),
				self.geometry.program_words,
			);
		}

		self.device = Some(device);
		self.state = SessionState::Ready;
		Ok(device)
	}

	fn enter(&mut self) {
		let timing = *self.wire.timing();
		let has_power = self.wire.lines().has_line(Line::Power);
		let lines = self.wire.lines();

		for &line in Line::ALL.iter() {
			lines.set_direction(line, Direction::Output);
			lines.set_level(line, false);
		}

		lines.set_level(Line::Mclr, true);
		lines.delay(timing.entry_setup);
		if has_power {
			lines.set_level(Line::Power, true);
		}
		lines.delay(timing.entry_hold);

		// synchronizing pulse
		lines.set_level(Line::Data, true);
		lines.set_level(Line::Clock, true);
		lines.delay(timing.clock_high);
		lines.set_level(Line::Clock, false);
		lines.delay(timing.clock_low);
		lines.delay(timing.entry_settle);

		lines.set_level(Line::Mclr, false);
		lines.delay(timing.entry_hold);

		self.wire.transmit(LVP_KEY, 32);
		self.wire.delay(timing.entry_hold);
	}

	fn identify(&mut self) -> crate::AResult<DeviceInfo> {
		Ok(DeviceInfo {
			device_id: self.device_id()?,
			revision_id: self.revision_id()?,
			characteristics: self.device_characteristics()?,
		})
	}

	/// Leave programming mode; does nothing if already closed
	pub fn close(&mut self) {
		if self.state == SessionState::Closed {
			return;
		}
		self.state = SessionState::Exiting;

		let timing = *self.wire.timing();
		let lines = self.wire.lines();
		for &line in Line::ALL.iter() {
			lines.set_direction(line, Direction::Output);
		}
		lines.set_level(Line::Clock, false);
		lines.delay(timing.clock_low);
		lines.set_level(Line::Clock, true);
		lines.delay(timing.clock_high);
		lines.set_level(Line::Clock, false);
		lines.set_level(Line::Data, false);
		lines.set_level(Line::Power, false);
		lines.delay(timing.exit);
		lines.set_level(Line::Mclr, false);

		self.state = SessionState::Closed;
		info!("Left low-voltage programming mode");
	}

	/// Close the session and let the target run (power on, MCLR released)
	pub fn release(&mut self) {
		self.close();
		let timing = *self.wire.timing();
		let lines = self.wire.lines();
		if lines.has_line(Line::Power) {
			lines.set_level(Line::Power, true);
			lines.delay(timing.entry_hold);
		}
		lines.set_level(Line::Mclr, true);
		info!("Target released");
	}

	pub fn set_program_counter(&mut self, address: u32) -> crate::AResult<()> {
		self.ensure_active()?;
		self.wire.command(opcode::SET_PC);
		self.wire.transmit_payload(address);
		Ok(())
	}

	pub fn increment_program_counter(&mut self) -> crate::AResult<()> {
		self.ensure_active()?;
		self.wire.command(opcode::INC_PC);
		Ok(())
	}

	/// read NVM word at PC
	pub fn read_word(&mut self) -> crate::AResult<u16> {
		self.ensure_active()?;
		self.wire.command(opcode::READ_NVM);
		Ok(self.wire.receive_payload() as u16)
	}

	pub fn read_words(&mut self, address: u32, count: usize) -> crate::AResult<Vec<u16>> {
		self.set_program_counter(address)?;
		let mut words = Vec::with_capacity(count);
		for _ in 0..count {
			self.wire.command(opcode::READ_NVM_INC);
			words.push(self.wire.receive_payload() as u16);
		}
		Ok(words)
	}

	/// load write latch at PC
	pub fn write_word(&mut self, value: u16) -> crate::AResult<()> {
		self.ensure_active()?;
		self.wire.command(opcode::LOAD_NVM);
		self.wire.transmit_payload(value as u32);
		Ok(())
	}

	pub fn write_words(&mut self, address: u32, values: &[u16]) -> crate::AResult<()> {
		self.set_program_counter(address)?;
		for &value in values {
			self.wire.command(opcode::LOAD_NVM_INC);
			self.wire.transmit_payload(value as u32);
		}
		Ok(())
	}

	pub fn bulk_erase(&mut self) -> crate::AResult<()> {
		self.ensure_active()?;
		debug!("Bulk erase");
		self.wire.command(opcode::BULK_ERASE);
		let d = self.wire.timing().bulk_erase;
		self.wire.delay(d);
		Ok(())
	}

	/// erase the row addressed by PC
	pub fn row_erase(&mut self) -> crate::AResult<()> {
		self.ensure_active()?;
		self.wire.command(opcode::ROW_ERASE);
		let d = self.wire.timing().row_erase;
		self.wire.delay(d);
		Ok(())
	}

	pub fn begin_internal_programming(&mut self) -> crate::AResult<()> {
		self.ensure_active()?;
		self.wire.command(opcode::BEGIN_INT_PROGRAM);
		let d = self.wire.timing().internal_program;
		self.wire.delay(d);
		Ok(())
	}

	/// commit loaded write latches (internally timed)
	pub fn commit(&mut self) -> crate::AResult<()> {
		self.begin_internal_programming()
	}

	pub fn begin_external_programming(&mut self) -> crate::AResult<()> {
		self.ensure_active()?;
		self.wire.command(opcode::BEGIN_EXT_PROGRAM);
		let d = self.wire.timing().external_program;
		self.wire.delay(d);
		Ok(())
	}

	pub fn end_external_programming(&mut self) -> crate::AResult<()> {
		self.ensure_active()?;
		self.wire.command(opcode::END_EXT_PROGRAM);
		let d = self.wire.timing().discharge;
		self.wire.delay(d);
		Ok(())
	}

	fn read_word_at(&mut self, address: u32) -> crate::AResult<u16> {
		self.set_program_counter(address)?;
		self.read_word()
	}

	pub fn device_id(&mut self) -> crate::AResult<u16> {
		self.read_word_at(address::DEVICE_ID)
	}

	pub fn revision_id(&mut self) -> crate::AResult<u16> {
		Ok(self.read_word_at(address::REVISION_ID)? & REVISION_ID_MASK)
	}

	pub fn device_characteristics(&mut self) -> crate::AResult<Characteristics> {
		Ok(Characteristics {
			erase_row_size: self.read_word_at(address::ERASE_ROW_SIZE)?,
			write_latches: self.read_word_at(address::WRITE_LATCHES)?,
			user_rows: self.read_word_at(address::USER_ROWS)?,
			eeprom_size: self.read_word_at(address::EEPROM_SIZE)?,
			pin_count: self.read_word_at(address::PIN_COUNT)?,
		})
	}

	pub fn device_information(&mut self) -> crate::AResult<DeviceInformationArea> {
		Ok(DeviceInformationArea {
			microchip_uid: self.read_words(address::MICROCHIP_UID, address::MICROCHIP_UID_WORDS)?,
			external_uid: self.read_words(address::EXTERNAL_UID, address::EXTERNAL_UID_WORDS)?,
		})
	}
}

impl<L: Lines> Drop for Session<L> {
	fn drop(&mut self) {
		self.close();
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::config::ERASED_WORD;
	use crate::gpio::SimTarget;

	fn open() -> Session<SimTarget> {
		let mut s = Session::with_defaults(SimTarget::new());
		s.open().expect("open session");
		s
	}

	#[test]
	fn open_identifies_device() {
		let mut s = open();
		assert!(s.is_open());
		assert!(s.lines().in_programming_mode());
		let d = *s.device().expect("device info");
		assert_eq!(d.device_id, SimTarget::DEVICE_ID);
		assert_eq!(d.revision_id, SimTarget::REVISION_ID & REVISION_ID_MASK);
		assert_eq!(d.characteristics.erase_row_size, 32);
		assert_eq!(d.characteristics.pin_count, 8);
		assert_eq!(d.characteristics.program_words(), s.geometry().program_words);
	}

	#[test]
	fn commands_require_open_session() {
		let mut s = Session::with_defaults(SimTarget::new());
		assert!(s.set_program_counter(0).is_err());
		assert!(s.read_word().is_err());
		assert!(s.bulk_erase().is_err());
		assert!(s.lines().commands().is_empty());
	}

	#[test]
	fn open_twice_fails() {
		let mut s = open();
		assert!(s.open().is_err());
		assert!(s.is_open());
	}

	#[test]
	fn close_is_idempotent() {
		let mut s = open();
		s.close();
		assert_eq!(s.state(), SessionState::Closed);
		assert!(!s.lines().in_programming_mode());
		let elapsed = s.lines().elapsed();
		s.close();
		assert_eq!(s.lines().elapsed(), elapsed);
		assert!(s.read_word().is_err());
	}

	#[test]
	fn reopen_after_close() {
		let mut s = open();
		s.close();
		s.open().expect("reopen");
		assert_eq!(s.device_id().unwrap(), SimTarget::DEVICE_ID);
	}

	#[test]
	fn works_without_power_line() {
		let mut s = Session::with_defaults(SimTarget::without_power_line());
		let d = s.open().expect("open session");
		assert_eq!(d.device_id, SimTarget::DEVICE_ID);
	}

	#[test]
	fn release_leaves_programming_mode() {
		let mut s = open();
		s.release();
		assert!(!s.is_open());
		assert!(!s.lines().in_programming_mode());
		assert!(s.lines().read_level(Line::Mclr));
		assert!(s.lines().read_level(Line::Power));
	}

	#[test]
	fn bulk_erase_blanks_first_row() {
		let mut s = open();
		for a in 0..32 {
			s.lines().set_word(a, a as u16);
		}
		s.bulk_erase().unwrap();
		let row_size = s.geometry().row_size;
		let words = s.read_words(0, row_size).unwrap();
		assert_eq!(words, vec![ERASED_WORD; row_size]);
	}

	#[test]
	fn bulk_erase_waits() {
		let mut s = open();
		let before = s.lines().elapsed();
		s.bulk_erase().unwrap();
		assert!(s.lines().elapsed() - before >= Timing::PIC16F152XX.bulk_erase);
	}

	#[test]
	fn row_erase_only_touches_addressed_row() {
		let mut s = open();
		s.lines().set_word(0x05, 0x0123);
		s.lines().set_word(0x25, 0x0456);
		s.set_program_counter(0x20).unwrap();
		s.row_erase().unwrap();
		assert_eq!(s.read_words(0x05, 1).unwrap(), vec![0x0123]);
		assert_eq!(s.read_words(0x25, 1).unwrap(), vec![ERASED_WORD]);
	}

	#[test]
	fn write_word_and_commit() {
		let mut s = open();
		s.set_program_counter(0x10).unwrap();
		s.write_word(0x2abc).unwrap();
		s.commit().unwrap();
		assert_eq!(s.read_word().unwrap(), 0x2abc);
		assert_eq!(s.lines().word(0x10), 0x2abc);
	}

	#[test]
	fn write_words_then_read_back() {
		let mut s = open();
		let values = [0x0001, 0x0002, 0x3000, 0x1fff];
		s.write_words(0x40, &values).unwrap();
		s.set_program_counter(0x40).unwrap();
		s.begin_external_programming().unwrap();
		s.end_external_programming().unwrap();
		assert_eq!(s.read_words(0x40, values.len()).unwrap(), values.to_vec());
	}

	#[test]
	fn increment_program_counter() {
		let mut s = open();
		s.lines().set_word(0x101, 0x0777);
		s.set_program_counter(0x100).unwrap();
		s.increment_program_counter().unwrap();
		assert_eq!(s.read_word().unwrap(), 0x0777);
	}

	#[test]
	fn reads_device_information_area() {
		let mut s = open();
		let dia = s.device_information().unwrap();
		assert_eq!(dia.microchip_uid.len(), address::MICROCHIP_UID_WORDS);
		assert_eq!(dia.microchip_uid[0], 0x1000);
		assert_eq!(dia.microchip_uid[8], 0x1008);
		assert_eq!(dia.external_uid.len(), address::EXTERNAL_UID_WORDS);
		assert_eq!(dia.external_uid[7], 0x2007);
	}
}
