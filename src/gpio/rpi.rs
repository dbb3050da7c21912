/* BCM2711 (Raspberry Pi 4) GPIO register block */

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::io::FromRawFd;
use std::path::{
	Path,
	PathBuf,
};
use std::ptr;

use libc::{
	MAP_SHARED,
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	PROT_READ,
	PROT_WRITE,
	c_void,
	mmap,
	munmap,
	off_t,
	open,
};

use super::{
	Direction,
	Line,
	Lines,
};
use crate::config::PinMap;

pub const GPIOMEM_PATH: &str = "/dev/gpiomem";
pub const DEVMEM_PATH: &str = "/dev/mem";
// physical address of the GPIO block; only needed for /dev/mem
pub const GPIO_BASE: u64 = 0xfe00_0000 + 0x20_0000;

const BLOCK_SIZE: usize = 4 * 1024;

// word offsets into the register block
const GPFSEL0: usize = 0;
const GPSET0: usize = 7;
const GPCLR0: usize = 10;
const GPLEV0: usize = 13;

// GPSET/GPCLR/GPLEV come in pairs: GPIO 0..31 in the first word, 32..53 in
// the second
fn bank_bit(pin: u8) -> (usize, u32) {
	(pin as usize / 32, 1u32 << (pin % 32))
}

const FSEL_MASK: u32 = 0b111;
const FSEL_OUTPUT: u32 = 0b001;

#[derive(Debug)]
struct Mapped {
	ptr: ptr::NonNull<u32>,
	len: usize,
}

impl Drop for Mapped {
	fn drop(&mut self) {
		unsafe {
			let res = munmap(
				self.ptr.as_ptr() as *mut c_void,
				self.len,
			);
			if 0 != res {
				panic!("munmap failed: {}", io::Error::last_os_error());
			}
		}
	}
}

impl Mapped {
	fn read_word(&self, index: usize) -> u32 {
		assert!(index * 4 < self.len);
		unsafe { ptr::read_volatile(self.ptr.as_ptr().add(index)) }
	}

	fn write_word(&mut self, index: usize, data: u32) {
		assert!(index * 4 < self.len);
		unsafe { ptr::write_volatile(self.ptr.as_ptr().add(index), data) }
	}
}

fn map_registers(path: &Path, offset: u64) -> io::Result<Mapped> {
	let path = CString::new(path.to_string_lossy().into_owned())?;

	let fd = unsafe { open(path.as_ptr(), O_RDWR | O_SYNC | O_CLOEXEC) };
	if -1 == fd {
		return Err(io::Error::last_os_error());
	}
	// closes the fd once mapped (or on error)
	let _f = unsafe { fs::File::from_raw_fd(fd) };

	let area = unsafe {
		mmap(
			ptr::null_mut(),
			BLOCK_SIZE,
			PROT_READ | PROT_WRITE,
			MAP_SHARED,
			fd,
			offset as off_t,
		)
	};

	if area as usize == !0usize {
		return Err(io::Error::last_os_error());
	}
	match ptr::NonNull::new(area as *mut u32) {
		None => panic!("mmap shouldn't return NULL ever"),
		Some(area) => Ok(Mapped {
			ptr: area,
			len: BLOCK_SIZE,
		}),
	}
}

/// Owned handle to the GPIO register window
///
/// The window gets mapped at most once; `init` on an initialized handle does
/// nothing.
#[derive(Debug)]
pub struct GpioBank {
	path: PathBuf,
	offset: u64,
	registers: Option<Mapped>,
}

impl GpioBank {
	/// `/dev/gpiomem`: only the GPIO block, no root needed
	pub fn gpiomem() -> Self {
		GpioBank {
			path: PathBuf::from(GPIOMEM_PATH),
			offset: 0,
			registers: None,
		}
	}

	/// `/dev/mem` at the physical GPIO address
	pub fn devmem() -> Self {
		GpioBank {
			path: PathBuf::from(DEVMEM_PATH),
			offset: GPIO_BASE,
			registers: None,
		}
	}

	pub fn is_initialized(&self) -> bool {
		self.registers.is_some()
	}

	pub fn init(&mut self) -> crate::AResult<()> {
		if self.is_initialized() {
			return Ok(());
		}
		let path = self.path.clone();
		let offset = self.offset;
		let registers = with_context!(("couldn't map GPIO registers from {}", path.display()), {
			Ok(map_registers(&path, offset)?)
		})?;
		debug!("mapped GPIO registers from {} at offset 0x{:x}", path.display(), offset);
		self.registers = Some(registers);
		Ok(())
	}

	/// Hand out the lines; the bank must be initialized
	pub fn into_lines(self, pins: PinMap) -> crate::AResult<RpiGpio> {
		let registers = match self.registers {
			Some(r) => r,
			None => bail!("GPIO bank {} not initialized", self.path.display()),
		};
		for &pin in [pins.mclr, pins.clock, pins.data].iter().chain(pins.power.iter()) {
			ensure!(pin < 54, "invalid BCM GPIO number {}", pin);
		}
		Ok(RpiGpio { registers, pins })
	}
}

/// ICSP lines on Raspberry Pi GPIOs
#[derive(Debug)]
pub struct RpiGpio {
	registers: Mapped,
	pins: PinMap,
}

impl RpiGpio {
	pub fn open(bank: GpioBank, pins: PinMap) -> crate::AResult<Self> {
		let mut bank = bank;
		bank.init()?;
		bank.into_lines(pins)
	}

	fn pin(&self, line: Line) -> Option<u8> {
		match line {
			Line::Mclr => Some(self.pins.mclr),
			Line::Clock => Some(self.pins.clock),
			Line::Data => Some(self.pins.data),
			Line::Power => self.pins.power,
		}
	}
}

impl Lines for RpiGpio {
	fn set_direction(&mut self, line: Line, direction: Direction) {
		let pin = match self.pin(line) {
			Some(p) => p as usize,
			None => return,
		};
		let index = GPFSEL0 + pin / 10;
		let shift = (pin % 10) * 3;
		let mut fsel = self.registers.read_word(index) & !(FSEL_MASK << shift);
		if direction == Direction::Output {
			fsel |= FSEL_OUTPUT << shift;
		}
		self.registers.write_word(index, fsel);
	}

	fn set_level(&mut self, line: Line, high: bool) {
		let pin = match self.pin(line) {
			Some(p) => p,
			None => return,
		};
		let (offset, bit) = bank_bit(pin);
		let register = if high { GPSET0 } else { GPCLR0 };
		self.registers.write_word(register + offset, bit);
	}

	fn read_level(&mut self, line: Line) -> bool {
		match self.pin(line) {
			Some(pin) => {
				let (offset, bit) = bank_bit(pin);
				0 != self.registers.read_word(GPLEV0 + offset) & bit
			},
			None => false,
		}
	}

	fn has_line(&self, line: Line) -> bool {
		self.pin(line).is_some()
	}
}
