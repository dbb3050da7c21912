/// Digital lines of the ICSP connector
///
/// - MCLR: reset; high runs the target, low (after the key sequence) keeps it
///   in programming mode
/// - ICSPCLK: clock, always driven by the host
/// - ICSPDAT: data, driven by the host except while reading a payload
/// - VDD: optional target power switch

mod lines;
mod rpi;
mod sim;

pub use self::lines::{
	Direction,
	Line,
	Lines,
	reliable_sleep,
};

pub use self::rpi::{
	GpioBank,
	RpiGpio,
};

pub use self::sim::SimTarget;
