use std::fmt;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

// sleep for at least `duration`; `thread::sleep` may wake up early on signals
pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Lines of the ICSP connector
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Line {
	Mclr,
	Clock,
	Data,
	Power,
}

impl Line {
	pub const ALL: [Line; 4] = [Line::Mclr, Line::Clock, Line::Data, Line::Power];
}

impl fmt::Display for Line {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let name = match self {
			Line::Mclr => "MCLR",
			Line::Clock => "ICSPCLK",
			Line::Data => "ICSPDAT",
			Line::Power => "VDD",
		};
		f.write_str(name)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	Input,
	Output,
}

/// Digital lines wired to the target
///
/// All operations take effect immediately. `true` is a high level.
pub trait Lines {
	fn set_direction(&mut self, line: Line, direction: Direction);
	fn set_level(&mut self, line: Line, high: bool);
	fn read_level(&mut self, line: Line) -> bool;

	// the power line is optional; targets may be powered externally
	fn has_line(&self, line: Line) -> bool {
		let _ = line;
		true
	}

	// block for (at least) `duration`
	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

impl<'a, L: ?Sized + Lines> Lines for &'a mut L {
	fn set_direction(&mut self, line: Line, direction: Direction) {
		L::set_direction(*self, line, direction)
	}
	fn set_level(&mut self, line: Line, high: bool) {
		L::set_level(*self, line, high)
	}
	fn read_level(&mut self, line: Line) -> bool {
		L::read_level(*self, line)
	}
	fn has_line(&self, line: Line) -> bool {
		L::has_line(*self, line)
	}
	fn delay(&mut self, duration: Duration) {
		L::delay(*self, duration)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn reliable_sleep_never_returns_early() {
		let d = Duration::from_millis(2);
		let now = Instant::now();
		reliable_sleep(d);
		assert!(now.elapsed() >= d);
	}
}
