use std::io;

/// Output stage of both lines.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Drive {
	/// Line is actively driven high and low.
	PushPull,
	/// Line is only pulled low; "high" releases it to the pull-up, so another
	/// participant can still pull it low (needed to sample an acknowledge).
	OpenDrain,
}

/// Direction of the data line; the clock line is always an output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	Output,
	Input,
}

/// The two physical wires of the bus.
///
/// `true` is a high level. Implementations don't report errors per call:
/// electrical faults are undetectable at this layer. Backends that can fail
/// for other reasons (e.g. file I/O) remember the first error and hand it out
/// through `take_fault`.
pub trait Lines {
	/// Make both lines outputs with the given drive mode.
	fn configure(&mut self, drive: Drive);

	fn set_data_direction(&mut self, direction: Direction);

	fn set_clock(&mut self, high: bool);

	/// Sets the output latch; only visible on the wire while data is an output.
	fn set_data(&mut self, high: bool);

	fn read_data(&mut self) -> bool;

	fn take_fault(&mut self) -> Option<io::Error> {
		None
	}
}

impl<'a, L: Lines + ?Sized> Lines for &'a mut L {
	fn configure(&mut self, drive: Drive) {
		(**self).configure(drive)
	}

	fn set_data_direction(&mut self, direction: Direction) {
		(**self).set_data_direction(direction)
	}

	fn set_clock(&mut self, high: bool) {
		(**self).set_clock(high)
	}

	fn set_data(&mut self, high: bool) {
		(**self).set_data(high)
	}

	fn read_data(&mut self) -> bool {
		(**self).read_data()
	}

	fn take_fault(&mut self) -> Option<io::Error> {
		(**self).take_fault()
	}
}

impl<L: Lines + ?Sized> Lines for Box<L> {
	fn configure(&mut self, drive: Drive) {
		(**self).configure(drive)
	}

	fn set_data_direction(&mut self, direction: Direction) {
		(**self).set_data_direction(direction)
	}

	fn set_clock(&mut self, high: bool) {
		(**self).set_clock(high)
	}

	fn set_data(&mut self, high: bool) {
		(**self).set_data(high)
	}

	fn read_data(&mut self) -> bool {
		(**self).read_data()
	}

	fn take_fault(&mut self) -> Option<io::Error> {
		(**self).take_fault()
	}
}
