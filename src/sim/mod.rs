//! In-memory bus for tests and dry runs.
//!
//! `SimBus` implements `Lines` on top of a simulated peripheral: the data
//! wire is the wired-AND of what the master drives and what the peripheral
//! pulls low (both lines have pull-ups). Time only advances through
//! `SimDelay`, so a whole SHT15 conversion runs in microseconds of real time.
//! Every master action is recorded in a `Waveform`.

mod i2c_device;
mod sht15_device;
mod waveform;

use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

pub use self::i2c_device::{
	EchoDevice,
	I2cHandler,
	I2cSlave,
	MemoryDevice,
	Next,
};
pub use self::sht15_device::Sht15Device;
pub use self::waveform::{
	Event,
	EventKind,
	Waveform,
};

use crate::bus::Bus;
use crate::config::BusConfig;
use crate::lines::{
	Direction,
	Drive,
	Lines,
};
use crate::timing::Delay;

/// Levels on the wires (`true`: high).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Levels {
	pub clock: bool,
	pub data: bool,
}

impl Levels {
	pub fn rising_clock(self, previous: Levels) -> bool {
		!previous.clock && self.clock
	}

	pub fn falling_clock(self, previous: Levels) -> bool {
		previous.clock && !self.clock
	}

	/// data fell while clock stayed high
	pub fn start_condition(self, previous: Levels) -> bool {
		previous.clock && self.clock && previous.data && !self.data
	}

	/// data rose while clock stayed high
	pub fn stop_condition(self, previous: Levels) -> bool {
		previous.clock && self.clock && !previous.data && self.data
	}
}

/// Shared virtual time.
#[derive(Clone, Debug, Default)]
pub struct SimClock(Rc<Cell<Duration>>);

impl SimClock {
	pub fn new() -> Self {
		SimClock::default()
	}

	pub fn now(&self) -> Duration {
		self.0.get()
	}

	pub fn advance(&self, duration: Duration) {
		self.0.set(self.0.get() + duration);
	}
}

#[derive(Clone, Debug)]
pub struct SimDelay {
	clock: SimClock,
}

impl SimDelay {
	pub fn new(clock: SimClock) -> Self {
		SimDelay { clock }
	}
}

impl Delay for SimDelay {
	fn delay(&mut self, duration: Duration) {
		self.clock.advance(duration);
	}
}

/// Device model attached to the simulated wires.
///
/// A device has to come to rest after reacting to a change: `SimBus` lets it
/// react to its own drive changes at most 8 times in a row and panics after
/// that, since a device that keeps toggling data is a broken model, not a bus
/// condition.
pub trait Peripheral {
	/// The wire levels changed from `previous` to `current`. Only one of the
	/// two lines changes per call.
	fn observe(&mut self, now: Duration, previous: Levels, current: Levels);

	/// Whether the device pulls data low right now; may change with time alone
	/// (e.g. a finished conversion).
	fn pulls_data_low(&mut self, now: Duration) -> bool;
}

impl<P: Peripheral + ?Sized> Peripheral for Box<P> {
	fn observe(&mut self, now: Duration, previous: Levels, current: Levels) {
		(**self).observe(now, previous, current)
	}

	fn pulls_data_low(&mut self, now: Duration) -> bool {
		(**self).pulls_data_low(now)
	}
}

/// Nothing connected: data stays at the pull-up level unless driven.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct NoDevice;

impl Peripheral for NoDevice {
	fn observe(&mut self, _now: Duration, _previous: Levels, _current: Levels) {
	}

	fn pulls_data_low(&mut self, _now: Duration) -> bool {
		false
	}
}

/// Simulated wires; see `Peripheral` for when this panics.
pub struct SimBus<P> {
	peripheral: P,
	clock: SimClock,
	drive: Drive,
	direction: Direction,
	clock_latch: bool,
	data_latch: bool,
	observed: Levels,
	waveform: Waveform,
	contentions: usize,
}

impl<P: Peripheral> SimBus<P> {
	pub fn new(peripheral: P, clock: SimClock) -> Self {
		let initial = Levels { clock: false, data: true };
		SimBus {
			peripheral,
			clock,
			drive: Drive::PushPull,
			direction: Direction::Input,
			clock_latch: initial.clock,
			data_latch: initial.data,
			observed: initial,
			waveform: Waveform::new(initial),
			contentions: 0,
		}
	}

	pub fn peripheral(&self) -> &P {
		&self.peripheral
	}

	pub fn peripheral_mut(&mut self) -> &mut P {
		&mut self.peripheral
	}

	pub fn waveform(&self) -> &Waveform {
		&self.waveform
	}

	/// Forget recorded events; the current levels become the new baseline.
	pub fn clear_waveform(&mut self) {
		self.settle();
		self.waveform = Waveform::new(self.observed);
	}

	/// How often the master drove data high while the peripheral pulled it
	/// low.
	pub fn contentions(&self) -> usize {
		self.contentions
	}

	pub fn levels(&mut self) -> Levels {
		self.settle();
		self.observed
	}

	/// What the master does to the data wire: `Some(level)` while driving,
	/// `None` while released (input, or open-drain high).
	pub fn master_data(&self) -> Option<bool> {
		match (self.direction, self.drive) {
			(Direction::Input, _) => None,
			(Direction::Output, Drive::PushPull) => Some(self.data_latch),
			(Direction::Output, Drive::OpenDrain) => if self.data_latch { None } else { Some(false) },
		}
	}

	fn wire_levels(&mut self) -> Levels {
		let now = self.clock.now();
		let pulled_low = self.peripheral.pulls_data_low(now);
		let data = match self.master_data() {
			Some(false) => false,
			_ => !pulled_low,
		};
		Levels {
			clock: self.clock_latch,
			data,
		}
	}

	// let the peripheral see every level change; it may react by changing its
	// own drive, which is another change it has to see
	//
	// panics on a peripheral that never comes to rest
	fn settle(&mut self) {
		for _ in 0..8 {
			let current = self.wire_levels();
			if current == self.observed {
				return;
			}
			let previous = self.observed;
			self.observed = current;
			self.peripheral.observe(self.clock.now(), previous, current);
			self.record(EventKind::Peripheral);
		}
		panic!("simulated peripheral does not settle");
	}

	fn master_action<F: FnOnce(&mut Self)>(&mut self, kind: EventKind, action: F) {
		self.settle();
		action(self);
		let current = self.wire_levels();
		let previous = self.observed;
		self.observed = current;
		if current != previous {
			self.peripheral.observe(self.clock.now(), previous, current);
		}
		self.record(kind);
		self.settle();
	}

	fn record(&mut self, kind: EventKind) {
		let now = self.clock.now();
		let master = self.master_data();
		if master == Some(true) && self.peripheral.pulls_data_low(now) {
			self.contentions += 1;
		}
		self.waveform.push(Event {
			at: now,
			kind,
			clock: self.observed.clock,
			data: self.observed.data,
			master,
		});
	}
}

impl<P: Peripheral> Lines for SimBus<P> {
	fn configure(&mut self, drive: Drive) {
		self.master_action(EventKind::Configure(drive), |bus| {
			bus.drive = drive;
			bus.direction = Direction::Output;
		});
	}

	fn set_data_direction(&mut self, direction: Direction) {
		self.master_action(EventKind::Direction(direction), |bus| {
			bus.direction = direction;
		});
	}

	fn set_clock(&mut self, high: bool) {
		self.master_action(EventKind::Clock, |bus| {
			bus.clock_latch = high;
		});
	}

	fn set_data(&mut self, high: bool) {
		self.master_action(EventKind::Data, |bus| {
			bus.data_latch = high;
		});
	}

	fn read_data(&mut self) -> bool {
		self.settle();
		let level = self.observed.data;
		self.record(EventKind::Sample(level));
		level
	}

	fn take_fault(&mut self) -> Option<io::Error> {
		None
	}
}

/// Bus master wired to `peripheral`, with a fresh virtual clock.
pub fn bus<P: Peripheral>(peripheral: P) -> Bus<SimBus<P>, SimDelay> {
	bus_with_config(peripheral, BusConfig::default())
}

pub fn bus_with_config<P: Peripheral>(peripheral: P, config: BusConfig) -> Bus<SimBus<P>, SimDelay> {
	let clock = SimClock::new();
	Bus::with_config(SimBus::new(peripheral, clock.clone()), SimDelay::new(clock), config)
}

#[cfg(test)]
mod tests {
	use super::*;

	// pulls data low for a while after the first rising clock edge
	struct Holder {
		until: Option<Duration>,
	}

	impl Peripheral for Holder {
		fn observe(&mut self, now: Duration, previous: Levels, current: Levels) {
			if current.rising_clock(previous) && self.until.is_none() {
				self.until = Some(now + Duration::from_micros(10));
			}
		}

		fn pulls_data_low(&mut self, now: Duration) -> bool {
			match self.until {
				Some(until) => now < until,
				None => false,
			}
		}
	}

	#[test]
	fn data_is_wired_and() {
		let clock = SimClock::new();
		let mut delay = SimDelay::new(clock.clone());
		let mut sim = SimBus::new(Holder { until: None }, clock.clone());

		sim.configure(Drive::OpenDrain);
		sim.set_data(true);
		assert!(sim.read_data());
		sim.set_clock(true);
		assert!(!sim.read_data());
		assert_eq!(sim.master_data(), None);
		delay.delay_10us();
		assert!(sim.read_data());
		sim.set_data(false);
		assert!(!sim.read_data());
		assert_eq!(sim.contentions(), 0);
	}

	#[test]
	fn push_pull_high_against_peripheral_is_contention() {
		let clock = SimClock::new();
		let mut sim = SimBus::new(Holder { until: None }, clock);
		sim.configure(Drive::PushPull);
		sim.set_data(true);
		sim.set_clock(true);
		assert!(!sim.levels().data);
		assert!(sim.contentions() > 0);
	}

	#[test]
	fn input_direction_releases_data() {
		let mut sim = SimBus::new(NoDevice, SimClock::new());
		sim.configure(Drive::PushPull);
		sim.set_data(false);
		assert!(!sim.levels().data);
		sim.set_data_direction(Direction::Input);
		assert!(sim.levels().data);
		assert_eq!(sim.master_data(), None);
	}

	// flips its drive every time it is asked
	struct Toggler {
		low: bool,
	}

	impl Peripheral for Toggler {
		fn observe(&mut self, _now: Duration, _previous: Levels, _current: Levels) {
		}

		fn pulls_data_low(&mut self, _now: Duration) -> bool {
			self.low = !self.low;
			self.low
		}
	}

	#[test]
	#[should_panic(expected = "does not settle")]
	fn restless_peripheral_panics() {
		let mut sim = SimBus::new(Toggler { low: false }, SimClock::new());
		sim.configure(Drive::OpenDrain);
	}
}

