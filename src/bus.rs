use std::time::Duration;

use crate::config::BusConfig;
use crate::i2c::I2c;
use crate::lines::{
	Direction,
	Drive,
	Lines,
};
use crate::sht15::Sht15;
use crate::timing::Delay;

/// What the engine last told the lines to do.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BusState {
	pub drive: Drive,
	pub data_direction: Direction,
	pub clock: bool,
	pub data: bool,
}

impl Default for BusState {
	fn default() -> Self {
		BusState {
			drive: Drive::PushPull,
			data_direction: Direction::Input,
			clock: false,
			data: true,
		}
	}
}

impl BusState {
	/// Sampling only makes sense when something else can set the level: data
	/// is an input, or an open-drain output that is currently released.
	pub fn may_sample(&self) -> bool {
		match (self.data_direction, self.drive) {
			(Direction::Input, _) => true,
			(Direction::Output, Drive::OpenDrain) => self.data,
			(Direction::Output, Drive::PushPull) => false,
		}
	}
}

/// Single bus master owning the two lines.
///
/// All operations busy-wait and run to completion; they are not reentrant and
/// must not interleave. On a multi-threaded host run them on a dedicated
/// thread (see `linux::set_fifo_priority`).
pub struct Bus<L, D> {
	lines: L,
	delay: D,
	config: BusConfig,
	state: BusState,
}

impl<L: Lines, D: Delay> Bus<L, D> {
	pub fn new(lines: L, delay: D) -> Self {
		Bus::with_config(lines, delay, BusConfig::default())
	}

	pub fn with_config(lines: L, delay: D, config: BusConfig) -> Self {
		Bus {
			lines,
			delay,
			config,
			state: BusState::default(),
		}
	}

	pub fn config(&self) -> &BusConfig {
		&self.config
	}

	pub fn config_mut(&mut self) -> &mut BusConfig {
		&mut self.config
	}

	pub fn state(&self) -> BusState {
		self.state
	}

	pub fn lines(&self) -> &L {
		&self.lines
	}

	pub fn lines_mut(&mut self) -> &mut L {
		&mut self.lines
	}

	pub fn into_parts(self) -> (L, D) {
		(self.lines, self.delay)
	}

	/// Report a backend I/O error that happened since the last call.
	pub fn take_fault(&mut self) -> crate::AResult<()> {
		match self.lines.take_fault() {
			None => Ok(()),
			Some(e) => Err(failure::Error::from(e).context("bus line access failed").into()),
		}
	}

	pub fn i2c(&mut self) -> I2c<L, D> {
		I2c::new(self)
	}

	pub fn sht15(&mut self) -> Sht15<L, D> {
		Sht15::new(self)
	}

	pub(crate) fn configure(&mut self, drive: Drive) {
		self.state.drive = drive;
		self.state.data_direction = Direction::Output;
		self.lines.configure(drive);
	}

	pub(crate) fn data_direction(&mut self, direction: Direction) {
		self.state.data_direction = direction;
		self.lines.set_data_direction(direction);
	}

	pub(crate) fn clock(&mut self, high: bool) {
		self.state.clock = high;
		self.lines.set_clock(high);
	}

	pub(crate) fn data(&mut self, high: bool) {
		debug_assert!(self.state.data_direction == Direction::Output, "driving data while it is an input");
		self.state.data = high;
		self.lines.set_data(high);
	}

	pub(crate) fn sample(&mut self) -> bool {
		debug_assert!(self.state.may_sample(), "sampling data while driving it");
		self.lines.read_data()
	}

	pub(crate) fn delay_2us(&mut self) {
		self.delay.delay_2us();
	}

	pub(crate) fn delay_5us(&mut self) {
		self.delay.delay_5us();
	}

	pub(crate) fn delay_10us(&mut self) {
		self.delay.delay_10us();
	}

	pub(crate) fn wait(&mut self, duration: Duration) {
		self.delay.delay(duration);
	}
}
