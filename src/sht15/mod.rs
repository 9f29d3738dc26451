//! Sensirion SHT15 two-wire interface.
//!
//! Looks like I2C but isn't: the transmission start is a different pattern,
//! there is no addressing, the sensor acknowledges by pulling DATA low and
//! holding it until the 9th clock, and after a measurement command it pulls
//! DATA low a second time once the conversion is done (up to ~210 ms for 14
//! bit). The result is two bytes with an acknowledge clock in between; the
//! trailing CRC byte is skipped by not acknowledging the second byte.
//!
//! SCK corresponds to the bus clock line, DATA to the bus data line.

pub mod convert;

use std::time::Duration;

use crate::bus::Bus;
use crate::error::{
	BusError,
	Sht15Phase,
};
use crate::lines::{
	Direction,
	Drive,
	Lines,
};
use crate::timing::Delay;

// address bits are always 000
pub const MEASURE_TEMPERATURE: u8 = 0b000_00011;
pub const MEASURE_HUMIDITY: u8 = 0b000_00101;
pub const SOFT_RESET: u8 = 0b000_11110;

/// The sensor needs this long after a soft reset before it accepts commands.
pub const SOFT_RESET_TIME: Duration = Duration::from_millis(11);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Measurement {
	Temperature,
	Humidity,
}

impl Measurement {
	pub fn command(self) -> u8 {
		match self {
			Measurement::Temperature => MEASURE_TEMPERATURE,
			Measurement::Humidity => MEASURE_HUMIDITY,
		}
	}
}

pub struct Sht15<'a, L, D> {
	bus: &'a mut Bus<L, D>,
}

impl<'a, L: Lines, D: Delay> Sht15<'a, L, D> {
	pub(crate) fn new(bus: &'a mut Bus<L, D>) -> Self {
		Sht15 { bus }
	}

	/// Transmission start: DATA falls while SCK is high, SCK pulses low and
	/// high, DATA rises while SCK is high.
	///
	/// The transitions follow each other without explicit delays; the pulse
	/// width is whatever the line backend needs per call. That is plenty for
	/// sysfs GPIO or a 16 MIPS PIC24, but not guaranteed on arbitrarily fast
	/// register access.
	pub fn start(&mut self) {
		let bus = &mut *self.bus;
		bus.configure(Drive::PushPull);
		bus.data(true);
		bus.clock(true);
		bus.data(false);
		bus.clock(false);
		bus.clock(true);
		bus.data(true);
		bus.clock(false);
	}

	/// Send a command byte and wait until the sensor signals the measurement is
	/// ready (DATA pulled low); `read16` fetches the result.
	///
	/// Blocks for the whole conversion time. Each handshake step is bounded
	/// by `BusConfig::sht15_timeout` and fails with `BusError::SensorTimeout`;
	/// a backend fault while polling DATA is returned right away instead.
	pub fn command(&mut self, byte: u8) -> crate::AResult<()> {
		self.send(byte)?;
		self.wait_while(true, Sht15Phase::Measurement)
	}

	/// Clock in 16 data bits, MSB first. The 9th of the 17 clocks is our
	/// acknowledge for the first byte and carries no data.
	pub fn read16(&mut self) -> u16 {
		let bus = &mut *self.bus;
		let mut word = 0u16;

		bus.clock(false);
		bus.data_direction(Direction::Input);

		for index in 0..17 {
			if index != 8 {
				bus.delay_2us();
				bus.clock(true);
				word <<= 1;
				bus.delay_5us();
				if bus.sample() {
					word |= 1;
				}
				bus.clock(false);
				bus.delay_2us();
			} else {
				bus.data_direction(Direction::Output);
				bus.data(false);
				bus.delay_2us();
				bus.clock(true);
				bus.delay_5us();
				bus.clock(false);
				bus.data_direction(Direction::Input);
			}
		}

		trace!("SHT15 read 0x{:04x}", word);
		word
	}

	/// Run a full measurement and return the raw sensor word.
	pub fn measure(&mut self, measurement: Measurement) -> crate::AResult<u16> {
		self.start();
		self.command(measurement.command())?;
		let raw = self.read16();
		debug!("SHT15 {:?}: raw 0x{:04x}", measurement, raw);
		Ok(raw)
	}

	/// Get the sensor's interface back into a known state after a failed
	/// transfer: nine clocks with DATA released, then a transmission start.
	/// Doesn't touch the status register.
	pub fn connection_reset(&mut self) {
		{
			let bus = &mut *self.bus;
			bus.configure(Drive::PushPull);
			bus.clock(false);
			bus.data_direction(Direction::Input);
			for _ in 0..9 {
				bus.delay_2us();
				bus.clock(true);
				bus.delay_5us();
				bus.clock(false);
			}
			bus.delay_2us();
		}
		self.start();
	}

	/// Reset the sensor (including the status register) and wait until it is
	/// ready again.
	pub fn soft_reset(&mut self) -> crate::AResult<()> {
		self.connection_reset();
		self.send(SOFT_RESET)?;
		self.bus.wait(SOFT_RESET_TIME);
		debug!("SHT15 soft reset done");
		Ok(())
	}

	// command byte plus acknowledge handshake; leaves DATA as input
	fn send(&mut self, byte: u8) -> crate::AResult<()> {
		{
			let bus = &mut *self.bus;
			let mut shift = byte;
			bus.data_direction(Direction::Output);
			for _ in 0..8 {
				bus.clock(false);
				bus.data(0 != shift & 0x80);
				bus.delay_2us();
				bus.clock(true);
				bus.delay_5us();
				shift <<= 1;
			}

			bus.clock(false);
			bus.data_direction(Direction::Input);
		}
		trace!("SHT15 command 0x{:02x}", byte);

		// sensor pulls DATA low
		self.wait_while(true, Sht15Phase::Acknowledge)?;
		// falling edge of the 9th clock ends the acknowledge
		self.bus.clock(true);
		self.bus.clock(false);
		self.wait_while(false, Sht15Phase::Release)
	}

	fn wait_while(&mut self, level: bool, phase: Sht15Phase) -> crate::AResult<()> {
		let timeout = self.bus.config().sht15_timeout();
		let poll = self.bus.config().sht15_poll();
		let mut waited = Duration::new(0, 0);

		loop {
			let sampled = self.bus.sample();
			// a failed read says nothing about the sensor
			self.bus.take_fault()?;
			if sampled != level {
				break;
			}
			if let Some(timeout) = timeout {
				if waited >= timeout {
					debug!("SHT15 timeout waiting for {} ({:?})", phase, waited);
					return Err(BusError::SensorTimeout { phase, waited }.into());
				}
			}
			self.bus.wait(poll);
			waited += poll;
		}

		trace!("SHT15 {} after {:?}", phase, waited);
		Ok(())
	}
}
