use std::fmt;
use std::time::Duration;

use failure::Fail;

/// Handshake step of an SHT15 command the sensor has to complete.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Sht15Phase {
	/// sensor pulls DATA low after the command byte
	Acknowledge,
	/// sensor releases DATA after the 9th clock
	Release,
	/// sensor pulls DATA low again once the measurement is done
	Measurement,
}

impl fmt::Display for Sht15Phase {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let s = match self {
			Sht15Phase::Acknowledge => "command acknowledge",
			Sht15Phase::Release => "acknowledge release",
			Sht15Phase::Measurement => "measurement completion",
		};
		f.write_str(s)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Fail)]
pub enum BusError {
	/// `offset` 0 is the address byte, data bytes follow from 1.
	#[fail(display = "I2C device 0x{:02x} did not acknowledge byte {}", address, offset)]
	NoAcknowledge {
		address: u8,
		offset: usize,
	},
	#[fail(display = "SHT15 not responding: no {} after {:?}", phase, waited)]
	SensorTimeout {
		phase: Sht15Phase,
		waited: Duration,
	},
}
