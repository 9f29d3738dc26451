//! Bit-banged two-wire bus master for the Mikro board pins (clock on RG13,
//! data on RG14): generic I2C byte transfers and the SHT15 humidity /
//! temperature sensor protocol, which shares the wires but not the framing.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod bus;
pub mod config;
pub mod error;
pub mod i2c;
pub mod lines;
pub mod linux;
pub mod sht15;
pub mod sim;
pub mod timing;

pub use self::bus::{
	Bus,
	BusState,
};
pub use self::config::BusConfig;
pub use self::error::{
	BusError,
	Sht15Phase,
};
pub use self::lines::{
	Direction,
	Drive,
	Lines,
};
pub use self::timing::Delay;
