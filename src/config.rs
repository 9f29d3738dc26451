use std::time::Duration;

/// Worst case SHT15 conversion time is about 210 ms (14 bit); leave some
/// margin for slow delay providers.
pub const DEFAULT_SHT15_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_SHT15_POLL: Duration = Duration::from_micros(10);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BusConfig {
	sht15_timeout: Option<Duration>,
	sht15_poll: Duration,
}

impl Default for BusConfig {
	fn default() -> Self {
		BusConfig {
			sht15_timeout: Some(DEFAULT_SHT15_TIMEOUT),
			sht15_poll: DEFAULT_SHT15_POLL,
		}
	}
}

impl BusConfig {
	/// Upper bound for each SHT15 handshake wait; `None` waits forever.
	///
	/// Waiting time is counted in poll intervals, not read from a clock, so the
	/// real time until a timeout is at least this long.
	pub fn sht15_timeout(&self) -> Option<Duration> {
		self.sht15_timeout
	}

	pub fn set_sht15_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
		self.sht15_timeout = timeout;
		self
	}

	pub fn sht15_poll(&self) -> Duration {
		self.sht15_poll
	}

	pub fn set_sht15_poll(&mut self, poll: Duration) -> &mut Self {
		assert!(poll > Duration::new(0, 0), "poll interval must not be zero");
		self.sht15_poll = poll;
		self
	}
}
