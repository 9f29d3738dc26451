use std::hint::black_box;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

/// Data setup / hold time around a clock edge.
pub const SETUP: Duration = Duration::from_micros(2);
/// Time the clock stays high for one bit.
pub const CLOCK_HIGH: Duration = Duration::from_micros(5);
/// Settle time around start / stop conditions and after each byte.
pub const SETTLE: Duration = Duration::from_micros(10);

/// Instruction rate of the PIC24 on the Mikro board (32 MHz oscillator, Fcy =
/// Fosc / 2).
pub const MIKRO_INSTRUCTION_HZ: u64 = 16_000_000;
/// Cycles one iteration of a `while (--counter);` loop takes on the PIC24.
pub const MIKRO_CYCLES_PER_ITERATION: u64 = 4;

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

/// Blocking delay provider used between line transitions.
///
/// Every call must block for *at least* the requested duration; the protocol
/// timing windows only have lower bounds, but a delay that overshoots by a lot
/// (e.g. because the thread got preempted) slows the bus down and, for the
/// SHT15, can exceed the sensor's idle timeout.
pub trait Delay {
	fn delay(&mut self, duration: Duration);

	fn delay_2us(&mut self) {
		self.delay(SETUP);
	}

	fn delay_5us(&mut self) {
		self.delay(CLOCK_HIGH);
	}

	fn delay_10us(&mut self) {
		self.delay(SETTLE);
	}
}

impl<'a, D: Delay + ?Sized> Delay for &'a mut D {
	fn delay(&mut self, duration: Duration) {
		(**self).delay(duration)
	}
}

impl<D: Delay + ?Sized> Delay for Box<D> {
	fn delay(&mut self, duration: Duration) {
		(**self).delay(duration)
	}
}

/// Busy-waits on the monotonic clock.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct InstantDelay;

impl Delay for InstantDelay {
	fn delay(&mut self, duration: Duration) {
		let start = Instant::now();
		while start.elapsed() < duration {
			std::hint::spin_loop();
		}
	}
}

/// Counted busy loop, the host equivalent of the firmware's `DlyN()`
/// routines.
///
/// The spin count is derived from a loop rate; it has to be recomputed (or
/// measured with `calibrate`) for every machine it runs on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpinDelay {
	iterations_per_second: u64,
}

impl SpinDelay {
	pub fn from_clock(instruction_hz: u64, cycles_per_iteration: u64) -> Self {
		assert!(cycles_per_iteration > 0);
		SpinDelay::from_rate(instruction_hz / cycles_per_iteration)
	}

	pub fn from_rate(iterations_per_second: u64) -> Self {
		assert!(iterations_per_second > 0);
		SpinDelay { iterations_per_second }
	}

	/// Loop rate of the Mikro board firmware.
	pub fn mikro() -> Self {
		SpinDelay::from_clock(MIKRO_INSTRUCTION_HZ, MIKRO_CYCLES_PER_ITERATION)
	}

	/// Measure how many iterations of the spin loop fit into `sample`.
	pub fn calibrate(sample: Duration) -> Self {
		const BATCH: u64 = 10_000;

		let start = Instant::now();
		let mut iterations = 0u64;
		while start.elapsed() < sample {
			spin(BATCH);
			iterations += BATCH;
		}
		let elapsed = start.elapsed();
		let rate = (iterations as u128 * 1_000_000_000) / elapsed.as_nanos().max(1);
		let rate = rate.max(1).min(u64::max_value() as u128) as u64;
		debug!("spin delay calibrated to {} iterations/s", rate);
		SpinDelay::from_rate(rate)
	}

	pub fn iterations_per_second(&self) -> u64 {
		self.iterations_per_second
	}

	/// Number of iterations needed to wait at least `duration` (rounded up).
	pub fn iterations(&self, duration: Duration) -> u64 {
		let nanos = duration.as_nanos() * self.iterations_per_second as u128;
		let iterations = (nanos + 999_999_999) / 1_000_000_000;
		iterations.min(u64::max_value() as u128) as u64
	}
}

fn spin(iterations: u64) {
	let mut counter = iterations;
	while black_box(counter) > 0 {
		counter -= 1;
	}
}

impl Delay for SpinDelay {
	fn delay(&mut self, duration: Duration) {
		spin(self.iterations(duration));
	}
}
