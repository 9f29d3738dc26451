use std::time::Duration;

use super::{
	Levels,
	Peripheral,
};
use crate::sht15::{
	MEASURE_HUMIDITY,
	MEASURE_TEMPERATURE,
	SOFT_RESET,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
	Idle,
	// DATA fell while SCK was high, waiting for it to rise while SCK is high
	Armed,
	Command { shift: u8, bits: u8 },
	Acknowledge { command: u8 },
	// `ready_at` None: conversion never finishes
	Measuring { word: u16, ready_at: Option<Duration> },
	// `clocks`: falling SCK edges since the first bit was presented
	Transmit { word: u16, clocks: u8 },
}

/// Simulated SHT15 answering temperature / humidity measurements and soft
/// reset. Raw readings are masked to 14 / 12 bits, so the first bit sent is
/// always 0 and doubles as the "measurement ready" signal.
#[derive(Clone, Debug)]
pub struct Sht15Device {
	temperature: u16,
	humidity: u16,
	conversion: Duration,
	responsive: bool,
	completes: bool,
	ack_slot_low: bool,
	phase: Phase,
	pull_low: bool,
	commands: Vec<u8>,
	master_acknowledged: Option<bool>,
}

impl Sht15Device {
	pub fn new(temperature: u16, humidity: u16) -> Self {
		Sht15Device {
			temperature: temperature & 0x3fff,
			humidity: humidity & 0x0fff,
			conversion: Duration::from_millis(80),
			responsive: true,
			completes: true,
			ack_slot_low: false,
			phase: Phase::Idle,
			pull_low: false,
			commands: Vec::new(),
			master_acknowledged: None,
		}
	}

	/// Never acknowledges a command.
	pub fn unresponsive() -> Self {
		Sht15Device {
			responsive: false,
			..Sht15Device::new(0, 0)
		}
	}

	/// Sensor already presenting `word` (any 16 bits), as if a measurement
	/// just finished.
	pub fn transmitting(word: u16) -> Self {
		let mut device = Sht15Device::new(0, 0);
		device.start_transmit(word);
		device
	}

	pub fn with_conversion(mut self, conversion: Duration) -> Self {
		self.conversion = conversion;
		self
	}

	/// Acknowledges commands but never finishes a measurement.
	pub fn never_completes(mut self) -> Self {
		self.completes = false;
		self
	}

	/// Also pull DATA low during the acknowledge clock between the two bytes.
	pub fn with_ack_slot_low(mut self, low: bool) -> Self {
		self.ack_slot_low = low;
		self
	}

	/// Command bytes received so far (acknowledged or not).
	pub fn commands(&self) -> &[u8] {
		&self.commands
	}

	/// Whether the master pulled DATA low in the acknowledge clock of the last
	/// transfer.
	pub fn master_acknowledged(&self) -> Option<bool> {
		self.master_acknowledged
	}

	pub fn is_idle(&self) -> bool {
		self.phase == Phase::Idle
	}

	fn start_transmit(&mut self, word: u16) {
		self.phase = Phase::Transmit { word, clocks: 0 };
		self.present(word, 0);
	}

	fn present(&mut self, word: u16, clocks: u8) {
		self.pull_low = match clocks {
			0..=7 => 0 == word & (0x8000 >> clocks),
			8 => self.ack_slot_low,
			9..=16 => 0 == word & (0x8000 >> (clocks - 1)),
			_ => false,
		};
	}

	fn accepts(&self, command: u8) -> bool {
		self.responsive && (command == MEASURE_TEMPERATURE || command == MEASURE_HUMIDITY || command == SOFT_RESET)
	}
}

impl Peripheral for Sht15Device {
	fn observe(&mut self, now: Duration, previous: Levels, current: Levels) {
		if current.start_condition(previous) {
			self.phase = Phase::Armed;
			self.pull_low = false;
			return;
		}
		if current.stop_condition(previous) {
			if self.phase == Phase::Armed {
				self.phase = Phase::Command { shift: 0, bits: 0 };
			}
			return;
		}

		let rising = current.rising_clock(previous);
		let falling = current.falling_clock(previous);

		match self.phase {
			Phase::Command { shift, bits } if rising && bits < 8 => {
				self.phase = Phase::Command { shift: shift << 1 | current.data as u8, bits: bits + 1 };
			},
			Phase::Command { shift: command, bits: 8 } if falling => {
				self.commands.push(command);
				if self.accepts(command) {
					self.pull_low = true;
					self.phase = Phase::Acknowledge { command };
				} else {
					self.phase = Phase::Idle;
				}
			},
			Phase::Acknowledge { command } if falling => {
				self.pull_low = false;
				self.phase = match command {
					MEASURE_TEMPERATURE | MEASURE_HUMIDITY => {
						let word = if command == MEASURE_TEMPERATURE { self.temperature } else { self.humidity };
						let ready_at = if self.completes { Some(now + self.conversion) } else { None };
						Phase::Measuring { word, ready_at }
					},
					_ => Phase::Idle,
				};
			},
			Phase::Transmit { clocks: 8, .. } if rising => {
				let acknowledged = !current.data;
				self.master_acknowledged = Some(acknowledged);
				if !acknowledged {
					// master doesn't want the second byte
					self.pull_low = false;
					self.phase = Phase::Idle;
				}
			},
			Phase::Transmit { word, clocks } if falling => {
				let clocks = clocks + 1;
				self.present(word, clocks);
				self.phase = if clocks >= 17 { Phase::Idle } else { Phase::Transmit { word, clocks } };
			},
			_ => (),
		}
	}

	fn pulls_data_low(&mut self, now: Duration) -> bool {
		if let Phase::Measuring { word, ready_at: Some(ready_at) } = self.phase {
			if now >= ready_at {
				self.start_transmit(word);
			}
		}
		self.pull_low
	}
}
