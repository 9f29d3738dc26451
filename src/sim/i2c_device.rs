use std::time::Duration;

use super::{
	Levels,
	Peripheral,
};

/// What an I2C device does after acknowledging a byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Next {
	Receive,
	/// send this byte next
	Transmit(u8),
}

/// Byte level behaviour of a simulated I2C device; `I2cSlave` does the bit
/// level work.
pub trait I2cHandler {
	fn on_start(&mut self) {
	}

	fn on_stop(&mut self) {
	}

	/// A byte came in; `None` doesn't acknowledge it and makes the device
	/// ignore the bus until the next START.
	fn on_byte(&mut self, byte: u8) -> Option<Next>;

	/// The master acknowledged the byte we sent and clocks another one.
	fn next_byte(&mut self) -> u8;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
	Idle,
	Receive { shift: u8, bits: u8 },
	// pulling data low (or not) during the 9th clock
	AckOut { next: Option<Next> },
	// `sent`: bits already clocked out
	Transmit { byte: u8, sent: u8 },
	AckIn { acked: bool },
}

/// Simulated I2C device: samples data on rising clock edges, changes its own
/// output after falling edges.
pub struct I2cSlave<H> {
	handler: H,
	phase: Phase,
	idle: Phase,
	pull_low: bool,
}

impl<H: I2cHandler> I2cSlave<H> {
	/// Device that waits for a START before listening.
	pub fn new(handler: H) -> Self {
		I2cSlave {
			handler,
			phase: Phase::Idle,
			idle: Phase::Idle,
			pull_low: false,
		}
	}

	/// Device that takes every clocked byte, even without START.
	pub fn listening(handler: H) -> Self {
		let idle = Phase::Receive { shift: 0, bits: 0 };
		I2cSlave {
			handler,
			phase: idle,
			idle,
			pull_low: false,
		}
	}

	pub fn handler(&self) -> &H {
		&self.handler
	}

	pub fn handler_mut(&mut self) -> &mut H {
		&mut self.handler
	}

	fn present(&mut self, byte: u8, sent: u8) {
		self.pull_low = 0 == byte & (0x80 >> sent);
	}
}

impl<H: I2cHandler> Peripheral for I2cSlave<H> {
	fn observe(&mut self, _now: Duration, previous: Levels, current: Levels) {
		if current.start_condition(previous) {
			self.handler.on_start();
			self.phase = Phase::Receive { shift: 0, bits: 0 };
			self.pull_low = false;
			return;
		}
		if current.stop_condition(previous) {
			self.handler.on_stop();
			self.phase = self.idle;
			self.pull_low = false;
			return;
		}

		let rising = current.rising_clock(previous);
		let falling = current.falling_clock(previous);

		self.phase = match self.phase {
			Phase::Receive { shift, bits } if rising && bits < 8 => {
				Phase::Receive { shift: shift << 1 | current.data as u8, bits: bits + 1 }
			},
			Phase::Receive { shift, bits: 8 } if falling => {
				let next = self.handler.on_byte(shift);
				self.pull_low = next.is_some();
				Phase::AckOut { next }
			},
			Phase::AckOut { next } if falling => {
				self.pull_low = false;
				match next {
					None => Phase::Idle,
					Some(Next::Receive) => Phase::Receive { shift: 0, bits: 0 },
					Some(Next::Transmit(byte)) => {
						self.present(byte, 0);
						Phase::Transmit { byte, sent: 0 }
					},
				}
			},
			Phase::Transmit { byte, sent } if falling => {
				let sent = sent + 1;
				if sent == 8 {
					self.pull_low = false;
					Phase::AckIn { acked: false }
				} else {
					self.present(byte, sent);
					Phase::Transmit { byte, sent }
				}
			},
			Phase::AckIn { .. } if rising => Phase::AckIn { acked: !current.data },
			Phase::AckIn { acked } if falling => {
				if acked {
					let byte = self.handler.next_byte();
					self.present(byte, 0);
					Phase::Transmit { byte, sent: 0 }
				} else {
					self.idle
				}
			},
			phase => phase,
		};
	}

	fn pulls_data_low(&mut self, _now: Duration) -> bool {
		self.pull_low
	}
}

/// Acknowledges every byte and sends it back on the next read.
#[derive(Clone, Debug, Default)]
pub struct EchoDevice {
	last: u8,
	received: Vec<u8>,
}

impl EchoDevice {
	pub fn received(&self) -> &[u8] {
		&self.received
	}
}

impl I2cHandler for EchoDevice {
	fn on_byte(&mut self, byte: u8) -> Option<Next> {
		self.last = byte;
		self.received.push(byte);
		Some(Next::Transmit(byte))
	}

	fn next_byte(&mut self) -> u8 {
		self.last
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum MemoryState {
	Address,
	Pointer,
	Data,
}

/// Register file device: after the address (write), the first byte sets the
/// register pointer, following bytes are stored; reads return registers
/// from the pointer on. The pointer increments (and wraps) after each access.
pub struct MemoryDevice {
	address: u8,
	memory: [u8; 256],
	pointer: u8,
	state: MemoryState,
}

impl MemoryDevice {
	pub fn new(address: u8) -> Self {
		MemoryDevice {
			address,
			memory: [0u8; 256],
			pointer: 0,
			state: MemoryState::Address,
		}
	}

	pub fn address(&self) -> u8 {
		self.address
	}

	pub fn memory(&self) -> &[u8; 256] {
		&self.memory
	}

	pub fn memory_mut(&mut self) -> &mut [u8; 256] {
		&mut self.memory
	}

	pub fn pointer(&self) -> u8 {
		self.pointer
	}

	fn fetch(&mut self) -> u8 {
		let byte = self.memory[self.pointer as usize];
		self.pointer = self.pointer.wrapping_add(1);
		byte
	}
}

impl I2cHandler for MemoryDevice {
	fn on_start(&mut self) {
		self.state = MemoryState::Address;
	}

	fn on_byte(&mut self, byte: u8) -> Option<Next> {
		match self.state {
			MemoryState::Address => {
				if byte >> 1 != self.address {
					return None;
				}
				if 0 != byte & 1 {
					Some(Next::Transmit(self.fetch()))
				} else {
					self.state = MemoryState::Pointer;
					Some(Next::Receive)
				}
			},
			MemoryState::Pointer => {
				self.pointer = byte;
				self.state = MemoryState::Data;
				Some(Next::Receive)
			},
			MemoryState::Data => {
				self.memory[self.pointer as usize] = byte;
				self.pointer = self.pointer.wrapping_add(1);
				Some(Next::Receive)
			},
		}
	}

	fn next_byte(&mut self) -> u8 {
		self.fetch()
	}
}
