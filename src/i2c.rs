//! Generic I2C master byte engine (about 100 kHz with the default timing).
//!
//! Both lines are open-drain while an I2C transfer runs, so the addressed
//! device can pull data low to acknowledge. Bits go out most significant bit
//! first. Nothing here retries: the raw primitives report the acknowledge bit,
//! the addressed helpers turn a missing acknowledge into
//! `BusError::NoAcknowledge`.

use std::ops::Range;

use crate::bus::Bus;
use crate::error::BusError;
use crate::lines::{
	Direction,
	Drive,
	Lines,
};
use crate::timing::Delay;

/// 7-bit addresses that aren't reserved for special purposes.
pub const SCAN_RANGE: Range<u8> = 0x08..0x78;

pub struct I2c<'a, L, D> {
	bus: &'a mut Bus<L, D>,
}

impl<'a, L: Lines, D: Delay> I2c<'a, L, D> {
	pub(crate) fn new(bus: &'a mut Bus<L, D>) -> Self {
		I2c { bus }
	}

	/// START condition: data falls while clock is high. Leaves both lines low.
	pub fn start(&mut self) {
		let bus = &mut *self.bus;
		bus.configure(Drive::OpenDrain);
		bus.data(true);
		bus.delay_10us();
		bus.clock(true);
		bus.delay_10us();
		bus.data(false);
		bus.delay_10us();
		bus.clock(false);
	}

	/// STOP condition: data rises while clock is high. Leaves both lines high
	/// (released).
	///
	/// Also usable without a preceding `start` (fresh bus, after SHT15
	/// traffic): the lines are switched to open-drain outputs first.
	pub fn stop(&mut self) {
		let bus = &mut *self.bus;
		let state = bus.state();
		if state.drive != Drive::OpenDrain || state.data_direction != Direction::Output {
			bus.configure(Drive::OpenDrain);
		}
		bus.data(false);
		bus.delay_10us();
		bus.clock(true);
		bus.delay_10us();
		bus.data(true);
		bus.delay_10us();
	}

	/// Shift out one byte and return whether the receiver acknowledged it
	/// (pulled data low during the 9th clock).
	pub fn write(&mut self, byte: u8) -> bool {
		let bus = &mut *self.bus;
		let mut shift = byte;
		for _ in 0..8 {
			bus.data(0 != shift & 0x80);
			bus.delay_2us();
			bus.clock(true);
			bus.delay_5us();
			bus.clock(false);
			bus.delay_2us();
			shift <<= 1;
		}

		bus.data(true);
		bus.delay_2us();
		bus.clock(true);
		bus.delay_5us();
		let ack = !bus.sample();
		bus.clock(false);
		bus.delay_10us();

		trace!("I2C write 0x{:02x}: {}", byte, if ack { "ACK" } else { "NACK" });
		ack
	}

	/// Shift in one byte, then acknowledge it (`ack`: more bytes wanted) or
	/// not (last byte of the transfer).
	pub fn read(&mut self, ack: bool) -> u8 {
		let bus = &mut *self.bus;
		let mut byte = 0u8;

		bus.data(true);
		bus.delay_2us();
		for _ in 0..8 {
			byte <<= 1;
			bus.delay_2us();
			bus.clock(true);
			bus.delay_5us();
			if bus.sample() {
				byte |= 1;
			}
			bus.clock(false);
			bus.delay_2us();
		}

		bus.data(!ack);
		bus.delay_2us();
		bus.clock(true);
		bus.delay_5us();
		bus.clock(false);
		bus.delay_2us();
		bus.data(true);
		bus.delay_10us();

		trace!("I2C read 0x{:02x} ({})", byte, if ack { "ACK" } else { "NACK" });
		byte
	}

	/// Address a device for writing and stop right away.
	pub fn probe(&mut self, address: u8) -> crate::AResult<bool> {
		check_address(address)?;
		self.start();
		let ack = self.write(address << 1);
		self.stop();
		Ok(ack)
	}

	/// Addresses (from `range`) that acknowledge a probe.
	pub fn scan(&mut self, range: Range<u8>) -> crate::AResult<Vec<u8>> {
		let mut found = Vec::new();
		for address in range {
			if self.probe(address)? {
				debug!("I2C device found at 0x{:02x}", address);
				found.push(address);
			}
		}
		Ok(found)
	}

	pub fn write_bytes(&mut self, address: u8, bytes: &[u8]) -> crate::AResult<()> {
		check_address(address)?;
		debug!("I2C 0x{:02x}: write {} bytes", address, bytes.len());
		self.start();
		let result = self.send(address, bytes);
		self.stop();
		result
	}

	/// Read `buffer.len()` bytes; all but the last are acknowledged.
	pub fn read_bytes(&mut self, address: u8, buffer: &mut [u8]) -> crate::AResult<()> {
		check_address(address)?;
		debug!("I2C 0x{:02x}: read {} bytes", address, buffer.len());
		self.start();
		let result = self.receive(address, buffer);
		self.stop();
		result
	}

	/// Write `bytes`, then read into `buffer` after a repeated start (e.g.
	/// register pointer followed by register contents).
	pub fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> crate::AResult<()> {
		check_address(address)?;
		debug!("I2C 0x{:02x}: write {} bytes, read {} bytes", address, bytes.len(), buffer.len());
		self.start();
		let result = match self.send(address, bytes) {
			Ok(()) => {
				self.start();
				self.receive(address, buffer)
			},
			Err(e) => Err(e),
		};
		self.stop();
		result
	}

	fn send(&mut self, address: u8, bytes: &[u8]) -> crate::AResult<()> {
		if !self.write(address << 1) {
			return Err(BusError::NoAcknowledge { address, offset: 0 }.into());
		}
		for (index, &byte) in bytes.iter().enumerate() {
			if !self.write(byte) {
				return Err(BusError::NoAcknowledge { address, offset: index + 1 }.into());
			}
		}
		Ok(())
	}

	fn receive(&mut self, address: u8, buffer: &mut [u8]) -> crate::AResult<()> {
		if !self.write(address << 1 | 1) {
			return Err(BusError::NoAcknowledge { address, offset: 0 }.into());
		}
		let last = buffer.len().saturating_sub(1);
		for (index, byte) in buffer.iter_mut().enumerate() {
			*byte = self.read(index != last);
		}
		Ok(())
	}
}

fn check_address(address: u8) -> crate::AResult<()> {
	ensure!(address < 0x80, "invalid 7-bit I2C address 0x{:02x}", address);
	Ok(())
}
