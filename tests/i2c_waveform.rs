extern crate mikro_twowire;

use mikro_twowire::sim::{
	self,
	EchoDevice,
	EventKind,
	I2cSlave,
	Levels,
	MemoryDevice,
	NoDevice,
	Sht15Device,
};
use mikro_twowire::sht15::Measurement;
use mikro_twowire::{
	BusError,
	Direction,
	Drive,
};

const ADDRESS: u8 = 0x1d;

fn memory_device() -> I2cSlave<MemoryDevice> {
	let mut device = MemoryDevice::new(ADDRESS);
	device.memory_mut()[0] = 0x5a;
	device.memory_mut()[1] = 0xc3;
	I2cSlave::new(device)
}

#[test]
fn write_sends_msb_first() {
	for byte in 0..=255u8 {
		let mut bus = sim::bus(NoDevice);
		bus.i2c().start();
		bus.lines_mut().clear_waveform();

		let ack = bus.i2c().write(byte);
		assert!(!ack, "nobody there to acknowledge");

		let bits = bus.lines().waveform().bits_at_rising_edges();
		assert_eq!(bits.len(), 9);
		let expected: Vec<bool> = (0..8).rev().map(|bit| 0 != (byte >> bit) & 1).collect();
		assert_eq!(&bits[..8], &expected[..], "byte 0x{:02x}", byte);
		// released for the acknowledge clock
		assert!(bits[8]);
	}
}

#[test]
fn write_reports_acknowledge() {
	let mut bus = sim::bus(memory_device());

	bus.i2c().start();
	assert!(bus.i2c().write(ADDRESS << 1));
	bus.i2c().stop();

	bus.i2c().start();
	assert!(!bus.i2c().write((ADDRESS + 1) << 1));
	bus.i2c().stop();
}

#[test]
fn read_acknowledge_drives_data_low() {
	let mut bus = sim::bus(memory_device());
	bus.i2c().start();
	assert!(bus.i2c().write(ADDRESS << 1 | 1));

	bus.lines_mut().clear_waveform();
	assert_eq!(bus.i2c().read(true), 0x5a);
	let edges = bus.lines().waveform().rising_edges();
	assert_eq!(edges.len(), 9);
	assert_eq!(edges[8].master, Some(false));
	assert!(!edges[8].data);

	bus.lines_mut().clear_waveform();
	assert_eq!(bus.i2c().read(false), 0xc3);
	let edges = bus.lines().waveform().rising_edges();
	assert_eq!(edges.len(), 9);
	assert_eq!(edges[8].master, None);
	assert!(edges[8].data);

	bus.i2c().stop();
}

#[test]
fn read_releases_data_after_acknowledge() {
	let mut bus = sim::bus(memory_device());
	bus.i2c().start();
	assert!(bus.i2c().write(ADDRESS << 1 | 1));
	bus.i2c().read(true);
	assert!(bus.state().data);
	assert_eq!(bus.state().drive, Drive::OpenDrain);
	assert_eq!(bus.state().data_direction, Direction::Output);
}

#[test]
fn start_and_stop_signatures() {
	let mut bus = sim::bus(NoDevice);

	bus.i2c().start();
	{
		let waveform = bus.lines().waveform();
		assert_eq!(waveform.start_conditions(), 1);
		assert_eq!(waveform.stop_conditions(), 0);
		assert_eq!(waveform.last(), Levels { clock: false, data: false });
	}

	bus.i2c().write(0x00);
	bus.lines_mut().clear_waveform();
	bus.i2c().stop();
	{
		let waveform = bus.lines().waveform();
		assert_eq!(waveform.stop_conditions(), 1);
		assert_eq!(waveform.start_conditions(), 0);
	}

	// repeated start from idle
	bus.lines_mut().clear_waveform();
	bus.i2c().start();
	assert_eq!(bus.lines().waveform().start_conditions(), 1);
	assert_eq!(bus.lines().waveform().stop_conditions(), 0);
}

#[test]
fn stop_twice_leaves_same_idle_state() {
	let mut bus = sim::bus(NoDevice);
	bus.i2c().start();
	bus.i2c().write(0xa5);

	bus.i2c().stop();
	let first = bus.lines_mut().levels();
	let first_state = bus.state();

	bus.lines_mut().clear_waveform();
	bus.i2c().stop();
	let second = bus.lines_mut().levels();

	assert_eq!(first, Levels { clock: true, data: true });
	assert_eq!(first, second);
	assert_eq!(first_state, bus.state());
	assert_eq!(bus.lines().waveform().stop_conditions(), 1);
}

#[test]
fn stop_on_fresh_bus() {
	let mut bus = sim::bus(NoDevice);

	bus.i2c().stop();
	assert_eq!(bus.lines_mut().levels(), Levels { clock: true, data: true });
	assert_eq!(bus.lines().waveform().stop_conditions(), 1);
	let first_state = bus.state();
	assert_eq!(first_state.drive, Drive::OpenDrain);
	assert_eq!(first_state.data_direction, Direction::Output);

	bus.lines_mut().clear_waveform();
	bus.i2c().stop();
	assert_eq!(bus.lines_mut().levels(), Levels { clock: true, data: true });
	assert_eq!(bus.lines().waveform().stop_conditions(), 1);
	assert_eq!(first_state, bus.state());
}

#[test]
fn stop_releases_bus_after_sht15_transfer() {
	let mut bus = sim::bus(Sht15Device::new(6400, 1000));
	assert_eq!(bus.sht15().measure(Measurement::Temperature).unwrap(), 6400);
	// data is an input after read16
	assert_eq!(bus.state().data_direction, Direction::Input);

	bus.lines_mut().clear_waveform();
	bus.i2c().stop();
	assert_eq!(bus.lines().waveform().stop_conditions(), 1);
	assert_eq!(bus.lines_mut().levels(), Levels { clock: true, data: true });
	assert_eq!(bus.state().drive, Drive::OpenDrain);
	assert!(bus.lines().peripheral().is_idle());
}

#[test]
fn echo_round_trip() {
	for &byte in &[0x00u8, 0xff, 0xa5, 0x5a, 0x81, 0x3c] {
		let mut bus = sim::bus(I2cSlave::listening(EchoDevice::default()));
		bus.i2c().start();
		assert!(bus.i2c().write(byte));
		assert_eq!(bus.i2c().read(false), byte);
		bus.i2c().stop();
		assert_eq!(bus.lines().peripheral().handler().received(), &[byte]);
	}
}

#[test]
fn never_samples_while_driving() {
	let mut bus = sim::bus(memory_device());
	let mut buffer = [0u8; 2];
	bus.i2c().write_read(ADDRESS, &[0x00], &mut buffer).unwrap();
	assert_eq!(buffer, [0x5a, 0xc3]);

	let waveform = bus.lines().waveform();
	assert!(!waveform.samples().is_empty());
	assert_eq!(waveform.samples_while_driving(), 0);
	assert_eq!(bus.lines().contentions(), 0);
}

#[test]
fn register_write_then_read_back() {
	let mut bus = sim::bus(memory_device());

	bus.i2c().write_bytes(ADDRESS, &[0x10, 0x01, 0x02, 0x03]).unwrap();
	assert_eq!(&bus.lines().peripheral().handler().memory()[0x10..0x13], &[0x01, 0x02, 0x03]);

	let mut buffer = [0u8; 3];
	bus.i2c().write_read(ADDRESS, &[0x10], &mut buffer).unwrap();
	assert_eq!(buffer, [0x01, 0x02, 0x03]);
	assert_eq!(bus.lines().peripheral().handler().pointer(), 0x13);

	// continues at the pointer
	bus.lines_mut().peripheral_mut().handler_mut().memory_mut()[0x13] = 0x42;
	let mut buffer = [0u8; 1];
	bus.i2c().read_bytes(ADDRESS, &mut buffer).unwrap();
	assert_eq!(buffer, [0x42]);
}

#[test]
fn missing_device_is_reported_and_bus_released() {
	let mut bus = sim::bus(memory_device());

	let e = bus.i2c().write_bytes(0x22, &[0x00]).unwrap_err();
	match e.downcast_ref::<BusError>() {
		Some(&BusError::NoAcknowledge { address, offset }) => {
			assert_eq!(address, 0x22);
			assert_eq!(offset, 0);
		},
		other => panic!("unexpected error {:?}", other),
	}
	assert_eq!(bus.lines_mut().levels(), Levels { clock: true, data: true });

	let mut buffer = [0u8; 1];
	assert!(bus.i2c().read_bytes(0x22, &mut buffer).is_err());
	assert!(bus.i2c().write_read(0x22, &[0x00], &mut buffer).is_err());
	assert_eq!(bus.lines().waveform().stop_conditions(), 3);
}

#[test]
fn scan_finds_device() {
	let mut bus = sim::bus(memory_device());
	assert_eq!(bus.i2c().scan(0x08..0x78).unwrap(), vec![ADDRESS]);
	assert!(bus.i2c().probe(ADDRESS).unwrap());
	assert!(!bus.i2c().probe(0x50).unwrap());
}

#[test]
fn rejects_ten_bit_addresses() {
	let mut bus = sim::bus(NoDevice);
	assert!(bus.i2c().probe(0x80).is_err());
	assert!(bus.i2c().write_bytes(0xff, &[]).is_err());
	// nothing happened on the wires
	assert!(bus.lines().waveform().events().iter().all(|e| e.kind == EventKind::Peripheral));
}
