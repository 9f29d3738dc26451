extern crate mikro_twowire;

use std::time::Duration;

use mikro_twowire::sht15::{
	MEASURE_TEMPERATURE,
	Measurement,
	SOFT_RESET,
	SOFT_RESET_TIME,
};
use mikro_twowire::sim::{
	self,
	EventKind,
	NoDevice,
	Sht15Device,
};
use mikro_twowire::{
	BusConfig,
	BusError,
	Sht15Phase,
};

fn timeout_of(e: &failure::Error) -> (Sht15Phase, Duration) {
	match e.downcast_ref::<BusError>() {
		Some(&BusError::SensorTimeout { phase, waited }) => (phase, waited),
		other => panic!("expected a sensor timeout, got {:?}", other),
	}
}

fn short_timeout() -> BusConfig {
	let mut config = BusConfig::default();
	config.set_sht15_timeout(Some(Duration::from_millis(5)));
	config
}

#[test]
fn start_sequence_has_no_delays() {
	let mut bus = sim::bus(NoDevice);
	bus.sht15().start();

	let waveform = bus.lines().waveform();
	let steps: Vec<(bool, bool)> = waveform.events().iter()
		.filter(|e| e.kind == EventKind::Clock || e.kind == EventKind::Data)
		.map(|e| (e.clock, e.data))
		.collect();
	assert_eq!(steps, vec![
		(false, true),
		(true, true),
		(true, false),
		(false, false),
		(true, false),
		(true, true),
		(false, true),
	]);
	assert!(waveform.events().iter().all(|e| e.at == Duration::new(0, 0)));
}

#[test]
fn measures_temperature_and_humidity() {
	let mut bus = sim::bus(Sht15Device::new(6400, 1000));

	assert_eq!(bus.sht15().measure(Measurement::Temperature).unwrap(), 6400);
	assert_eq!(bus.sht15().measure(Measurement::Humidity).unwrap(), 1000);

	let device = bus.lines().peripheral();
	assert_eq!(device.commands(), &[0x03, 0x05]);
	assert_eq!(device.master_acknowledged(), Some(true));
	assert!(device.is_idle());
	assert_eq!(bus.lines().waveform().samples_while_driving(), 0);
}

#[test]
fn command_sends_msb_first() {
	let mut bus = sim::bus(Sht15Device::new(0, 0));
	bus.sht15().start();
	bus.lines_mut().clear_waveform();
	bus.sht15().command(MEASURE_TEMPERATURE).unwrap();

	let bits = bus.lines().waveform().bits_at_rising_edges();
	// 8 command bits plus the acknowledge clock (DATA held low by the sensor)
	assert_eq!(bits, vec![false, false, false, false, false, false, true, true, false]);
}

#[test]
fn waits_for_conversion() {
	let conversion = Duration::from_millis(210);
	let mut bus = sim::bus(Sht15Device::new(6400, 1000).with_conversion(conversion));

	assert_eq!(bus.sht15().measure(Measurement::Temperature).unwrap(), 6400);
	let last = bus.lines().waveform().events().last().unwrap().at;
	assert!(last >= conversion);
}

#[test]
fn read16_skips_acknowledge_clock() {
	for &word in &[0xffffu16, 0x0000, 0xa5c3, 0x8001, 0x1234, 0x00ff] {
		for &ack_slot_low in &[false, true] {
			let device = Sht15Device::transmitting(word).with_ack_slot_low(ack_slot_low);
			let mut bus = sim::bus(device);

			assert_eq!(bus.sht15().read16(), word, "word 0x{:04x}", word);
			assert_eq!(bus.lines().waveform().rising_edges().len(), 17);
			assert_eq!(bus.lines().peripheral().master_acknowledged(), Some(true));
		}
	}
}

#[test]
fn unresponsive_sensor_times_out() {
	let mut bus = sim::bus_with_config(Sht15Device::unresponsive(), short_timeout());

	let e = bus.sht15().measure(Measurement::Temperature).unwrap_err();
	let (phase, waited) = timeout_of(&e);
	assert_eq!(phase, Sht15Phase::Acknowledge);
	assert!(waited >= Duration::from_millis(5));
	assert!(waited < Duration::from_millis(6));
	assert_eq!(bus.lines().peripheral().commands(), &[MEASURE_TEMPERATURE]);
}

#[test]
fn default_timeout_covers_worst_case_conversion() {
	let mut bus = sim::bus(Sht15Device::unresponsive());

	let e = bus.sht15().command(MEASURE_TEMPERATURE).unwrap_err();
	let (phase, waited) = timeout_of(&e);
	assert_eq!(phase, Sht15Phase::Acknowledge);
	assert!(waited > Duration::from_millis(210));
}

#[test]
fn stuck_measurement_times_out() {
	let mut bus = sim::bus_with_config(Sht15Device::new(6400, 1000).never_completes(), short_timeout());

	let e = bus.sht15().measure(Measurement::Humidity).unwrap_err();
	assert_eq!(timeout_of(&e).0, Sht15Phase::Measurement);
}

#[test]
fn slow_conversion_exceeding_timeout() {
	let mut config = BusConfig::default();
	config.set_sht15_timeout(Some(Duration::from_millis(250)));
	let device = Sht15Device::new(6400, 1000).with_conversion(Duration::from_millis(300));
	let mut bus = sim::bus_with_config(device, config);

	let e = bus.sht15().measure(Measurement::Temperature).unwrap_err();
	assert_eq!(timeout_of(&e).0, Sht15Phase::Measurement);
}

#[test]
fn unbounded_wait_still_completes() {
	let mut config = BusConfig::default();
	config
		.set_sht15_timeout(None)
		.set_sht15_poll(Duration::from_millis(1));
	let device = Sht15Device::new(6400, 1000).with_conversion(Duration::from_secs(2));
	let mut bus = sim::bus_with_config(device, config);

	assert_eq!(bus.sht15().measure(Measurement::Temperature).unwrap(), 6400);
}

#[test]
fn connection_reset_recovers_unread_measurement() {
	let mut bus = sim::bus(Sht15Device::new(6400, 1000));

	bus.sht15().start();
	bus.sht15().command(MEASURE_TEMPERATURE).unwrap();
	// result never read
	bus.sht15().connection_reset();

	assert_eq!(bus.sht15().measure(Measurement::Humidity).unwrap(), 1000);
	assert_eq!(bus.lines().peripheral().master_acknowledged(), Some(true));
}

#[test]
fn soft_reset() {
	let mut bus = sim::bus(Sht15Device::new(6400, 1000));

	bus.sht15().soft_reset().unwrap();
	assert_eq!(bus.lines().peripheral().commands(), &[SOFT_RESET]);
	assert!(bus.lines().peripheral().is_idle());

	bus.lines_mut().clear_waveform();
	assert_eq!(bus.sht15().measure(Measurement::Temperature).unwrap(), 6400);
	// nothing happens on the wires until the sensor is ready again
	assert!(bus.lines().waveform().events()[0].at >= SOFT_RESET_TIME);
}

#[test]
fn soft_reset_without_sensor_fails() {
	let mut bus = sim::bus_with_config(NoDevice, short_timeout());

	let e = bus.sht15().soft_reset().unwrap_err();
	assert_eq!(timeout_of(&e).0, Sht15Phase::Acknowledge);
}
