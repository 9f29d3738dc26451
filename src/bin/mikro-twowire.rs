#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate mikro_twowire;
use mikro_twowire::*;

use std::process::exit;
use std::time::Duration;

use mikro_twowire::error::Sht15Phase;
use mikro_twowire::sht15::Measurement;
use mikro_twowire::sht15::convert::{
	self,
	Resolution,
	SupplyVoltage,
};
use mikro_twowire::sim::{
	I2cSlave,
	MemoryDevice,
	Peripheral,
	SimBus,
	SimClock,
	SimDelay,
	Sht15Device,
};
use mikro_twowire::timing::{
	InstantDelay,
	SpinDelay,
	reliable_sleep,
};

type DynBus = Bus<Box<dyn Lines>, Box<dyn Delay>>;

// Mikro board pins RG13 / RG14
const DEFAULT_CLOCK_GPIO: u32 = 13;
const DEFAULT_DATA_GPIO: u32 = 14;
// on-board accelerometer
const SIMULATED_I2C_ADDRESS: u8 = 0x1d;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_param_or<T>(matches: &clap::ArgMatches, name: &str, default: T) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	if matches.is_present(name) {
		get_param(matches, name)
	} else {
		Ok(default)
	}
}

// "0x1d", "0b1101" or decimal
fn parse_byte(s: &str) -> AResult<u8> {
	let r = if s.starts_with("0x") {
		u8::from_str_radix(&s[2..], 16)
	} else if s.starts_with("0b") {
		u8::from_str_radix(&s[2..], 2)
	} else {
		s.parse::<u8>()
	};
	with_context(format!("invalid byte {:?}", s), r)
}

fn with_context<T, E>(msg: String, r: Result<T, E>) -> AResult<T>
where
	failure::Error: From<E>,
{
	r.map_err(|e| failure::Error::from(e).context(msg).into())
}

fn open_bus(matches: &clap::ArgMatches, peripheral: Box<dyn Peripheral>) -> AResult<DynBus> {
	let mut config = BusConfig::default();
	let timeout: u64 = get_param_or(matches, "timeout", config.sht15_timeout().map_or(0, |t| t.as_millis() as u64))?;
	config.set_sht15_timeout(if timeout == 0 { None } else { Some(Duration::from_millis(timeout)) });

	if matches.is_present("simulate") {
		info!("using simulated bus");
		let clock = SimClock::new();
		let lines: Box<dyn Lines> = Box::new(SimBus::new(peripheral, clock.clone()));
		let delay: Box<dyn Delay> = Box::new(SimDelay::new(clock));
		return Ok(Bus::with_config(lines, delay, config));
	}

	if matches.is_present("realtime") {
		let priority: i32 = get_param(matches, "realtime")?;
		with_context("lock memory".to_string(), linux::lock_memory())?;
		with_context(format!("set realtime priority {}", priority), linux::set_fifo_priority(priority))?;
	}

	let clock_gpio: u32 = get_param_or(matches, "clock", DEFAULT_CLOCK_GPIO)?;
	let data_gpio: u32 = get_param_or(matches, "data", DEFAULT_DATA_GPIO)?;
	let gpio = match matches.value_of("root") {
		Some(root) => linux::SysfsGpio::with_root(root),
		None => linux::SysfsGpio::new(),
	};
	let lines: Box<dyn Lines> = Box::new(gpio.open_lines(clock_gpio, data_gpio)?);

	let delay: Box<dyn Delay> = if matches.is_present("spin") {
		Box::new(SpinDelay::calibrate(Duration::from_millis(100)))
	} else {
		Box::new(InstantDelay)
	};

	Ok(Bus::with_config(lines, delay, config))
}

fn simulated_sht15() -> Box<dyn Peripheral> {
	// 24.34 °C, 33 %RH
	Box::new(Sht15Device::new(6400, 1000))
}

fn simulated_i2c() -> Box<dyn Peripheral> {
	let mut device = MemoryDevice::new(SIMULATED_I2C_ADDRESS);
	for (i, byte) in device.memory_mut().iter_mut().enumerate() {
		*byte = i as u8;
	}
	Box::new(I2cSlave::new(device))
}

fn sht15_measure_once(bus: &mut DynBus, supply: SupplyVoltage) -> AResult<()> {
	let raw_temperature = bus.sht15().measure(Measurement::Temperature)?;
	bus.take_fault()?;
	let temperature = convert::temperature_celsius(raw_temperature, supply, Resolution::High);
	println!("temperature: {:016b} (0x{:04x}) {:.2} °C", raw_temperature, raw_temperature, temperature);

	let raw_humidity = bus.sht15().measure(Measurement::Humidity)?;
	bus.take_fault()?;
	let humidity = convert::relative_humidity(raw_humidity, temperature, Resolution::High);
	println!("humidity:    {:016b} (0x{:04x}) {:.2} %RH", raw_humidity, raw_humidity, humidity);

	Ok(())
}

fn sht15_measure(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let count: u32 = get_param_or(sub_m, "count", 1)?;
	let interval: u64 = get_param_or(sub_m, "interval", 1000)?;
	let supply = if sub_m.is_present("five_volt") { SupplyVoltage::V5_0 } else { SupplyVoltage::V3_3 };
	let mut bus = open_bus(matches, simulated_sht15())?;

	for round in 0..count {
		if round > 0 {
			// keep self-heating down: sensor should be active at most 10% of the time
			reliable_sleep(Duration::from_millis(interval));
		}
		if let Err(e) = sht15_measure_once(&mut bus, supply) {
			if let Some(&BusError::SensorTimeout { phase, .. }) = e.downcast_ref::<BusError>() {
				if phase != Sht15Phase::Acknowledge {
					// get the sensor out of its transfer before giving up
					bus.sht15().connection_reset();
				}
			}
			return Err(e);
		}
	}

	Ok(())
}

fn sht15_reset(matches: &clap::ArgMatches) -> AResult<()> {
	let mut bus = open_bus(matches, simulated_sht15())?;
	bus.sht15().soft_reset()?;
	bus.take_fault()?;
	println!("SHT15 reset");
	Ok(())
}

fn i2c_scan(matches: &clap::ArgMatches) -> AResult<()> {
	let mut bus = open_bus(matches, simulated_i2c())?;
	let found = bus.i2c().scan(i2c::SCAN_RANGE)?;
	bus.take_fault()?;
	if found.is_empty() {
		warn!("no I2C devices found");
	}
	for address in found {
		println!("0x{:02x}", address);
	}
	Ok(())
}

fn i2c_read(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address = parse_byte(sub_m.value_of("ADDRESS").unwrap_or(""))?;
	let register = parse_byte(sub_m.value_of("REGISTER").unwrap_or(""))?;
	let count: usize = get_param_or(sub_m, "COUNT", 1)?;
	let mut bus = open_bus(matches, simulated_i2c())?;

	let mut buffer = vec![0u8; count];
	bus.i2c().write_read(address, &[register], &mut buffer)?;
	bus.take_fault()?;
	for (i, byte) in buffer.iter().enumerate() {
		println!("@{:02x}: {:02x} {:08b}", register as usize + i, byte, byte);
	}
	Ok(())
}

fn i2c_write(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address = parse_byte(sub_m.value_of("ADDRESS").unwrap_or(""))?;
	let bytes = match sub_m.values_of("BYTES") {
		Some(values) => values.map(parse_byte).collect::<AResult<Vec<u8>>>()?,
		None => Vec::new(),
	};
	let mut bus = open_bus(matches, simulated_i2c())?;

	bus.i2c().write_bytes(address, &bytes)?;
	bus.take_fault()?;
	println!("wrote {} bytes to 0x{:02x}", bytes.len(), address);
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg clock: --clock +takes_value "GPIO number of the clock line (default 13)")
		(@arg data: --data +takes_value "GPIO number of the data line (default 14)")
		(@arg root: --root +takes_value "sysfs GPIO directory (default /sys/class/gpio)")
		(@arg simulate: -s --simulate "use a simulated bus and device instead of GPIOs")
		(@arg spin: --spin "use a calibrated spin loop instead of the monotonic clock for delays")
		(@arg realtime: --realtime +takes_value "lock memory and run with this SCHED_FIFO priority")
		(@arg timeout: --timeout +takes_value "SHT15 handshake timeout in ms (0: wait forever, default 500)")
		(@subcommand sht15 =>
			(about: "SHT15 humidity / temperature sensor")
			(@setting SubcommandRequiredElseHelp)
			(@subcommand measure =>
				(about: "measure temperature and humidity")
				(@arg count: -n --count +takes_value "number of measurements (default 1)")
				(@arg interval: -i --interval +takes_value "ms between measurements (default 1000)")
				(@arg five_volt: --five_volt "sensor runs on 5 V instead of 3.3 V")
			)
			(@subcommand reset =>
				(about: "soft reset (also resets the status register)")
			)
		)
		(@subcommand i2c =>
			(about: "generic I2C devices")
			(@setting SubcommandRequiredElseHelp)
			(@subcommand scan =>
				(about: "list addresses that acknowledge")
			)
			(@subcommand read =>
				(about: "read registers")
				(@arg ADDRESS: +required "7-bit device address")
				(@arg REGISTER: +required "first register")
				(@arg COUNT: "number of registers (default 1)")
			)
			(@subcommand write =>
				(about: "write bytes (usually register followed by data)")
				(@arg ADDRESS: +required "7-bit device address")
				(@arg BYTES: ... "bytes to write")
			)
		)
	).get_matches();

	match matches.subcommand() {
		("sht15", Some(sub_m)) => match sub_m.subcommand() {
			("measure", Some(sub_sub_m)) => {
				sht15_measure(&matches, sub_sub_m)
			},
			("reset", _) => {
				sht15_reset(&matches)
			},
			("", _) => bail!("no subcommand"),
			(cmd, _) => bail!("not implemented subcommand for 'sht15' {:?}", cmd),
		},
		("i2c", Some(sub_m)) => match sub_m.subcommand() {
			("scan", _) => {
				i2c_scan(&matches)
			},
			("read", Some(sub_sub_m)) => {
				i2c_read(&matches, sub_sub_m)
			},
			("write", Some(sub_sub_m)) => {
				i2c_write(&matches, sub_sub_m)
			},
			("", _) => bail!("no subcommand"),
			(cmd, _) => bail!("not implemented subcommand for 'i2c' {:?}", cmd),
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
