use std::fs;
use std::io::{
	self,
	Read,
	Write,
};
use std::os::unix::fs::FileExt;
use std::path::{
	Path,
	PathBuf,
};

use crate::lines::{
	Direction,
	Drive,
	Lines,
};

const DEFAULT_ROOT: &str = "/sys/class/gpio";

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Mode {
	Input,
	Output,
}

/// Legacy sysfs GPIO interface (`/sys/class/gpio`).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SysfsGpio {
	root: PathBuf,
}

impl Default for SysfsGpio {
	fn default() -> Self {
		SysfsGpio::with_root(DEFAULT_ROOT)
	}
}

impl SysfsGpio {
	pub fn new() -> Self {
		SysfsGpio::default()
	}

	pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
		SysfsGpio { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Open a pin, exporting it first if necessary.
	pub fn open_pin(&self, number: u32) -> crate::AResult<SysfsPin> {
		let path = self.root.join(format!("gpio{}", number));
		if !path.exists() {
			// need to write in one syscall
			with_context!(("export GPIO {}", number), {
				fs::OpenOptions::new().write(true).open(self.root.join("export"))?
					.write_all(number.to_string().as_bytes())?;
				Ok(())
			})?;
			info!("exported GPIO {}", number);
		}

		with_context!(("open GPIO {} at {}", number, path.display()), {
			let value = fs::OpenOptions::new().read(true).write(true).open(path.join("value"))?;
			let mut direction = String::new();
			fs::File::open(path.join("direction"))?.read_to_string(&mut direction)?;
			let mode = match direction.trim() {
				"in" => Mode::Input,
				"out" => Mode::Output,
				d => bail!("unexpected direction {:?}", d),
			};
			Ok(SysfsPin {
				number,
				path: path.clone(),
				value,
				mode,
			})
		})
	}

	/// Open clock and data pins as a bus.
	pub fn open_lines(&self, clock: u32, data: u32) -> crate::AResult<SysfsLines> {
		ensure!(clock != data, "clock and data need separate GPIOs (both {})", clock);
		Ok(SysfsLines {
			clock: self.open_pin(clock)?,
			data: self.open_pin(data)?,
			drive: Drive::PushPull,
			data_output: false,
			clock_level: false,
			data_level: true,
			fault: None,
		})
	}
}

#[derive(Debug)]
pub struct SysfsPin {
	number: u32,
	path: PathBuf,
	value: fs::File,
	mode: Mode,
}

impl SysfsPin {
	pub fn number(&self) -> u32 {
		self.number
	}

	pub fn read(&self) -> io::Result<bool> {
		let mut buf = [0u8];
		let l = self.value.read_at(&mut buf, 0)?;
		if l != buf.len() {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty GPIO value"));
		}
		Ok(buf[0] == b'1')
	}

	/// Input; the pull-up takes the line high.
	pub fn release(&mut self) -> io::Result<()> {
		if self.mode != Mode::Input {
			self.write_direction("in")?;
			self.mode = Mode::Input;
		}
		Ok(())
	}

	pub fn drive(&mut self, high: bool) -> io::Result<()> {
		if self.mode == Mode::Output {
			let l = self.value.write_at(if high { b"1" } else { b"0" }, 0)?;
			if l != 1 {
				return Err(io::Error::new(io::ErrorKind::Other, "failed to write GPIO value"));
			}
		} else {
			// switches to output with the level in one step
			self.write_direction(if high { "high" } else { "low" })?;
			self.mode = Mode::Output;
		}
		Ok(())
	}

	fn write_direction(&self, direction: &str) -> io::Result<()> {
		fs::OpenOptions::new()
			.write(true)
			.truncate(true)
			.open(self.path.join("direction"))?
			.write_all(direction.as_bytes())
	}

	fn apply(&mut self, drive: Drive, output: bool, high: bool) -> io::Result<()> {
		match (output, drive) {
			(false, _) => self.release(),
			(true, Drive::OpenDrain) => if high { self.release() } else { self.drive(false) },
			(true, Drive::PushPull) => self.drive(high),
		}
	}
}

/// Bus lines on two sysfs GPIOs. Open-drain is emulated by switching a pin
/// between input (released) and output low, so both lines need external
/// pull-ups.
///
/// Every transition is a syscall, so the bus runs far slower than the
/// nominal timing; that's fine, both protocols only have minimum timings.
#[derive(Debug)]
pub struct SysfsLines {
	clock: SysfsPin,
	data: SysfsPin,
	drive: Drive,
	data_output: bool,
	clock_level: bool,
	data_level: bool,
	fault: Option<io::Error>,
}

impl SysfsLines {
	pub fn clock_pin(&self) -> &SysfsPin {
		&self.clock
	}

	pub fn data_pin(&self) -> &SysfsPin {
		&self.data
	}

	fn check(&mut self, result: io::Result<()>) {
		if let Err(e) = result {
			if self.fault.is_none() {
				error!("GPIO access failed: {}", e);
				self.fault = Some(e);
			}
		}
	}

	fn apply_clock(&mut self) {
		let r = self.clock.apply(self.drive, true, self.clock_level);
		self.check(r);
	}

	fn apply_data(&mut self) {
		let r = self.data.apply(self.drive, self.data_output, self.data_level);
		self.check(r);
	}
}

impl Lines for SysfsLines {
	fn configure(&mut self, drive: Drive) {
		self.drive = drive;
		self.data_output = true;
		self.apply_clock();
		self.apply_data();
	}

	fn set_data_direction(&mut self, direction: Direction) {
		self.data_output = direction == Direction::Output;
		self.apply_data();
	}

	fn set_clock(&mut self, high: bool) {
		self.clock_level = high;
		self.apply_clock();
	}

	fn set_data(&mut self, high: bool) {
		self.data_level = high;
		if self.data_output {
			self.apply_data();
		}
	}

	fn read_data(&mut self) -> bool {
		match self.data.read() {
			Ok(level) => level,
			Err(e) => {
				self.check(Err(e));
				// what the pull-up would give us
				true
			},
		}
	}

	fn take_fault(&mut self) -> Option<io::Error> {
		self.fault.take()
	}
}
