mod gpio;
mod realtime;

pub use self::gpio::{
	SysfsGpio,
	SysfsLines,
	SysfsPin,
};

pub use self::realtime::{
	lock_memory,
	set_fifo_priority,
};
