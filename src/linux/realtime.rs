use std::io;
use std::mem;

use libc::{
	MCL_CURRENT,
	MCL_FUTURE,
	SCHED_FIFO,
	mlockall,
	sched_get_priority_max,
	sched_get_priority_min,
	sched_param,
	sched_setscheduler,
};

/// Keep all current and future pages resident, so the bit loops don't stall
/// on page faults.
pub fn lock_memory() -> io::Result<()> {
	let res = unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) };
	if 0 != res {
		return Err(io::Error::last_os_error());
	}
	Ok(())
}

/// Run the calling thread with `SCHED_FIFO` at `priority`, so a busy-waiting
/// transfer isn't preempted by normal tasks.
pub fn set_fifo_priority(priority: i32) -> io::Result<()> {
	let (min, max) = unsafe { (sched_get_priority_min(SCHED_FIFO), sched_get_priority_max(SCHED_FIFO)) };
	if priority < min || priority > max {
		return Err(io::Error::new(
			io::ErrorKind::InvalidInput,
			format!("SCHED_FIFO priority {} not in {}..={}", priority, min, max),
		));
	}

	let mut param: sched_param = unsafe { mem::zeroed() };
	param.sched_priority = priority;
	let res = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
	if 0 != res {
		return Err(io::Error::last_os_error());
	}
	debug!("running with SCHED_FIFO priority {}", priority);
	Ok(())
}
