use std::time::Duration;

use super::Levels;
use crate::lines::{
	Direction,
	Drive,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EventKind {
	Configure(Drive),
	Direction(Direction),
	Clock,
	Data,
	/// master read the data line (with the level it got)
	Sample(bool),
	/// the peripheral changed what it drives
	Peripheral,
}

/// Wire state right after something happened on the bus.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Event {
	pub at: Duration,
	pub kind: EventKind,
	pub clock: bool,
	pub data: bool,
	/// what the master drives on data: `Some(level)` or released (`None`)
	pub master: Option<bool>,
}

impl Event {
	pub fn levels(&self) -> Levels {
		Levels {
			clock: self.clock,
			data: self.data,
		}
	}
}

#[derive(Clone, Debug)]
pub struct Waveform {
	initial: Levels,
	events: Vec<Event>,
}

impl Waveform {
	pub fn new(initial: Levels) -> Self {
		Waveform {
			initial,
			events: Vec::new(),
		}
	}

	pub(super) fn push(&mut self, event: Event) {
		self.events.push(event);
	}

	pub fn initial(&self) -> Levels {
		self.initial
	}

	pub fn events(&self) -> &[Event] {
		&self.events
	}

	pub fn last(&self) -> Levels {
		self.events.last().map(Event::levels).unwrap_or(self.initial)
	}

	/// Events paired with the levels just before them.
	pub fn transitions<'a>(&'a self) -> impl Iterator<Item = (Levels, &'a Event)> + 'a {
		let mut previous = self.initial;
		self.events.iter().map(move |event| {
			let before = previous;
			previous = event.levels();
			(before, event)
		})
	}

	/// Events at which the clock went high, in order.
	pub fn rising_edges(&self) -> Vec<Event> {
		self.transitions()
			.filter(|(before, event)| event.levels().rising_clock(*before))
			.map(|(_, event)| *event)
			.collect()
	}

	/// Data level at each rising clock edge.
	pub fn bits_at_rising_edges(&self) -> Vec<bool> {
		self.rising_edges().iter().map(|event| event.data).collect()
	}

	pub fn start_conditions(&self) -> usize {
		self.transitions()
			.filter(|(before, event)| event.levels().start_condition(*before))
			.count()
	}

	pub fn stop_conditions(&self) -> usize {
		self.transitions()
			.filter(|(before, event)| event.levels().stop_condition(*before))
			.count()
	}

	/// Samples taken while the master itself drove the data line.
	pub fn samples_while_driving(&self) -> usize {
		self.events.iter()
			.filter(|event| match event.kind {
				EventKind::Sample(_) => event.master.is_some(),
				_ => false,
			})
			.count()
	}

	pub fn samples(&self) -> Vec<bool> {
		self.events.iter()
			.filter_map(|event| match event.kind {
				EventKind::Sample(level) => Some(level),
				_ => None,
			})
			.collect()
	}
}
