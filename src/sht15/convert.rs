//! Conversion of raw SHT1x readings (coefficients from the datasheet).

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum SupplyVoltage {
	V5_0,
	V4_0,
	V3_5,
	/// Mikro board supply; coefficient interpolated between 3.5 V and 3 V.
	V3_3,
	V3_0,
	V2_5,
}

impl SupplyVoltage {
	// temperature offset d1 in °C
	fn offset(self) -> f32 {
		match self {
			SupplyVoltage::V5_0 => -40.1,
			SupplyVoltage::V4_0 => -39.8,
			SupplyVoltage::V3_5 => -39.7,
			SupplyVoltage::V3_3 => -39.66,
			SupplyVoltage::V3_0 => -39.6,
			SupplyVoltage::V2_5 => -39.4,
		}
	}
}

/// Measurement resolution as selected in the status register.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Resolution {
	/// 14 bit temperature, 12 bit humidity (power-on default)
	High,
	/// 12 bit temperature, 8 bit humidity
	Low,
}

impl Default for Resolution {
	fn default() -> Self {
		Resolution::High
	}
}

pub fn temperature_celsius(raw: u16, supply: SupplyVoltage, resolution: Resolution) -> f32 {
	let (mask, d2) = match resolution {
		Resolution::High => (0x3fff, 0.01),
		Resolution::Low => (0x0fff, 0.04),
	};
	supply.offset() + d2 * (raw & mask) as f32
}

/// Temperature compensated relative humidity in %, clamped to 0..=100.
pub fn relative_humidity(raw: u16, temperature: f32, resolution: Resolution) -> f32 {
	let (mask, c1, c2, c3, t1, t2) = match resolution {
		Resolution::High => (0x0fff, -2.0468, 0.0367, -1.5955e-6, 0.01, 0.00008),
		Resolution::Low => (0x00ff, -2.0468, 0.5872, -4.0845e-4, 0.01, 0.00128),
	};
	let so = (raw & mask) as f32;
	let linear = c1 + c2 * so + c3 * so * so;
	let compensated = (temperature - 25.0) * (t1 + t2 * so) + linear;
	compensated.max(0.0).min(100.0)
}
