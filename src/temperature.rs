use serde::{Deserialize, Serialize};

/// The color temperature range used by the host, in mired-like units.
/// Lower values are cooler.
pub const HOST_MIN: u32 = 140;
pub const HOST_MAX: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionDirection {
    /// Vendor Kelvin value to host scale
    ToHost,
    /// Host scale value to vendor Kelvin
    ToVendor,
}

/// The `temperature_k` bounds advertised by a color_setting capability
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemperatureRange {
    pub min: u32,
    pub max: u32,
}

impl std::fmt::Display for TemperatureRange {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}K-{}K", self.min, self.max)
    }
}

impl TemperatureRange {
    pub fn new(min: u32, max: u32) -> Option<Self> {
        let range = Self { min, max };
        range.is_valid().then_some(range)
    }

    /// A range is only usable for conversion when it is non-empty
    pub fn is_valid(&self) -> bool {
        self.min < self.max
    }

    pub fn to_host(&self, kelvin: f64) -> i64 {
        convert_temperature(kelvin, *self, ConversionDirection::ToHost)
    }

    pub fn to_vendor(&self, host: f64) -> i64 {
        convert_temperature(host, *self, ConversionDirection::ToVendor)
    }
}

/// Linearly rescale between the vendor Kelvin range and the host range.
///
/// The two directions are not inverses of each other: the forward
/// mapping is anchored on `range.min` while the reverse mapping is
/// anchored on `range.max`, so `to_vendor(to_host(k))` lands on the
/// mirror image `min + max - k`.
///
/// Results are floored, never rounded.
pub fn convert_temperature(
    value: f64,
    range: TemperatureRange,
    direction: ConversionDirection,
) -> i64 {
    let min = range.min as f64;
    let max = range.max as f64;
    let host_min = HOST_MIN as f64;
    let host_span = (HOST_MAX - HOST_MIN) as f64;

    let result = match direction {
        ConversionDirection::ToHost => {
            let percent = (value - min) * 100. / (max - min);
            percent * host_span / 100. + host_min
        }
        ConversionDirection::ToVendor => {
            let percent = (value - host_min) * 100. / host_span;
            max - percent * (max - min) / 100.
        }
    };

    result.floor() as i64
}
