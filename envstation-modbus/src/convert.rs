//! Raw register to physical value conversion.
//!
//! Two kinds of conversion exist: linear scaling by a fixed divisor, and an
//! air-quality index lookup against a per-pollutant breakpoint table.

use serde::{Deserialize, Serialize};

/// How a raw holding register becomes a reported value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conversion {
    /// `raw / divisor`.
    Linear {
        #[serde(default = "default_divisor")]
        divisor: f64,
    },
    /// Index bucket from the pollutant's breakpoint table.
    Breakpoints { table: Pollutant },
}

fn default_divisor() -> f64 {
    1.0
}

impl Default for Conversion {
    fn default() -> Self {
        Conversion::Linear {
            divisor: default_divisor(),
        }
    }
}

impl Conversion {
    /// Convert one raw register value.
    pub fn apply(&self, raw: u16) -> f64 {
        match self {
            Conversion::Linear { divisor } => f64::from(raw) / divisor,
            Conversion::Breakpoints { table } => table.table().lookup(raw),
        }
    }

    /// Shorthand for a linear conversion.
    pub const fn linear(divisor: f64) -> Self {
        Conversion::Linear { divisor }
    }
}

/// One `[low, high]` range of a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub low: u16,
    pub high: u16,
    pub index: f64,
}

/// Ordered ranges evaluated top to bottom; first match wins.
///
/// Values above the highest explicit range map to `ceiling`. Values that fall
/// in no range and are not above the last one map to `0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakpointTable {
    pub ranges: &'static [Breakpoint],
    pub ceiling: f64,
}

impl BreakpointTable {
    pub fn lookup(&self, raw: u16) -> f64 {
        if let Some(bp) = self
            .ranges
            .iter()
            .find(|bp| (bp.low..=bp.high).contains(&raw))
        {
            return bp.index;
        }

        match self.ranges.last() {
            Some(last) if raw > last.high => self.ceiling,
            _ => 0.0,
        }
    }
}

/// Builds the standard five-bucket table: 0-50, 51-100, 101-200, 201-300, >300.
macro_rules! aqi_table {
    ($name:ident, $good:expr, $moderate:expr, $unhealthy:expr, $very:expr, $hazardous:expr) => {
        const $name: BreakpointTable = BreakpointTable {
            ranges: &[
                Breakpoint { low: 0, high: 50, index: $good },
                Breakpoint { low: 51, high: 100, index: $moderate },
                Breakpoint { low: 101, high: 200, index: $unhealthy },
                Breakpoint { low: 201, high: 300, index: $very },
            ],
            ceiling: $hazardous,
        };
    };
}

aqi_table!(SO2_TABLE, 52.0, 180.0, 400.0, 800.0, 1200.0);
aqi_table!(O3_TABLE, 120.0, 235.0, 400.0, 800.0, 1000.0);
aqi_table!(HC_TABLE, 45.0, 100.0, 215.0, 432.0, 648.0);
aqi_table!(CO_TABLE, 4000.0, 8000.0, 15000.0, 30000.0, 45000.0);
aqi_table!(NO2_TABLE, 80.0, 200.0, 1130.0, 2260.0, 3000.0);
aqi_table!(PM25_TABLE, 15.5, 55.4, 150.4, 250.4, 500.0);
aqi_table!(PM10_TABLE, 50.0, 150.0, 350.0, 420.0, 500.0);

/// Pollutants with a built-in breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    So2,
    O3,
    /// Hydrocarbons; the RK300 reports this channel where O2 sits on other models.
    Hc,
    Co,
    No2,
    Pm25,
    Pm10,
}

impl Pollutant {
    pub fn table(&self) -> &'static BreakpointTable {
        match self {
            Pollutant::So2 => &SO2_TABLE,
            Pollutant::O3 => &O3_TABLE,
            Pollutant::Hc => &HC_TABLE,
            Pollutant::Co => &CO_TABLE,
            Pollutant::No2 => &NO2_TABLE,
            Pollutant::Pm25 => &PM25_TABLE,
            Pollutant::Pm10 => &PM10_TABLE,
        }
    }
}
