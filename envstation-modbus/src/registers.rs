//! Register maps: which slave holds which quantity, and how to convert it.

use envstation_common::Quantity;
use serde::{Deserialize, Serialize};

use crate::convert::{Conversion, Pollutant};

/// One Modbus device polled with a single read-holding-registers request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor name (used in logs)
    pub name: String,

    /// Modbus slave ID (1-247)
    pub slave_id: u8,

    /// Starting address (0-based)
    #[serde(default)]
    pub start_address: u16,

    /// Number of registers to read (default: 1)
    #[serde(default = "default_count")]
    pub register_count: u16,

    /// Values extracted from the returned block
    pub channels: Vec<ChannelConfig>,
}

fn default_count() -> u16 {
    1
}

/// A quantity taken from one register of a sensor's block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub quantity: Quantity,

    /// Index into the returned block (not the Modbus address)
    #[serde(default)]
    pub register: u16,

    #[serde(default)]
    pub conversion: Conversion,
}

impl ChannelConfig {
    pub const fn new(quantity: Quantity, register: u16, conversion: Conversion) -> Self {
        Self {
            quantity,
            register,
            conversion,
        }
    }

    /// Convert this channel's register, or `None` if the block is too short.
    pub fn decode(&self, block: &[u16]) -> Option<f64> {
        block
            .get(usize::from(self.register))
            .map(|raw| self.conversion.apply(*raw))
    }
}

impl SensorConfig {
    fn new(name: &str, slave_id: u8, register_count: u16, channels: Vec<ChannelConfig>) -> Self {
        Self {
            name: name.to_string(),
            slave_id,
            start_address: 0,
            register_count,
            channels,
        }
    }
}

/// Built-in station layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Full weather station: wind, solar, climate, rainfall and gas channels.
    #[default]
    Weather,
    /// RK300 gas sensor alone, reported as air-quality index buckets.
    AirQuality,
}

impl Profile {
    /// Sensors of this profile in poll order.
    pub fn sensors(&self) -> Vec<SensorConfig> {
        match self {
            Profile::Weather => weather_sensors(),
            Profile::AirQuality => air_quality_sensors(),
        }
    }
}

fn weather_sensors() -> Vec<SensorConfig> {
    use Quantity::*;

    let tenth = Conversion::linear(10.0);
    let unit = Conversion::linear(1.0);

    vec![
        // RK100-02 anemometer
        SensorConfig::new("wind_speed", 1, 1, vec![ChannelConfig::new(WindSpeed, 0, tenth)]),
        // RK110-02 wind vane
        SensorConfig::new(
            "wind_direction",
            2,
            1,
            vec![ChannelConfig::new(WindDirection, 0, unit)],
        ),
        // RK200-04 pyranometer
        SensorConfig::new(
            "solar_radiation",
            6,
            1,
            vec![ChannelConfig::new(SolarRadiation, 0, unit)],
        ),
        // RK330-01 temperature/humidity/pressure
        SensorConfig::new(
            "climate",
            3,
            3,
            vec![
                ChannelConfig::new(Temperature, 0, tenth),
                ChannelConfig::new(Humidity, 1, tenth),
                ChannelConfig::new(Pressure, 2, tenth),
            ],
        ),
        // Rain gauge; register 0 is unused
        SensorConfig::new("rainfall", 4, 2, vec![ChannelConfig::new(Rainfall, 1, tenth)]),
        // RK300-08 gas and particulate
        SensorConfig::new(
            "gas",
            5,
            16,
            vec![
                ChannelConfig::new(Pm25, 0, unit),
                ChannelConfig::new(Pm10, 1, unit),
                ChannelConfig::new(Co2, 6, unit),
                ChannelConfig::new(O2, 7, tenth),
                ChannelConfig::new(So2, 8, tenth),
                ChannelConfig::new(No2, 9, tenth),
                ChannelConfig::new(O3, 10, tenth),
            ],
        ),
    ]
}

fn air_quality_sensors() -> Vec<SensorConfig> {
    let bucket = |quantity, register, table| {
        ChannelConfig::new(quantity, register, Conversion::Breakpoints { table })
    };

    vec![SensorConfig::new(
        "gas",
        5,
        9,
        vec![
            bucket(Quantity::So2, 0, Pollutant::So2),
            bucket(Quantity::O3, 1, Pollutant::O3),
            bucket(Quantity::Hc, 2, Pollutant::Hc),
            bucket(Quantity::Co, 3, Pollutant::Co),
            bucket(Quantity::No2, 4, Pollutant::No2),
            bucket(Quantity::Pm25, 5, Pollutant::Pm25),
            bucket(Quantity::Pm10, 6, Pollutant::Pm10),
        ],
    )]
}

/// Every quantity a register map reports, in poll order.
pub fn quantities(sensors: &[SensorConfig]) -> impl Iterator<Item = Quantity> + '_ {
    sensors
        .iter()
        .flat_map(|s| s.channels.iter().map(|c| c.quantity))
}
