use chrono::{DateTime, FixedOffset, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Format used for the `date` field of every upload payload.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A physical quantity reported by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    WindSpeed,
    WindDirection,
    SolarRadiation,
    Temperature,
    Humidity,
    Pressure,
    Rainfall,
    Pm25,
    Pm10,
    Co2,
    O2,
    So2,
    No2,
    O3,
    Co,
    Hc,
}

impl Quantity {
    /// Field name used in upload payloads.
    pub fn field_name(&self) -> &'static str {
        match self {
            Quantity::WindSpeed => "windSpeed",
            Quantity::WindDirection => "windDirection",
            Quantity::SolarRadiation => "solarRadiation",
            Quantity::Temperature => "temperature",
            Quantity::Humidity => "humidity",
            Quantity::Pressure => "pressure",
            Quantity::Rainfall => "rainfall",
            Quantity::Pm25 => "PM2.5",
            Quantity::Pm10 => "PM10",
            Quantity::Co2 => "CO2",
            Quantity::O2 => "O2",
            Quantity::So2 => "SO2",
            Quantity::No2 => "NO2",
            Quantity::O3 => "O3",
            Quantity::Co => "CO",
            Quantity::Hc => "HC",
        }
    }

    /// Display unit, as printed in the poll log.
    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::WindSpeed => "m/s",
            Quantity::WindDirection => "degree",
            Quantity::SolarRadiation => "W/m²",
            Quantity::Temperature => "°C",
            Quantity::Humidity => "%",
            Quantity::Pressure => "mbar",
            Quantity::Rainfall => "mm",
            Quantity::Pm25 | Quantity::Pm10 => "ug/m3",
            Quantity::O2 => "%VOL",
            Quantity::Co2
            | Quantity::So2
            | Quantity::No2
            | Quantity::O3
            | Quantity::Co
            | Quantity::Hc => "ppm",
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// One named quantity with its current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub quantity: Quantity,
    pub value: f64,
}

/// The current value of every quantity a station reports.
///
/// Values are overwritten in place by each successful read and keep their
/// previous value otherwise. Iteration order is declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSet {
    timestamp: Option<DateTime<FixedOffset>>,
    readings: Vec<Reading>,
}

impl ReadingSet {
    /// Create a set holding `0.0` for each quantity, duplicates ignored.
    pub fn zeroed(quantities: impl IntoIterator<Item = Quantity>) -> Self {
        let mut set = Self {
            timestamp: None,
            readings: Vec::new(),
        };
        for quantity in quantities {
            if set.get(quantity).is_none() {
                set.readings.push(Reading {
                    quantity,
                    value: 0.0,
                });
            }
        }
        set
    }

    /// Current value of a quantity, if the set declares it.
    pub fn get(&self, quantity: Quantity) -> Option<f64> {
        self.readings
            .iter()
            .find(|r| r.quantity == quantity)
            .map(|r| r.value)
    }

    /// Overwrite a value, appending the quantity if it was not declared.
    pub fn set(&mut self, quantity: Quantity, value: f64) {
        match self.readings.iter_mut().find(|r| r.quantity == quantity) {
            Some(reading) => reading.value = value,
            None => self.readings.push(Reading { quantity, value }),
        }
    }

    /// Iterate readings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Record when this set was assembled.
    pub fn stamp(&mut self, at: DateTime<FixedOffset>) {
        self.timestamp = Some(at);
    }

    /// The `date` payload field; empty until the set is stamped.
    pub fn date_string(&self) -> String {
        self.timestamp
            .map(|t| t.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }
}

impl Serialize for ReadingSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.readings.len() + 1))?;
        map.serialize_entry("date", &self.date_string())?;
        for reading in &self.readings {
            map.serialize_entry(reading.quantity.field_name(), &reading.value)?;
        }
        map.end()
    }
}

/// Current wall-clock time at the given offset.
pub fn current_local_time(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_zeroed_dedups_and_keeps_order() {
        let set = ReadingSet::zeroed([
            Quantity::Temperature,
            Quantity::WindSpeed,
            Quantity::Temperature,
        ]);

        let order: Vec<_> = set.iter().map(|r| r.quantity).collect();
        assert_eq!(order, vec![Quantity::Temperature, Quantity::WindSpeed]);
        assert_eq!(set.get(Quantity::WindSpeed), Some(0.0));
        assert_eq!(set.get(Quantity::So2), None);
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut set = ReadingSet::zeroed([Quantity::WindSpeed, Quantity::Humidity]);
        set.set(Quantity::WindSpeed, 12.3);
        set.set(Quantity::WindSpeed, 4.5);
        set.set(Quantity::Co, 4000.0);

        assert_eq!(set.len(), 3);
        assert_eq!(set.get(Quantity::WindSpeed), Some(4.5));
        assert_eq!(set.get(Quantity::Co), Some(4000.0));
    }

    #[test]
    fn test_payload_shape() {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        let mut set = ReadingSet::zeroed([Quantity::WindSpeed, Quantity::Pm25]);
        set.set(Quantity::WindSpeed, 12.3);
        set.stamp(offset.with_ymd_and_hms(2024, 8, 2, 14, 5, 9).unwrap());

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2024-08-02 14:05:09","windSpeed":12.3,"PM2.5":0.0}"#
        );
    }

    #[test]
    fn test_unstamped_date_is_empty() {
        let set = ReadingSet::zeroed([Quantity::Rainfall]);
        assert_eq!(set.date_string(), "");
    }

    #[test]
    fn test_quantity_config_names() {
        let q: Quantity = serde_json::from_str("\"pm25\"").unwrap();
        assert_eq!(q, Quantity::Pm25);
        assert_eq!(q.to_string(), "PM2.5");
        assert_eq!(Quantity::SolarRadiation.unit(), "W/m²");
    }
}
