//! ==============================================================================
//! domain.rs - greenhouse reading and summary types
//! ==============================================================================
//!
//! purpose:
//!     the data shared between the ingest side (tcp handlers, simulator) and
//!     the consumer side (refresh loop, web server).
//!
//! relationships:
//!     - built by: protocol.rs (wire lines), simulator.rs (synthetic data)
//!     - stored in: buffer.rs
//!     - aggregated by: stats.rs into Summary
//!
//! ==============================================================================

use serde::Serialize;

/// one parsed sensor sample as pushed by a greenhouse node
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Reading {
    /// receipt time, unix milliseconds (assigned by the hub)
    pub timestamp_ms: u64,
    pub temperature_dht22: f64,
    pub temperature_dht11: f64,
    pub temperature_lm35_1: f64,
    pub temperature_lm35_2: f64,
    pub soil_moisture_1: f64,
    pub soil_moisture_2: f64,
    pub soil_moisture_3: f64,
    pub humidity_dht22: f64,
    pub humidity_dht11: f64,
    /// mean temperature as computed by the node
    pub average_temperature: f64,
}

impl Reading {
    /// value of a single sensor channel
    pub fn channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::TemperatureDht22 => self.temperature_dht22,
            Channel::TemperatureDht11 => self.temperature_dht11,
            Channel::TemperatureLm35_1 => self.temperature_lm35_1,
            Channel::TemperatureLm35_2 => self.temperature_lm35_2,
            Channel::SoilMoisture1 => self.soil_moisture_1,
            Channel::SoilMoisture2 => self.soil_moisture_2,
            Channel::SoilMoisture3 => self.soil_moisture_3,
            Channel::HumidityDht22 => self.humidity_dht22,
            Channel::HumidityDht11 => self.humidity_dht11,
        }
    }
}

/// what a channel measures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// degrees celsius
    Temperature,
    /// percent; soil moisture counts here too
    Humidity,
}

/// the nine raw sensor channels of a reading, in wire order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    TemperatureDht22,
    TemperatureDht11,
    #[serde(rename = "temperature_lm35_1")]
    TemperatureLm35_1,
    #[serde(rename = "temperature_lm35_2")]
    TemperatureLm35_2,
    #[serde(rename = "soil_moisture_1")]
    SoilMoisture1,
    #[serde(rename = "soil_moisture_2")]
    SoilMoisture2,
    #[serde(rename = "soil_moisture_3")]
    SoilMoisture3,
    HumidityDht22,
    HumidityDht11,
}

impl Channel {
    pub const ALL: [Channel; 9] = [
        Channel::TemperatureDht22,
        Channel::TemperatureDht11,
        Channel::TemperatureLm35_1,
        Channel::TemperatureLm35_2,
        Channel::SoilMoisture1,
        Channel::SoilMoisture2,
        Channel::SoilMoisture3,
        Channel::HumidityDht22,
        Channel::HumidityDht11,
    ];

    pub fn kind(self) -> ChannelKind {
        match self {
            Channel::TemperatureDht22
            | Channel::TemperatureDht11
            | Channel::TemperatureLm35_1
            | Channel::TemperatureLm35_2 => ChannelKind::Temperature,
            _ => ChannelKind::Humidity,
        }
    }

    /// human-readable label used by the dashboard page
    pub fn label(self) -> &'static str {
        match self {
            Channel::TemperatureDht22 => "Temp DHT22 (°C)",
            Channel::TemperatureDht11 => "Temp DHT11 (°C)",
            Channel::TemperatureLm35_1 => "Temp LM35 1 (°C)",
            Channel::TemperatureLm35_2 => "Temp LM35 2 (°C)",
            Channel::SoilMoisture1 => "Soil Moisture 1 (%)",
            Channel::SoilMoisture2 => "Soil Moisture 2 (%)",
            Channel::SoilMoisture3 => "Soil Moisture 3 (%)",
            Channel::HumidityDht22 => "Humidity DHT22 (%)",
            Channel::HumidityDht11 => "Humidity DHT11 (%)",
        }
    }

    pub fn of_kind(kind: ChannelKind) -> impl Iterator<Item = Channel> {
        Self::ALL.into_iter().filter(move |c| c.kind() == kind)
    }
}

/// mean/min/max of one channel across a snapshot
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChannelStats {
    pub channel: Channel,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// running totals kept by the buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// lines that became readings (plus simulator pushes)
    pub accepted: u64,
    /// lines dropped as malformed
    pub rejected: u64,
}

/// dashboard view of one buffer snapshot
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    /// rows the buffer keeps before evicting
    pub capacity: usize,
    pub max_temperature: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub channels: Vec<ChannelStats>,
    pub latest: Option<Reading>,
    pub ingest: IngestStats,
    pub generated_at_ms: u64,
}

/// current unix time in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
