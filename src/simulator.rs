//! ==============================================================================
//! simulator.rs - synthetic greenhouse node
//! ==============================================================================
//!
//! purpose:
//!     pushes plausible readings into the buffer so the dashboard can be
//!     exercised without any hardware on the network.
//!
//! ranges (uniform):
//!     - air temperature around 25°C: dht22 ±1.5, dht11 ±1.0, lm35 -1.0..+2.0
//!     - soil moisture around 55%: ±5
//!     - dht humidity around 55%: ±3
//!     - average = mean of the four temperatures
//!
//! ==============================================================================

use crate::buffer::SharedBuffer;
use crate::domain::{now_ms, Reading};

use rand::Rng;
use std::time::Duration;

const BASE_TEMPERATURE: f64 = 25.0;
const BASE_HUMIDITY: f64 = 55.0;

/// draw one synthetic reading
pub fn simulated_reading<R: Rng + ?Sized>(rng: &mut R, timestamp_ms: u64) -> Reading {
    let t = BASE_TEMPERATURE;
    let h = BASE_HUMIDITY;

    let temperature_dht22 = rng.gen_range(t - 1.5..=t + 1.5);
    let temperature_dht11 = rng.gen_range(t - 1.0..=t + 1.0);
    let temperature_lm35_1 = rng.gen_range(t - 1.0..=t + 2.0);
    let temperature_lm35_2 = rng.gen_range(t - 1.0..=t + 2.0);

    Reading {
        timestamp_ms,
        temperature_dht22,
        temperature_dht11,
        temperature_lm35_1,
        temperature_lm35_2,
        soil_moisture_1: rng.gen_range(h - 5.0..=h + 5.0),
        soil_moisture_2: rng.gen_range(h - 5.0..=h + 5.0),
        soil_moisture_3: rng.gen_range(h - 5.0..=h + 5.0),
        humidity_dht22: rng.gen_range(h - 3.0..=h + 3.0),
        humidity_dht11: rng.gen_range(h - 3.0..=h + 3.0),
        average_temperature: (temperature_dht22
            + temperature_dht11
            + temperature_lm35_1
            + temperature_lm35_2)
            / 4.0,
    }
}

/// push one simulated reading per `interval`, forever
pub async fn run(buffer: SharedBuffer, interval: Duration) {
    tracing::info!("Simulator pushing a reading every {}ms", interval.as_millis());
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let reading = simulated_reading(&mut rand::thread_rng(), now_ms());
        tracing::debug!(
            "simulated reading: avg {:.2}°C, dht22 humidity {:.1}%",
            reading.average_temperature,
            reading.humidity_dht22
        );
        buffer.push(reading).await;
    }
}
