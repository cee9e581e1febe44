//! ---
//! fl_section: "11-simulation"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Seeded temperature, humidity, and gas readings."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::f64::consts::PI;

use anyhow::{Context, Result};
use fieldlink_common::{SensorReading, TelemetryConfig, TelemetrySource};
use rand::prelude::*;
use rand_distr::Normal;
use tracing::debug;

/// Reads attempted per sensor before reporting a failure.
const READ_ATTEMPTS: u32 = 2;

/// Slowly drifting readings around the configured baselines with Gaussian noise.
#[derive(Debug)]
pub struct SimulatedSensors {
    config: TelemetryConfig,
    rng: StdRng,
    noise: Normal<f64>,
    samples: u64,
}

impl SimulatedSensors {
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.failure_rate) {
            anyhow::bail!("telemetry.failure_rate must be within 0..=1");
        }
        Ok(Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.seed),
            noise: Normal::new(0.0, 0.3).context("invalid noise distribution")?,
            samples: 0,
        })
    }

    fn attempt(&mut self) -> bool {
        (0..READ_ATTEMPTS).any(|_| self.rng.gen::<f64>() >= self.config.failure_rate)
    }

    fn noise_sample(&mut self) -> f64 {
        self.noise.sample(&mut self.rng)
    }
}

impl TelemetrySource for SimulatedSensors {
    fn read(&mut self) -> SensorReading {
        self.samples += 1;
        let t = self.samples as f64;
        let drift = (2.0 * PI * t / 120.0).sin();

        let climate_ok = self.attempt();
        let temperature = self.config.temperature_c + 1.5 * drift + self.noise_sample();
        let humidity = (self.config.humidity_pct - 4.0 * drift + 2.0 * self.noise_sample())
            .clamp(0.0, 100.0);
        let gas_ok = self.attempt();
        let ppm = (self.config.ppm + 25.0 * drift + 10.0 * self.noise_sample()).max(0.0);

        if !climate_ok || !gas_ok {
            debug!(sample = self.samples, climate_ok, gas_ok, "simulated sensor read failed");
        }
        SensorReading {
            temperature: climate_ok.then_some(temperature),
            humidity: climate_ok.then_some(humidity),
            ppm: gas_ok.then_some(ppm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_stay_near_baselines() {
        let mut sensors = SimulatedSensors::new(&TelemetryConfig::default()).unwrap();
        for _ in 0..200 {
            let reading = sensors.read();
            let temperature = reading.temperature.unwrap();
            let humidity = reading.humidity.unwrap();
            assert!((15.0..30.0).contains(&temperature));
            assert!((0.0..=100.0).contains(&humidity));
            assert!(reading.ppm.unwrap() >= 0.0);
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let config = TelemetryConfig::default();
        let mut a = SimulatedSensors::new(&config).unwrap();
        let mut b = SimulatedSensors::new(&config).unwrap();
        for _ in 0..10 {
            assert_eq!(a.read(), b.read());
        }
    }

    #[test]
    fn certain_failure_reports_missing_values() {
        let config = TelemetryConfig {
            failure_rate: 1.0,
            ..TelemetryConfig::default()
        };
        let mut sensors = SimulatedSensors::new(&config).unwrap();
        assert_eq!(sensors.read(), SensorReading::default());
    }

    #[test]
    fn invalid_failure_rate_is_rejected() {
        let config = TelemetryConfig {
            failure_rate: 1.5,
            ..TelemetryConfig::default()
        };
        assert!(SimulatedSensors::new(&config).is_err());
    }
}
