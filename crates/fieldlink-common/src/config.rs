//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Shared primitives and utilities for the gateway runtime."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9899))
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Primary configuration object for the gateway daemon.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Promote best-effort bring-up steps (data probe, TLS configuration) to stage-fatal.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub modem: ModemConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "FIELDLINK_CONFIG";

    /// Load configuration from disk, respecting the `FIELDLINK_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.modem.validate()?;
        self.network.validate()?;
        self.tls.validate()?;
        self.broker.validate()?;
        self.schedule.validate()?;
        self.timing.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    pub port: String,
    pub baud_rate: u32,
    pub power: PowerConfig,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_owned(),
            baud_rate: 115_200,
            power: PowerConfig::default(),
        }
    }
}

impl ModemConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(anyhow!("modem.port must name a serial device"));
        }
        if self.baud_rate == 0 {
            return Err(anyhow!("modem.baud_rate must be greater than zero"));
        }
        Ok(())
    }
}

/// How the modem enable, power-key, and DTR lines are driven.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PowerKind {
    /// The peripheral is powered externally (USB dongles, bench supplies).
    #[default]
    None,
    /// Lines are exported GPIOs under `gpio_root`.
    SysfsGpio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub kind: PowerKind,
    pub gpio_root: PathBuf,
    pub enable_gpio: u32,
    pub pwrkey_gpio: u32,
    pub dtr_gpio: u32,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            kind: PowerKind::None,
            gpio_root: PathBuf::from("/sys/class/gpio"),
            enable_gpio: 12,
            pwrkey_gpio: 4,
            dtr_gpio: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub apn: String,
    pub pdp_context: u8,
    pub registration_attempts: u32,
    /// Substrings of the registration query response that mean "registered".
    pub registered_codes: Vec<String>,
    pub probe_host: String,
    pub probe_ok_codes: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            apn: "internet".to_owned(),
            pdp_context: 1,
            registration_attempts: 20,
            registered_codes: vec!["+CREG: 0,1".to_owned(), "+CREG: 0,5".to_owned()],
            probe_host: "8.8.8.8".to_owned(),
            probe_ok_codes: vec!["+CPING: 1".to_owned(), "+CPING: 3".to_owned()],
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.apn.trim().is_empty() {
            return Err(anyhow!("network.apn must not be empty"));
        }
        if self.registration_attempts == 0 {
            return Err(anyhow!("network.registration_attempts must be at least 1"));
        }
        if self.registered_codes.is_empty() {
            return Err(anyhow!("network.registered_codes must list at least one code"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub context: u8,
    pub ssl_version: u8,
    pub auth_mode: u8,
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub ca_cert_name: String,
    pub client_cert_name: String,
    pub client_key_name: String,
    /// Text that marks an artifact file which was never filled in.
    pub placeholder_marker: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context: 0,
            ssl_version: 3,
            auth_mode: 2,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            ca_cert_name: "cacert.pem".to_owned(),
            client_cert_name: "clientcert.pem".to_owned(),
            client_key_name: "clientkey.pem".to_owned(),
            placeholder_marker: "PASTE_HERE".to_owned(),
        }
    }
}

impl TlsConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        for (key, value) in [
            ("tls.ca_cert", &self.ca_cert),
            ("tls.client_cert", &self.client_cert),
            ("tls.client_key", &self.client_key),
        ] {
            if value.is_none() {
                return Err(anyhow!("{} is required when tls.enabled = true", key));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub endpoint: String,
    pub port: u16,
    pub topic: String,
    pub client_slot: u8,
    pub keepalive_secs: u32,
    pub clean_session: bool,
    pub qos: u8,
    pub publish_timeout_secs: u32,
    pub disconnect_timeout_secs: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            port: 8883,
            topic: "sensors".to_owned(),
            client_slot: 0,
            keepalive_secs: 60,
            clean_session: true,
            qos: 0,
            publish_timeout_secs: 60,
            disconnect_timeout_secs: 60,
        }
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(anyhow!("broker.endpoint must not be empty"));
        }
        if self.topic.trim().is_empty() {
            return Err(anyhow!("broker.topic must not be empty"));
        }
        if self.qos > 2 {
            return Err(anyhow!("broker.qos must be 0, 1 or 2"));
        }
        Ok(())
    }

    /// Server URL in the form the peripheral's connect command expects.
    pub fn url(&self) -> String {
        format!("tcp://{}:{}", self.endpoint, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub id_prefix: String,
    /// Literal hardware id; takes precedence over `hardware_id_path`.
    pub hardware_id: Option<String>,
    pub hardware_id_path: PathBuf,
    /// How the hardware id text is turned into id bytes.
    pub hardware_id_format: HardwareIdFormat,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id_prefix: "FIELDLINK_".to_owned(),
            hardware_id: None,
            hardware_id_path: PathBuf::from("/etc/machine-id"),
            hardware_id_format: HardwareIdFormat::Hex,
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HardwareIdFormat {
    /// The id is hex text (`/etc/machine-id`); it is decoded and must be valid hex.
    #[default]
    Hex,
    /// The id is an opaque string whose bytes are hex-encoded as-is.
    Text,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub publish_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub heartbeat_on: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub heartbeat_off: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub halt_pause: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            publish_interval: ms(28_000),
            heartbeat_on: ms(1_000),
            heartbeat_off: ms(1_000),
            halt_pause: ms(2_000),
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.publish_interval.is_zero() {
            return Err(anyhow!("schedule.publish_interval must be greater than zero"));
        }
        Ok(())
    }
}

/// Every protocol wait used during bring-up and publishing, in milliseconds.
///
/// The defaults are the values the peripheral is known to tolerate. In particular
/// `power_settle` must not be shortened: the modem ignores commands until it elapses.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub boot_stabilize: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub power_enable_gap: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub power_pulse: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub power_settle: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub post_power_pause: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub handshake_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub stage_pause: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub registration_query_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub registration_retry_delay: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub signal_query_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub pdp_define_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub attach_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub attach_pause: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub activate_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub activate_pause: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub probe_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub artifact_drain_pause: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub artifact_prompt_budget: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub artifact_ack_budget: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub artifact_poll_slice: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub artifact_write_settle: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub artifact_gap: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tls_command_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub service_stop_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub service_restart_pause: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub service_start_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub session_release_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub session_acquire_pause: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub session_acquire_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_context_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_sync_window: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_async_budget: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_poll_slice: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_progress_every: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub publish_declare_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub publish_echo_drain: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub publish_commit_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub teardown_disconnect_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub teardown_release_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub teardown_stop_wait: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            boot_stabilize: ms(5_000),
            power_enable_gap: ms(100),
            power_pulse: ms(1_000),
            power_settle: ms(5_000),
            post_power_pause: ms(2_000),
            handshake_wait: ms(1_000),
            stage_pause: ms(1_000),
            registration_query_wait: ms(800),
            registration_retry_delay: ms(1_200),
            signal_query_wait: ms(1_000),
            pdp_define_wait: ms(2_000),
            attach_wait: ms(2_500),
            attach_pause: ms(1_500),
            activate_wait: ms(2_500),
            activate_pause: ms(1_000),
            probe_wait: ms(6_000),
            artifact_drain_pause: ms(500),
            artifact_prompt_budget: ms(8_000),
            artifact_ack_budget: ms(8_000),
            artifact_poll_slice: ms(100),
            artifact_write_settle: ms(3_500),
            artifact_gap: ms(700),
            tls_command_wait: ms(1_500),
            service_stop_wait: ms(2_000),
            service_restart_pause: ms(700),
            service_start_wait: ms(4_000),
            session_release_wait: ms(1_000),
            session_acquire_pause: ms(700),
            session_acquire_wait: ms(3_000),
            connect_context_wait: ms(3_000),
            connect_sync_window: ms(3_000),
            connect_async_budget: ms(35_000),
            connect_poll_slice: ms(500),
            connect_progress_every: ms(10_000),
            publish_declare_wait: ms(1_500),
            publish_echo_drain: ms(500),
            publish_commit_wait: ms(2_000),
            teardown_disconnect_wait: ms(3_000),
            teardown_release_wait: ms(2_000),
            teardown_stop_wait: ms(2_000),
        }
    }
}

impl TimingConfig {
    /// All-zero waits with non-zero poll slices; used by fast simulations.
    pub fn immediate() -> Self {
        Self {
            artifact_poll_slice: ms(1),
            connect_poll_slice: ms(1),
            connect_progress_every: ms(10_000),
            ..Self::zeroed()
        }
    }

    fn zeroed() -> Self {
        let zero = Duration::ZERO;
        Self {
            boot_stabilize: zero,
            power_enable_gap: zero,
            power_pulse: zero,
            power_settle: zero,
            post_power_pause: zero,
            handshake_wait: zero,
            stage_pause: zero,
            registration_query_wait: zero,
            registration_retry_delay: zero,
            signal_query_wait: zero,
            pdp_define_wait: zero,
            attach_wait: zero,
            attach_pause: zero,
            activate_wait: zero,
            activate_pause: zero,
            probe_wait: zero,
            artifact_drain_pause: zero,
            artifact_prompt_budget: zero,
            artifact_ack_budget: zero,
            artifact_poll_slice: zero,
            artifact_write_settle: zero,
            artifact_gap: zero,
            tls_command_wait: zero,
            service_stop_wait: zero,
            service_restart_pause: zero,
            service_start_wait: zero,
            session_release_wait: zero,
            session_acquire_pause: zero,
            session_acquire_wait: zero,
            connect_context_wait: zero,
            connect_sync_window: zero,
            connect_async_budget: zero,
            connect_poll_slice: zero,
            connect_progress_every: zero,
            publish_declare_wait: zero,
            publish_echo_drain: zero,
            publish_commit_wait: zero,
            teardown_disconnect_wait: zero,
            teardown_release_wait: zero,
            teardown_stop_wait: zero,
        }
    }

    /// A zero budget means a single poll; otherwise the slice must fit the budget.
    pub fn validate(&self) -> Result<()> {
        for (name, slice, budget) in [
            (
                "artifact prompt",
                self.artifact_poll_slice,
                self.artifact_prompt_budget,
            ),
            ("artifact ack", self.artifact_poll_slice, self.artifact_ack_budget),
            ("connect", self.connect_poll_slice, self.connect_async_budget),
        ] {
            if slice.is_zero() {
                return Err(anyhow!("{} poll slice must be greater than zero", name));
            }
            if !budget.is_zero() && slice > budget {
                return Err(anyhow!(
                    "{} poll slice ({:?}) exceeds its budget ({:?})",
                    name,
                    slice,
                    budget
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub seed: u64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub ppm: f64,
    /// Probability that a single simulated sensor read fails.
    pub failure_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            seed: 0xF1E1D,
            temperature_c: 22.0,
            humidity_pct: 55.0,
            ppm: 400.0,
            failure_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IndicatorConfig {
    /// sysfs LED brightness file, e.g. `/sys/class/leds/status/brightness`.
    pub led_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}
