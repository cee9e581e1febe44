//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Shared primitives and utilities for the gateway runtime."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! Core shared primitives for the FieldLink gateway workspace.
//! This crate exposes configuration loading, logging setup, the clock
//! abstraction, collaborator traits, and version metadata.

pub mod config;
pub mod device;
pub mod indicator;
pub mod logging;
pub mod telemetry;
pub mod time;
pub mod version;

pub use config::{
    AppConfig, BrokerConfig, DeviceConfig, DisplayConfig, HardwareIdFormat, IndicatorConfig,
    LoadedAppConfig, LoggingConfig, MetricsConfig, ModemConfig, NetworkConfig, PowerConfig,
    PowerKind, ScheduleConfig, TelemetryConfig, TimingConfig, TlsConfig,
};
pub use device::DeviceIdentity;
pub use indicator::{
    BlinkPattern, Feedback, Indicator, LogDisplay, NoDisplay, NoIndicator, SharedDisplay,
    SharedIndicator, StatusDisplay, SysfsLed,
};
pub use logging::{init_tracing, LogFormat};
pub use telemetry::{SensorReading, TelemetryRecord, TelemetrySource, TelemetryValue};
pub use time::{Clock, SharedClock, SystemClock};
pub use version::VersionInfo;
