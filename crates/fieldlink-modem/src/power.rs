//! ---
//! fl_section: "04-modem-bringup"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Power sequencing and link handshake."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::fs;
use std::io;
use std::path::PathBuf;

use fieldlink_common::{Clock, PowerConfig, PowerKind, TimingConfig};
use fieldlink_logging::{fl_debug, fl_info, fl_warn, LogContext};
use fieldlink_transport::Transactor;

use crate::is_ok;

/// Control lines wired from the host to the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerLine {
    Enable,
    PowerKey,
    Dtr,
}

impl PowerLine {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerLine::Enable => "enable",
            PowerLine::PowerKey => "pwrkey",
            PowerLine::Dtr => "dtr",
        }
    }
}

pub trait PowerControl: Send {
    fn set_line(&mut self, line: PowerLine, high: bool) -> io::Result<()>;
}

/// For modems powered and keyed externally.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPowerControl;

impl PowerControl for NoPowerControl {
    fn set_line(&mut self, _line: PowerLine, _high: bool) -> io::Result<()> {
        Ok(())
    }
}

/// Lines driven through the sysfs GPIO interface.
#[derive(Debug, Clone)]
pub struct SysfsGpioPower {
    root: PathBuf,
    enable: u32,
    pwrkey: u32,
    dtr: u32,
}

impl SysfsGpioPower {
    pub fn new(config: &PowerConfig) -> Self {
        Self {
            root: config.gpio_root.clone(),
            enable: config.enable_gpio,
            pwrkey: config.pwrkey_gpio,
            dtr: config.dtr_gpio,
        }
    }

    fn pin(&self, line: PowerLine) -> u32 {
        match line {
            PowerLine::Enable => self.enable,
            PowerLine::PowerKey => self.pwrkey,
            PowerLine::Dtr => self.dtr,
        }
    }

    fn ensure_output(&self, pin: u32) -> io::Result<PathBuf> {
        let dir = self.root.join(format!("gpio{pin}"));
        if !dir.exists() {
            fs::write(self.root.join("export"), pin.to_string())?;
        }
        fs::write(dir.join("direction"), "out")?;
        Ok(dir.join("value"))
    }
}

impl PowerControl for SysfsGpioPower {
    fn set_line(&mut self, line: PowerLine, high: bool) -> io::Result<()> {
        let value = self.ensure_output(self.pin(line))?;
        fs::write(value, if high { "1" } else { "0" })
    }
}

pub fn power_control_from_config(config: &PowerConfig) -> Box<dyn PowerControl> {
    match config.kind {
        PowerKind::None => Box::new(NoPowerControl),
        PowerKind::SysfsGpio => Box::new(SysfsGpioPower::new(config)),
    }
}

fn drive(power: &mut dyn PowerControl, line: PowerLine, high: bool) {
    if let Err(err) = power.set_line(line, high) {
        fl_warn!(
            context = LogContext::stage("power"),
            "unable to drive {} {}: {}",
            line.as_str(),
            if high { "high" } else { "low" },
            err
        );
    }
}

/// Enable the supply, pulse the power key, and hold for `power_settle`.
///
/// The modem ignores commands until the settle delay has fully elapsed.
pub fn power_on(power: &mut dyn PowerControl, clock: &dyn Clock, timing: &TimingConfig) {
    let ctx = LogContext::stage("power");
    drive(power, PowerLine::Enable, true);
    drive(power, PowerLine::Dtr, false);
    clock.sleep(timing.power_enable_gap);

    drive(power, PowerLine::PowerKey, true);
    clock.sleep(timing.power_pulse);
    drive(power, PowerLine::PowerKey, false);

    fl_debug!(context = ctx, "power key released, settling for {:?}", timing.power_settle);
    clock.sleep(timing.power_settle);
    fl_info!(context = ctx, "modem powered");
}

/// `AT` then `ATE0`. Returns whether the first one was acknowledged.
pub fn handshake(engine: &mut Transactor, timing: &TimingConfig) -> bool {
    let ctx = LogContext::stage("handshake");
    let alive = is_ok(&engine.transact("AT", timing.handshake_wait, true));
    let echo_off = is_ok(&engine.transact("ATE0", timing.handshake_wait, true));
    if alive {
        fl_info!(context = ctx, "modem answered (echo off confirmed: {})", echo_off);
    } else {
        fl_warn!(context = ctx, "modem did not acknowledge AT, continuing");
    }
    alive
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
        offset: Arc<Mutex<Duration>>,
    }

    impl PowerControl for Recorder {
        fn set_line(&mut self, line: PowerLine, high: bool) -> io::Result<()> {
            let at = *self.offset.lock();
            self.log
                .lock()
                .push(format!("{}ms {}={}", at.as_millis(), line.as_str(), u8::from(high)));
            Ok(())
        }
    }

    struct Ticker {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Clock for Ticker {
        fn now(&self) -> Instant {
            self.origin + *self.offset.lock()
        }

        fn sleep(&self, duration: Duration) {
            *self.offset.lock() += duration;
        }
    }

    #[test]
    fn power_sequence_holds_settle_delay() {
        let mut recorder = Recorder::default();
        let clock = Ticker {
            origin: Instant::now(),
            offset: recorder.offset.clone(),
        };
        let timing = TimingConfig::default();

        power_on(&mut recorder, &clock, &timing);

        assert_eq!(
            *recorder.log.lock(),
            vec!["0ms enable=1", "0ms dtr=0", "100ms pwrkey=1", "1100ms pwrkey=0"]
        );
        assert_eq!(*clock.offset.lock(), Duration::from_millis(6_100));
    }

    #[test]
    fn sysfs_lines_are_exported_and_written() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("gpio4")).unwrap();
        let config = PowerConfig {
            kind: PowerKind::SysfsGpio,
            gpio_root: dir.path().to_path_buf(),
            ..PowerConfig::default()
        };
        let mut power = SysfsGpioPower::new(&config);
        power.set_line(PowerLine::PowerKey, true).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("gpio4/value")).unwrap(), "1");
        assert_eq!(fs::read_to_string(dir.path().join("gpio4/direction")).unwrap(), "out");
    }

    #[test]
    fn line_failures_do_not_abort_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let config = PowerConfig {
            kind: PowerKind::SysfsGpio,
            gpio_root: dir.path().join("absent"),
            ..PowerConfig::default()
        };
        let mut power = power_control_from_config(&config);
        let clock = Ticker {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        };
        power_on(power.as_mut(), &clock, &TimingConfig::default());
        assert_eq!(*clock.offset.lock(), Duration::from_millis(6_100));
    }
}
