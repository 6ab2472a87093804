//! Settings module
//!
//! Runtime settings assembled from the command line. Nothing is read from or
//! written to disk.

use std::time::Duration;

use bitflags::bitflags;

use super::filter::FilterSpec;

/// Interval between background re-enumerations
pub const DATA_REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Default paints per second
pub const DEFAULT_PAINT_RATE: u32 = 10;

/// Upper bound for paints per second
pub const MAX_PAINT_RATE: u32 = 60;

bitflags! {
    /// Socket tables to scan
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScanFlags: u32 {
        const TCP  = 0x01;
        const TCP6 = 0x02;
        const UDP  = 0x04;
        const UDP6 = 0x08;
    }
}

impl ScanFlags {
    /// TCP listeners over IPv4 and IPv6
    pub fn tcp() -> Self {
        ScanFlags::TCP | ScanFlags::TCP6
    }

    /// Everything we know how to scan
    pub fn tcp_and_udp() -> Self {
        ScanFlags::all()
    }
}

impl Default for ScanFlags {
    fn default() -> Self {
        ScanFlags::tcp()
    }
}

/// Color scheme options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    #[default]
    Default,
    Monochrome,
}

/// Session settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub filters: FilterSpec,
    /// Start with full command lines shown
    pub show_details: bool,
    /// Paints per second
    pub paint_rate: u32,
    pub refresh_interval: Duration,
    pub scan_flags: ScanFlags,
    pub color_scheme: ColorScheme,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            filters: FilterSpec::default(),
            show_details: false,
            paint_rate: DEFAULT_PAINT_RATE,
            refresh_interval: DATA_REFRESH_INTERVAL,
            scan_flags: ScanFlags::default(),
            color_scheme: ColorScheme::default(),
        }
    }
}

impl Settings {
    /// Set the paint rate, clamped to `1..=MAX_PAINT_RATE`
    pub fn set_paint_rate(&mut self, rate: u32) {
        self.paint_rate = rate.clamp(1, MAX_PAINT_RATE);
    }

    /// Time between paints
    pub fn paint_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.paint_rate.max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.refresh_interval, Duration::from_secs(2));
        assert_eq!(settings.paint_interval(), Duration::from_millis(100));
        assert_eq!(settings.scan_flags, ScanFlags::TCP | ScanFlags::TCP6);
        assert!(!settings.filters.is_active());
    }

    #[test]
    fn test_paint_rate_clamped() {
        let mut settings = Settings::default();
        settings.set_paint_rate(0);
        assert_eq!(settings.paint_rate, 1);
        assert_eq!(settings.paint_interval(), Duration::from_secs(1));

        settings.set_paint_rate(1000);
        assert_eq!(settings.paint_rate, MAX_PAINT_RATE);
    }

    #[test]
    fn test_scan_flags() {
        assert!(ScanFlags::tcp_and_udp().contains(ScanFlags::UDP6));
        assert!(!ScanFlags::tcp().intersects(ScanFlags::UDP | ScanFlags::UDP6));
    }
}
