use std::fmt;
use std::str::FromStr;

/// Which adapter class to ask wgpu for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Integrated GPU where available; a background effect rarely needs more.
    #[default]
    Low,
    High,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

impl fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuPowerPreference::Low => f.write_str("low"),
            GpuPowerPreference::High => f.write_str("high"),
        }
    }
}

impl FromStr for GpuPowerPreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "low-power" => Ok(GpuPowerPreference::Low),
            "high" | "high-performance" => Ok(GpuPowerPreference::High),
            other => Err(format!("unknown GPU power preference '{other}' (expected low or high)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("LOW".parse::<GpuPowerPreference>(), Ok(GpuPowerPreference::Low));
        assert_eq!(
            "high-performance".parse::<GpuPowerPreference>(),
            Ok(GpuPowerPreference::High)
        );
        assert!("medium".parse::<GpuPowerPreference>().is_err());
    }
}
