use sysinfo::System;
use tracing::{debug, warn};

/// Device thermal pressure tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThermalTier {
    Nominal,
    Fair,
    Serious,
    Critical,
}

/// Physical memory below which vision work is never attempted.
pub const MIN_VISION_MEMORY_BYTES: u64 = 1_000_000_000;

/// Current device conditions relevant to the bypass decision.
///
/// Implemented by the host probe in production and by fixed stubs in tests.
pub trait SystemConditionsProvider: Send + Sync {
    fn thermal_tier(&self) -> ThermalTier;
    /// Total physical memory in bytes
    fn physical_memory(&self) -> u64;
    fn low_power_mode(&self) -> bool;
}

/// Whether to skip the vision subsystem entirely and go straight to
/// pixel-statistics captioning.
///
/// Bypass protects against thermal damage and out-of-memory risk only.
/// Low-power mode alone does not bypass: captioning is still attempted under
/// power constraints.
pub fn should_bypass_vision(
    conditions: &dyn SystemConditionsProvider,
    min_memory_bytes: u64,
) -> bool {
    let thermal = conditions.thermal_tier();
    if thermal == ThermalTier::Critical {
        warn!("Bypassing vision analysis: thermal state critical");
        return true;
    }

    let memory = conditions.physical_memory();
    if memory < min_memory_bytes {
        warn!(
            "Bypassing vision analysis: {} bytes physical memory below {} floor",
            memory, min_memory_bytes
        );
        return true;
    }

    if conditions.low_power_mode() {
        debug!("Low-power mode active, still attempting vision analysis");
    }
    false
}

/// Conditions probe backed by the host OS.
///
/// Thermal tiers are not portably readable, so the host probe reports
/// nominal; platform integrations override this through the trait.
pub struct HostConditions {
    physical_memory: u64,
}

impl HostConditions {
    pub fn probe() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            physical_memory: system.total_memory(),
        }
    }
}

impl SystemConditionsProvider for HostConditions {
    fn thermal_tier(&self) -> ThermalTier {
        ThermalTier::Nominal
    }

    fn physical_memory(&self) -> u64 {
        self.physical_memory
    }

    fn low_power_mode(&self) -> bool {
        false
    }
}

/// Fixed conditions for tests and dry runs.
#[derive(Debug, Clone)]
pub struct FixedConditions {
    pub thermal: ThermalTier,
    pub memory: u64,
    pub low_power: bool,
}

impl Default for FixedConditions {
    fn default() -> Self {
        Self {
            thermal: ThermalTier::Nominal,
            memory: 4_000_000_000,
            low_power: false,
        }
    }
}

impl SystemConditionsProvider for FixedConditions {
    fn thermal_tier(&self) -> ThermalTier {
        self.thermal
    }

    fn physical_memory(&self) -> u64 {
        self.memory
    }

    fn low_power_mode(&self) -> bool {
        self.low_power
    }
}
