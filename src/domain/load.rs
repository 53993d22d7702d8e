use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::ElectroDevice;

/// Design coefficient applied to the group's average active load (kP)
pub const DEFAULT_ACTIVE_POWER_COEFFICIENT: f64 = 1.25;
/// Design coefficient applied to the group's average reactive load
pub const DEFAULT_REACTIVE_POWER_COEFFICIENT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("cannot calculate the load of an empty device group")]
    EmptyGroup,
}

/// Sums the load model is built on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadTotals {
    /// Σ n·Pn·Kv
    pub weighted_power: f64,
    /// Σ n·Pn
    pub installed_power: f64,
    /// Σ n·Pn²
    pub squared_power: f64,
    /// Σ n·Pn·Kv·tgφ
    pub reactive_power: f64,
}

impl LoadTotals {
    pub fn from_devices(devices: &[ElectroDevice]) -> Self {
        devices.iter().fold(Self::default(), |acc, d| {
            let installed = d.installed_power() as f64;
            let power = f64::from(d.power);
            Self {
                weighted_power: acc.weighted_power + installed * d.utilization_factor,
                installed_power: acc.installed_power + installed,
                squared_power: acc.squared_power + f64::from(d.devices_count) * power * power,
                reactive_power: acc.reactive_power
                    + installed * d.utilization_factor * d.reactive_power_factor,
            }
        })
    }
}

/// One decomposition of a load group into design quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    /// Group utilization rate Kv = Σ n·Pn·Kv / Σ n·Pn
    pub utilization_rate: f64,
    /// Effective device count ne = (Σ n·Pn)² / Σ n·Pn²
    pub effective_device_count: f64,
    /// kP
    pub active_power_coefficient: f64,
    pub active_load: f64,
    pub reactive_load: f64,
    pub full_power: f64,
    pub estimated_current: f64,
}

impl LoadSummary {
    pub fn decompose(
        totals: &LoadTotals,
        active_power_coefficient: f64,
        reactive_power_coefficient: f64,
        voltage: f64,
    ) -> Self {
        let active_load = active_power_coefficient * totals.weighted_power;
        let reactive_load = reactive_power_coefficient * totals.reactive_power;
        Self {
            utilization_rate: totals.weighted_power / totals.installed_power,
            effective_device_count: totals.installed_power.powi(2) / totals.squared_power,
            active_power_coefficient,
            active_load,
            reactive_load,
            full_power: active_load.hypot(reactive_load),
            estimated_current: active_load / voltage,
        }
    }
}

/// Reference totals of the workshop power buses.
///
/// The same coefficient scales both the active and the reactive load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopReference {
    pub weighted_power: f64,
    pub installed_power: f64,
    pub squared_power: f64,
    pub reactive_power: f64,
    pub power_coefficient: f64,
}

impl Default for WorkshopReference {
    fn default() -> Self {
        Self {
            weighted_power: 752.0,
            installed_power: 2330.0,
            squared_power: 96388.0,
            reactive_power: 657.0,
            power_coefficient: 0.7,
        }
    }
}

impl WorkshopReference {
    pub fn totals(&self) -> LoadTotals {
        LoadTotals {
            weighted_power: self.weighted_power,
            installed_power: self.installed_power,
            squared_power: self.squared_power,
            reactive_power: self.reactive_power,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    /// Input devices with their derived fields populated
    pub devices: Vec<ElectroDevice>,
    pub group: LoadSummary,
    pub workshop: LoadSummary,
}

/// Load calculator for a group of electrical receivers.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCalculator {
    pub active_power_coefficient: f64,
    pub reactive_power_coefficient: f64,
    pub workshop: WorkshopReference,
}

impl Default for LoadCalculator {
    fn default() -> Self {
        Self {
            active_power_coefficient: DEFAULT_ACTIVE_POWER_COEFFICIENT,
            reactive_power_coefficient: DEFAULT_REACTIVE_POWER_COEFFICIENT,
            workshop: WorkshopReference::default(),
        }
    }
}

impl LoadCalculator {
    /// Derive per-device currents and the group/workshop load summaries.
    ///
    /// Estimated currents of both summaries are taken at the voltage of the
    /// first device in `devices`.
    pub fn calculate(&self, devices: &[ElectroDevice]) -> Result<CalculationResult, LoadError> {
        let voltage = devices.first().ok_or(LoadError::EmptyGroup)?.voltage;

        let devices: Vec<ElectroDevice> = devices
            .iter()
            .cloned()
            .map(ElectroDevice::with_derived)
            .collect();

        let totals = LoadTotals::from_devices(&devices);
        let group = LoadSummary::decompose(
            &totals,
            self.active_power_coefficient,
            self.reactive_power_coefficient,
            voltage,
        );
        let workshop = LoadSummary::decompose(
            &self.workshop.totals(),
            self.workshop.power_coefficient,
            self.workshop.power_coefficient,
            voltage,
        );

        debug!(
            devices = devices.len(),
            active_load = group.active_load,
            reactive_load = group.reactive_load,
            full_power = group.full_power,
            "load calculated"
        );

        Ok(CalculationResult {
            devices,
            group,
            workshop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const EPS: f64 = 1e-9;

    fn calculate(devices: &[ElectroDevice]) -> Result<CalculationResult, LoadError> {
        LoadCalculator::default().calculate(devices)
    }

    fn motor() -> ElectroDevice {
        ElectroDevice::new("Motor", 0.9, 0.8, 380.0, 2, 1000, 0.6, 0.75)
    }

    fn pump() -> ElectroDevice {
        ElectroDevice::new("Pump", 0.92, 0.85, 380.0, 3, 500, 0.7, 0.6)
    }

    #[test]
    fn test_single_device_derived_fields() {
        let result = calculate(&[motor()]).unwrap();
        let device = &result.devices[0];
        assert_eq!(device.multiplication, 2000);
        // 2000 / (sqrt(3) * 380 * 0.8 * 0.9)
        assert!((device.calculated_current - 4.220_396_7).abs() < 1e-6);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let devices = vec![motor()];
        let _ = calculate(&devices).unwrap();
        assert_eq!(devices[0].multiplication, 0);
    }

    #[rstest]
    #[case(0.6, 2)]
    #[case(0.15, 7)]
    #[case(1.0, 1)]
    fn test_single_device_group_reduces_to_device(#[case] kv: f64, #[case] count: u32) {
        let mut device = motor();
        device.utilization_factor = kv;
        device.devices_count = count;

        let group = calculate(&[device]).unwrap().group;
        assert!((group.utilization_rate - kv).abs() < EPS);
        assert!((group.effective_device_count - f64::from(count)).abs() < EPS);
    }

    #[test]
    fn test_active_load_scales_summed_weighted_power() {
        // 2000 * 0.6 + 1500 * 0.7 = 2250
        let group = calculate(&[motor(), pump()]).unwrap().group;
        assert!((group.active_power_coefficient - 1.25).abs() < EPS);
        assert!((group.active_load - 1.25 * 2250.0).abs() < EPS);
        // 2000 * 0.6 * 0.75 + 1500 * 0.7 * 0.6 = 1530
        assert!((group.reactive_load - 1530.0).abs() < EPS);
        assert!((group.full_power - group.active_load.hypot(1530.0)).abs() < EPS);
    }

    #[test]
    fn test_two_device_group_rates() {
        let group = calculate(&[motor(), pump()]).unwrap().group;
        assert!((group.utilization_rate - 2250.0 / 3500.0).abs() < EPS);
        // 3500² / (2 * 1000² + 3 * 500²)
        assert!((group.effective_device_count - 3500.0_f64.powi(2) / 2_750_000.0).abs() < EPS);
    }

    #[test]
    fn test_estimated_current_uses_first_device_voltage() {
        let mut low = pump();
        low.voltage = 220.0;
        let group = calculate(&[motor(), low]).unwrap().group;
        assert!((group.estimated_current - group.active_load / 380.0).abs() < EPS);
    }

    #[test]
    fn test_workshop_reference_values() {
        let workshop = calculate(&[motor()]).unwrap().workshop;
        assert!((workshop.utilization_rate - 752.0 / 2330.0).abs() < EPS);
        assert!((workshop.effective_device_count - 56.323_401_253).abs() < 1e-6);
        assert!((workshop.active_load - 526.4).abs() < EPS);
        assert!((workshop.reactive_load - 459.9).abs() < EPS);
        assert!((workshop.full_power - 699.002_839_765).abs() < 1e-6);
        assert!((workshop.estimated_current - 526.4 / 380.0).abs() < EPS);
    }

    #[test]
    fn test_workshop_ignores_device_list_except_voltage() {
        let one = calculate(&[motor()]).unwrap().workshop;
        let many = calculate(&[motor(), pump(), pump()]).unwrap().workshop;
        assert_eq!(one, many);

        let mut other_voltage = motor();
        other_voltage.voltage = 660.0;
        let shifted = calculate(&[other_voltage]).unwrap().workshop;
        assert_eq!(shifted.full_power, one.full_power);
        assert_ne!(shifted.estimated_current, one.estimated_current);
    }

    #[test]
    fn test_empty_group_is_an_error() {
        assert_eq!(calculate(&[]), Err(LoadError::EmptyGroup));
    }

    #[test]
    fn test_custom_coefficients() {
        let calculator = LoadCalculator {
            active_power_coefficient: 1.0,
            reactive_power_coefficient: 1.1,
            ..Default::default()
        };
        let group = calculator.calculate(&[motor()]).unwrap().group;
        assert!((group.active_load - 1200.0).abs() < EPS);
        assert!((group.reactive_load - 1.1 * 900.0).abs() < EPS);
    }

    fn device_strategy() -> impl Strategy<Value = ElectroDevice> {
        (
            1u32..10_000,
            1u32..50,
            0.0f64..=1.0,
            0.0f64..3.0,
            100.0f64..1000.0,
        )
            .prop_map(|(power, count, kv, tg, voltage)| {
                ElectroDevice::new("gen", 0.9, 0.85, voltage, count, power, kv, tg)
            })
    }

    proptest! {
        #[test]
        fn full_power_bounds_active_and_reactive(
            devices in prop::collection::vec(device_strategy(), 1..8)
        ) {
            let group = calculate(&devices).unwrap().group;
            let bound = group.active_load.max(group.reactive_load);
            prop_assert!(group.full_power + EPS * bound.max(1.0) >= bound);
        }

        #[test]
        fn utilization_rate_stays_within_unit_interval(
            devices in prop::collection::vec(device_strategy(), 1..8)
        ) {
            let group = calculate(&devices).unwrap().group;
            prop_assert!(group.utilization_rate >= -EPS);
            prop_assert!(group.utilization_rate <= 1.0 + EPS);
        }
    }
}
