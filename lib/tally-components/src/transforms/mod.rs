//! Transform implementations.

mod vcenter_multiplier;
pub use self::vcenter_multiplier::{
    scale, to_float, FactorTable, RunningAverages, VCenterMultiplier, VCenterMultiplierConfiguration, CAPACITY_FIELD,
    SAMPLE_CONFIGURATION, UTILIZATION_FIELD,
};
