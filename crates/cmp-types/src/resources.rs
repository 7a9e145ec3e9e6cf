//! CPU/memory amounts used for quota accounting

use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

/// An amount of CPU (cores) and memory (GB).
///
/// Used both for requests and for signed usage deltas; a release is a
/// negated amount.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub cpu: f64,
    pub memory: f64,
}

impl ResourceAmount {
    pub const ZERO: ResourceAmount = ResourceAmount {
        cpu: 0.0,
        memory: 0.0,
    };

    pub fn new(cpu: f64, memory: f64) -> Self {
        Self { cpu, memory }
    }

    /// The amount multiplied by an instance count
    pub fn times(self, count: u32) -> Self {
        Self {
            cpu: self.cpu * f64::from(count),
            memory: self.memory * f64::from(count),
        }
    }

    /// True iff both dimensions are at most those of `limit`
    pub fn fits_within(&self, limit: &ResourceAmount) -> bool {
        self.cpu <= limit.cpu && self.memory <= limit.memory
    }

    pub fn is_non_negative(&self) -> bool {
        self.cpu >= 0.0 && self.memory >= 0.0
    }
}

impl Add for ResourceAmount {
    type Output = ResourceAmount;

    fn add(self, rhs: ResourceAmount) -> ResourceAmount {
        ResourceAmount::new(self.cpu + rhs.cpu, self.memory + rhs.memory)
    }
}

impl Sub for ResourceAmount {
    type Output = ResourceAmount;

    fn sub(self, rhs: ResourceAmount) -> ResourceAmount {
        ResourceAmount::new(self.cpu - rhs.cpu, self.memory - rhs.memory)
    }
}

impl Neg for ResourceAmount {
    type Output = ResourceAmount;

    fn neg(self) -> ResourceAmount {
        ResourceAmount::new(-self.cpu, -self.memory)
    }
}

impl std::fmt::Display for ResourceAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} CPU, {}GB memory", self.cpu, self.memory)
    }
}
