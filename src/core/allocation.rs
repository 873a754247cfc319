use super::types::{InvestmentPolicy, StageWeights};

pub const YOUNG_STAGE_MAX_AGE: u32 = 40;
pub const MIDDLE_STAGE_MAX_AGE: u32 = 55;

/// Normalized weights, non-negative and summing to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationWeights {
    pub growth: f64,
    pub conservative: f64,
    pub cash: f64,
}

impl AllocationWeights {
    pub const ALL_CASH: Self = Self {
        growth: 0.0,
        conservative: 0.0,
        cash: 1.0,
    };
}

pub fn stage_weights(age: u32, policy: &InvestmentPolicy) -> StageWeights {
    if age <= YOUNG_STAGE_MAX_AGE {
        policy.young
    } else if age <= MIDDLE_STAGE_MAX_AGE {
        policy.middle
    } else {
        policy.old
    }
}

pub fn allocation_for_age(age: u32, policy: &InvestmentPolicy) -> AllocationWeights {
    normalize(stage_weights(age, policy))
}

/// Falls back to all cash when the raw weights carry no positive mass.
pub fn normalize(raw: StageWeights) -> AllocationWeights {
    let growth = sanitize(raw.growth);
    let conservative = sanitize(raw.conservative);
    let cash = sanitize(raw.cash);
    let total = growth + conservative + cash;
    if total <= 0.0 || !total.is_finite() {
        return AllocationWeights::ALL_CASH;
    }

    AllocationWeights {
        growth: growth / total,
        conservative: conservative / total,
        cash: cash / total,
    }
}

fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() { weight.max(0.0) } else { 0.0 }
}
