mod allocation;
mod engine;
mod error;
mod evaluator;
mod format;
mod mortgage;
pub mod random_events;
mod targets;
mod types;

pub use allocation::{AllocationWeights, allocation_for_age, normalize};
pub use engine::{
    Balances, SimulationState, accumulation_month, apply_life_events, project, retirement_month,
    simulate, withdraw,
};
pub use error::FireError;
pub use evaluator::evaluate_fire;
pub use format::format_amount;
pub use mortgage::{Mortgage, monthly_payment, service_month};
pub use targets::{
    growing_annuity_present_value, projected_annual_expense, retirement_target_growing_annuity,
    retirement_target_traditional_25x, traditional_target,
};
pub use types::{
    FireAssessment, HousePurchase, InvestmentPolicy, LifeEvent, LifeEventKind, LifePlan,
    MAX_AGE, MonthlySnapshot, PersonStatus, RetirementStatus, ReturnRates, SalaryPolicy, SimulationInput,
    SimulationOutput, StageWeights, YearEndSnapshot,
};
