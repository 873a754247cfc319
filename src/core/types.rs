use std::collections::BTreeMap;

use serde::Serialize;

/// Oldest age accepted for a person or a planning horizon.
pub const MAX_AGE: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonStatus {
    pub age: u32,
    pub monthly_income: f64,
    pub monthly_expense: f64,
    pub savings: f64,
    pub debt: f64,
}

impl Default for PersonStatus {
    fn default() -> Self {
        Self {
            age: 25,
            monthly_income: 0.0,
            monthly_expense: 0.0,
            savings: 0.0,
            debt: 0.0,
        }
    }
}

/// Raw target weights for one life stage. Normalized at use time, see
/// [`super::allocation::allocation_for_age`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageWeights {
    pub growth: f64,
    pub conservative: f64,
    pub cash: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnRates {
    pub growth: f64,
    pub conservative: f64,
    pub cash: f64,
}

impl Default for ReturnRates {
    fn default() -> Self {
        Self {
            growth: 0.07,
            conservative: 0.03,
            cash: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvestmentPolicy {
    pub young: StageWeights,
    pub middle: StageWeights,
    pub old: StageWeights,
    pub returns: ReturnRates,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub inflation_rate: f64,
}

impl Default for InvestmentPolicy {
    fn default() -> Self {
        Self {
            young: StageWeights::default(),
            middle: StageWeights::default(),
            old: StageWeights::default(),
            returns: ReturnRates::default(),
            retirement_age: 65,
            life_expectancy: 85,
            inflation_rate: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalaryPolicy {
    pub annual_growth_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HousePurchase {
    pub price: f64,
    pub down_payment_fraction: f64,
    pub loan_annual_rate: f64,
    pub loan_term_years: u32,
}

impl Default for HousePurchase {
    fn default() -> Self {
        Self {
            price: 0.0,
            down_payment_fraction: 0.20,
            loan_annual_rate: 0.03,
            loan_term_years: 30,
        }
    }
}

impl HousePurchase {
    pub fn loan_principal(&self) -> f64 {
        self.price * (1.0 - self.down_payment_fraction)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifeEventKind {
    HousePurchase(HousePurchase),
    /// Flat-amount shock drawn by the random event generator.
    RandomShock,
    /// Any other user-labelled milestone.
    Custom(String),
}

impl LifeEventKind {
    pub fn label(&self) -> &str {
        match self {
            LifeEventKind::HousePurchase(_) => "house purchase",
            LifeEventKind::RandomShock => "random_event",
            LifeEventKind::Custom(label) => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifeEvent {
    pub kind: LifeEventKind,
    pub description: Option<String>,
    pub amount: Option<f64>,
}

/// Events keyed by trigger age; events sharing an age keep their stored order.
pub type LifePlan = BTreeMap<u32, Vec<LifeEvent>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationInput {
    pub person: PersonStatus,
    pub investment: InvestmentPolicy,
    pub salary: SalaryPolicy,
    pub life_plan: LifePlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlySnapshot {
    pub age: u32,
    pub month: u8,
    pub net_worth: f64,
    pub debt: f64,
    pub monthly_income: f64,
    pub monthly_expense: f64,
    pub total_expense: f64,
    #[serde(rename = "stock_investment")]
    pub growth: f64,
    #[serde(rename = "bond_investment")]
    pub conservative: f64,
    #[serde(rename = "cash_investment")]
    pub cash: f64,
    #[serde(rename = "real_estate_investment")]
    pub real_estate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearEndSnapshot {
    pub monthly_income: f64,
    pub monthly_expense: f64,
    pub debt: f64,
    #[serde(rename = "stock_investment")]
    pub growth: f64,
    #[serde(rename = "bond_investment")]
    pub conservative: f64,
    #[serde(rename = "cash_investment")]
    pub cash: f64,
    pub net_worth: f64,
    pub yearly_withdrawn: f64,
    pub monthly_house_payment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutput {
    #[serde(rename = "simulation_results")]
    pub yearly: BTreeMap<u32, YearEndSnapshot>,
    #[serde(rename = "financial_results")]
    pub monthly: Vec<MonthlySnapshot>,
    pub event_log: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetirementStatus {
    pub age: u32,
    pub net_worth: f64,
    pub monthly_expense: f64,
    pub annual_expense: f64,
    pub safe_withdrawal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireAssessment {
    pub fire_age_growing: Option<u32>,
    pub fire_age_traditional: Option<u32>,
    pub fire_target_growing: f64,
    pub fire_target_traditional: f64,
    pub retirement_status: Option<RetirementStatus>,
    pub achievements: Vec<String>,
}
