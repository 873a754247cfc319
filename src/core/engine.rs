use std::collections::BTreeMap;

use super::allocation::{AllocationWeights, allocation_for_age};
use super::error::FireError;
use super::format::{format_amount, format_percent};
use super::mortgage::{Mortgage, service_month};
use super::types::{
    LifeEvent, LifeEventKind, MAX_AGE, MonthlySnapshot, PersonStatus, ReturnRates,
    SimulationInput, SimulationOutput, YearEndSnapshot,
};

pub const MONTHS_PER_YEAR: u8 = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Balances {
    pub growth: f64,
    pub conservative: f64,
    pub cash: f64,
}

impl Balances {
    pub fn total(self) -> f64 {
        self.growth + self.conservative + self.cash
    }

    fn compound(self, returns: &ReturnRates) -> Self {
        Self {
            growth: (self.growth * (1.0 + returns.growth / 12.0)).max(0.0),
            conservative: (self.conservative * (1.0 + returns.conservative / 12.0)).max(0.0),
            cash: (self.cash * (1.0 + returns.cash / 12.0)).max(0.0),
        }
    }

    fn compound_and_invest(
        self,
        returns: &ReturnRates,
        weights: AllocationWeights,
        cashflow: f64,
    ) -> Self {
        Self {
            growth: (self.growth * (1.0 + returns.growth / 12.0) + cashflow * weights.growth)
                .max(0.0),
            conservative: (self.conservative * (1.0 + returns.conservative / 12.0)
                + cashflow * weights.conservative)
                .max(0.0),
            cash: (self.cash * (1.0 + returns.cash / 12.0) + cashflow * weights.cash).max(0.0),
        }
    }
}

/// Liquidates `amount` in the order cash, conservative, growth. A shortfall
/// beyond all three balances floors growth at zero.
pub fn withdraw(balances: Balances, amount: f64) -> Balances {
    let amount = amount.max(0.0);
    if balances.cash >= amount {
        return Balances {
            cash: balances.cash - amount,
            ..balances
        };
    }

    let remaining = amount - balances.cash;
    if balances.conservative >= remaining {
        return Balances {
            cash: 0.0,
            conservative: balances.conservative - remaining,
            ..balances
        };
    }

    let remaining = remaining - balances.conservative;
    Balances {
        growth: (balances.growth - remaining).max(0.0),
        conservative: 0.0,
        cash: 0.0,
    }
}

/// Everything the month-stepping loop carries from one month to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationState {
    pub age: u32,
    pub monthly_income: f64,
    pub monthly_expense: f64,
    pub debt: f64,
    pub house_payment: f64,
    pub balances: Balances,
}

impl SimulationState {
    /// Opening state: investment balances start empty, savings is not invested.
    pub fn opening(person: &PersonStatus) -> Self {
        Self {
            age: person.age,
            monthly_income: person.monthly_income,
            monthly_expense: person.monthly_expense,
            debt: person.debt.max(0.0),
            house_payment: 0.0,
            balances: Balances::default(),
        }
    }

    fn total_outflow(&self) -> f64 {
        self.monthly_expense + self.house_payment
    }

    fn snapshot(&self, month: u8) -> MonthlySnapshot {
        MonthlySnapshot {
            age: self.age,
            month,
            net_worth: self.balances.total(),
            debt: self.debt,
            monthly_income: self.monthly_income,
            monthly_expense: self.monthly_expense,
            total_expense: self.total_outflow(),
            growth: self.balances.growth,
            conservative: self.balances.conservative,
            cash: self.balances.cash,
            real_estate: 0.0,
        }
    }

    fn year_end(&self, yearly_withdrawn: f64) -> YearEndSnapshot {
        YearEndSnapshot {
            monthly_income: self.monthly_income,
            monthly_expense: self.monthly_expense,
            debt: self.debt,
            growth: self.balances.growth,
            conservative: self.balances.conservative,
            cash: self.balances.cash,
            net_worth: self.balances.total(),
            yearly_withdrawn,
            monthly_house_payment: self.house_payment,
        }
    }
}

pub fn accumulation_month(
    state: SimulationState,
    returns: &ReturnRates,
    weights: AllocationWeights,
    month: u8,
) -> (SimulationState, MonthlySnapshot) {
    let cashflow = (state.monthly_income - state.house_payment) - state.monthly_expense;
    let mut next = SimulationState {
        balances: state.balances.compound_and_invest(returns, weights, cashflow),
        ..state
    };
    if next.debt > 0.0 && next.house_payment > 0.0 {
        next.debt = service_month(next.debt, next.house_payment);
        if next.debt <= 0.0 {
            log::info!("age {}: mortgage balance fully repaid", next.age);
        }
    }
    let snapshot = next.snapshot(month);
    (next, snapshot)
}

pub fn retirement_month(
    state: SimulationState,
    returns: &ReturnRates,
    month: u8,
) -> (SimulationState, MonthlySnapshot) {
    let outflow = state.total_outflow();
    let balances = withdraw(state.balances.compound(returns), outflow);
    let debt = if state.house_payment > 0.0 {
        service_month(state.debt, state.house_payment)
    } else {
        state.debt
    };
    let next = SimulationState {
        monthly_income: 0.0,
        debt,
        balances,
        ..state
    };
    let snapshot = next.snapshot(month);
    (next, snapshot)
}

/// Applies the life events scheduled for the state's current age, in stored order.
pub fn apply_life_events(
    mut state: SimulationState,
    events: &[LifeEvent],
    event_log: &mut Vec<String>,
) -> SimulationState {
    for event in events {
        match &event.kind {
            LifeEventKind::HousePurchase(purchase) => {
                let mortgage = Mortgage::originate(purchase);
                state.debt = mortgage.principal;
                state.house_payment = mortgage.monthly_payment;
                log::info!(
                    "age {}: mortgage originated, principal {:.2}, rate {}, term {} years, payment {:.2}",
                    state.age,
                    mortgage.principal,
                    purchase.loan_annual_rate,
                    purchase.loan_term_years,
                    mortgage.monthly_payment
                );
                event_log.push(format!(
                    "age {}: house purchase, price {}, loan {}, monthly payment {}",
                    state.age,
                    format_amount(purchase.price),
                    format_amount(mortgage.principal),
                    format_amount(mortgage.monthly_payment)
                ));
            }
            LifeEventKind::RandomShock | LifeEventKind::Custom(_) => {
                if let Some(amount) = event.amount {
                    event_log.push(format!(
                        "age {}: {} ({}) noted, amount not applied to balances",
                        state.age,
                        event.description.as_deref().unwrap_or(event.kind.label()),
                        format_amount(amount)
                    ));
                }
            }
        }
    }
    state
}

/// Runs both phases and returns the dense monthly series, the year-end map
/// and the narrative log. Never fails; see [`simulate`] for the checked variant.
pub fn project(input: &SimulationInput) -> SimulationOutput {
    let policy = &input.investment;
    let returns = &policy.returns;
    let start_age = input.person.age;

    let mut event_log = vec![
        "simulation started".to_string(),
        format!(
            "age {} -> retirement {} -> life expectancy {}, inflation {}",
            start_age,
            policy.retirement_age,
            policy.life_expectancy,
            format_percent(policy.inflation_rate)
        ),
    ];
    let accumulation_years = policy.retirement_age.saturating_sub(start_age);
    let retirement_start = start_age.max(policy.retirement_age);
    let retirement_years = policy.life_expectancy.saturating_sub(retirement_start);
    if accumulation_years == 0 {
        log::warn!(
            "retirement age {} is not after current age {}; skipping accumulation",
            policy.retirement_age,
            start_age
        );
    }
    if retirement_years == 0 {
        log::warn!(
            "life expectancy {} is not after retirement start {}; skipping retirement phase",
            policy.life_expectancy,
            retirement_start
        );
    }

    let mut monthly = Vec::new();
    let mut yearly = BTreeMap::new();
    let mut state = SimulationState::opening(&input.person);

    for _ in 0..accumulation_years {
        if let Some(events) = input.life_plan.get(&state.age) {
            state = apply_life_events(state, events, &mut event_log);
        }
        let weights = allocation_for_age(state.age, policy);

        for month in 1..=MONTHS_PER_YEAR {
            let (next, snapshot) = accumulation_month(state, returns, weights, month);
            state = next;
            monthly.push(snapshot);
        }

        yearly.insert(state.age, state.year_end(0.0));
        log::debug!(
            "age {}: net worth {:.2}, debt {:.2}",
            state.age,
            state.balances.total(),
            state.debt
        );

        state.age += 1;
        state.monthly_expense *= 1.0 + policy.inflation_rate;
        state.monthly_income *= 1.0 + input.salary.annual_growth_rate;
    }

    state.monthly_income = 0.0;
    for _ in 0..retirement_years {
        let outflow = state.total_outflow();
        for month in 1..=MONTHS_PER_YEAR {
            let (next, snapshot) = retirement_month(state, returns, month);
            state = next;
            monthly.push(snapshot);
        }

        yearly.insert(state.age, state.year_end(outflow * 12.0));
        log::debug!(
            "age {}: net worth {:.2}, debt {:.2}, withdrawn {:.2}",
            state.age,
            state.balances.total(),
            state.debt,
            outflow * 12.0
        );

        state.age += 1;
        state.monthly_expense *= 1.0 + policy.inflation_rate;
        if state.debt <= 0.0 && state.house_payment > 0.0 {
            log::info!("age {}: mortgage paid off, house payment stopped", state.age);
            state.house_payment = 0.0;
        }
    }

    event_log.push("simulation finished".to_string());

    SimulationOutput {
        yearly,
        monthly,
        event_log,
    }
}

/// Checked projection: the full result, or an error if a horizon age is past
/// [`MAX_AGE`] or any emitted figure is not finite. Partial results are never
/// returned.
pub fn simulate(input: &SimulationInput) -> Result<SimulationOutput, FireError> {
    let ages = [
        ("age", input.person.age),
        ("retirement age", input.investment.retirement_age),
        ("life expectancy", input.investment.life_expectancy),
    ];
    if let Some((label, age)) = ages.iter().find(|(_, age)| *age > MAX_AGE) {
        return Err(FireError::InvalidRequest(format!(
            "{label} {age} exceeds the maximum of {MAX_AGE}"
        )));
    }

    let output = project(input);
    for snapshot in &output.monthly {
        let fields = [
            ("net worth", snapshot.net_worth),
            ("debt", snapshot.debt),
            ("monthly income", snapshot.monthly_income),
            ("monthly expense", snapshot.monthly_expense),
            ("total expense", snapshot.total_expense),
            ("growth balance", snapshot.growth),
            ("conservative balance", snapshot.conservative),
            ("cash balance", snapshot.cash),
        ];
        if let Some((label, value)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(FireError::ComputationFailed(format!(
                "{label} became {value} at age {} month {}",
                snapshot.age, snapshot.month
            )));
        }
    }
    Ok(output)
}
