//! Wire format of the configuration bundle. Every field is optional and
//! leniently typed; defaults are applied here, once, so the engine only ever
//! sees a complete [`SimulationInput`].

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};

use crate::core::{
    FireError, HousePurchase, InvestmentPolicy, LifeEvent, LifeEventKind, LifePlan, MAX_AGE,
    PersonStatus, ReturnRates, SalaryPolicy, SimulationInput, StageWeights,
};

const HOUSE_PURCHASE_LABELS: [&str; 3] = ["house purchase", "house_purchase", "買房"];
const RANDOM_EVENT_LABEL: &str = "random_event";

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n.trunc() as u32))
}

/// Like `lenient_u32`, with ages past [`MAX_AGE`] clamped to it.
fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_u32(deserializer)?.map(|age| {
        if age > MAX_AGE {
            log::warn!("clamping age {age} to {MAX_AGE}");
            MAX_AGE
        } else {
            age
        }
    }))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlayerStatusPayload {
    #[serde(deserialize_with = "lenient_age", alias = "current_age")]
    pub age: Option<u32>,
    #[serde(deserialize_with = "lenient_f64")]
    pub monthly_income: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub monthly_expense: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub savings: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub debt: Option<f64>,
}

impl PlayerStatusPayload {
    pub fn into_person(self) -> PersonStatus {
        let defaults = PersonStatus::default();
        PersonStatus {
            age: self.age.unwrap_or(defaults.age),
            monthly_income: self.monthly_income.unwrap_or(defaults.monthly_income),
            monthly_expense: self.monthly_expense.unwrap_or(defaults.monthly_expense),
            savings: self.savings.unwrap_or(defaults.savings),
            debt: self.debt.unwrap_or(defaults.debt),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InvestmentConfigPayload {
    #[serde(deserialize_with = "lenient_age")]
    pub retirement_age: Option<u32>,
    #[serde(deserialize_with = "lenient_age")]
    pub life_expectancy: Option<u32>,
    #[serde(deserialize_with = "lenient_f64")]
    pub inflation_rate: Option<f64>,

    #[serde(deserialize_with = "lenient_f64")]
    pub young_growth_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub young_conservative_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub young_cash_reserve_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub middle_growth_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub middle_conservative_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub middle_cash_reserve_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub old_growth_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub old_conservative_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub old_cash_reserve_ratio: Option<f64>,

    #[serde(deserialize_with = "lenient_f64")]
    pub growth_return_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub conservative_return_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "cash_return_rate")]
    pub cash_return: Option<f64>,
}

impl InvestmentConfigPayload {
    pub fn into_policy(self) -> InvestmentPolicy {
        let defaults = InvestmentPolicy::default();
        let stage = |growth: Option<f64>, conservative: Option<f64>, cash: Option<f64>| {
            StageWeights {
                growth: growth.unwrap_or(0.0),
                conservative: conservative.unwrap_or(0.0),
                cash: cash.unwrap_or(0.0),
            }
        };

        InvestmentPolicy {
            young: stage(
                self.young_growth_ratio,
                self.young_conservative_ratio,
                self.young_cash_reserve_ratio,
            ),
            middle: stage(
                self.middle_growth_ratio,
                self.middle_conservative_ratio,
                self.middle_cash_reserve_ratio,
            ),
            old: stage(
                self.old_growth_ratio,
                self.old_conservative_ratio,
                self.old_cash_reserve_ratio,
            ),
            returns: ReturnRates {
                growth: self.growth_return_rate.unwrap_or(defaults.returns.growth),
                conservative: self
                    .conservative_return_rate
                    .unwrap_or(defaults.returns.conservative),
                cash: self.cash_return.unwrap_or(defaults.returns.cash),
            },
            retirement_age: self.retirement_age.unwrap_or(defaults.retirement_age),
            life_expectancy: self.life_expectancy.unwrap_or(defaults.life_expectancy),
            inflation_rate: self.inflation_rate.unwrap_or(defaults.inflation_rate),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SalaryConfigPayload {
    #[serde(deserialize_with = "lenient_f64", alias = "growth_rate")]
    pub young_growth_rate: Option<f64>,
}

impl SalaryConfigPayload {
    pub fn into_policy(self) -> SalaryPolicy {
        SalaryPolicy {
            annual_growth_rate: self.young_growth_rate.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HouseDataPayload {
    #[serde(deserialize_with = "lenient_f64")]
    pub house_price: Option<f64>,
    /// Percentage of the price, e.g. `20` for 20%.
    #[serde(deserialize_with = "lenient_f64")]
    pub down_payment_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub loan_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_u32")]
    pub loan_years: Option<u32>,
}

impl HouseDataPayload {
    pub fn into_purchase(self) -> HousePurchase {
        let defaults = HousePurchase::default();
        HousePurchase {
            price: self.house_price.unwrap_or(defaults.price),
            down_payment_fraction: self
                .down_payment_ratio
                .map(|percent| (percent / 100.0).clamp(0.0, 1.0))
                .unwrap_or(defaults.down_payment_fraction),
            loan_annual_rate: self.loan_rate.unwrap_or(defaults.loan_annual_rate),
            loan_term_years: self.loan_years.unwrap_or(defaults.loan_term_years),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LifeEventPayload {
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub event_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    pub house_data: Option<Value>,
}

impl LifeEventPayload {
    pub fn into_event(self) -> Option<LifeEvent> {
        let label = self.event_type?;
        let kind = if HOUSE_PURCHASE_LABELS.contains(&label.trim()) {
            let house = self
                .house_data
                .and_then(|v| serde_json::from_value::<HouseDataPayload>(v).ok())
                .unwrap_or_default();
            LifeEventKind::HousePurchase(house.into_purchase())
        } else if label == RANDOM_EVENT_LABEL {
            LifeEventKind::RandomShock
        } else {
            LifeEventKind::Custom(label)
        };

        Some(LifeEvent {
            kind,
            description: self.description,
            amount: self.amount,
        })
    }
}

fn section<T>(root: &Map<String, Value>, key: &str) -> T
where
    T: Default + for<'de> Deserialize<'de>,
{
    match root.get(key) {
        Some(value @ Value::Object(_)) => {
            serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                log::warn!("ignoring malformed `{key}` section: {e}");
                T::default()
            })
        }
        Some(Value::Null) | None => T::default(),
        Some(_) => {
            log::warn!("ignoring `{key}`: expected an object");
            T::default()
        }
    }
}

pub fn life_plan_from_value(value: Option<&Value>) -> LifePlan {
    let mut plan = LifePlan::new();
    let Some(Value::Object(entries)) = value else {
        return plan;
    };

    for (key, records) in entries {
        let Ok(age) = key.trim().parse::<u32>() else {
            log::warn!("skipping life planning entry with non-numeric age `{key}`");
            continue;
        };
        let Value::Array(records) = records else {
            log::warn!("skipping life planning entry for age {age}: expected a list");
            continue;
        };

        let events = plan.entry(age).or_insert_with(Vec::new);
        for record in records {
            let event = serde_json::from_value::<LifeEventPayload>(record.clone())
                .ok()
                .and_then(LifeEventPayload::into_event);
            match event {
                Some(event) => events.push(event),
                None => log::warn!("skipping life event at age {age} without a type"),
            }
        }
    }

    plan.retain(|_, events| !events.is_empty());
    plan
}

pub fn life_plan_to_value(plan: &LifePlan) -> Value {
    let entries = plan
        .iter()
        .map(|(age, events)| {
            let records = events.iter().map(life_event_to_value).collect::<Vec<_>>();
            (age.to_string(), Value::Array(records))
        })
        .collect::<Map<_, _>>();
    Value::Object(entries)
}

fn life_event_to_value(event: &LifeEvent) -> Value {
    let mut record = json!({
        "type": event.kind.label(),
        "description": event.description,
        "amount": event.amount,
    });
    if let LifeEventKind::HousePurchase(house) = &event.kind {
        record["house_data"] = json!({
            "house_price": house.price,
            "down_payment_ratio": house.down_payment_fraction * 100.0,
            "loan_rate": house.loan_annual_rate,
            "loan_years": house.loan_term_years,
        });
    }
    record
}

/// Builds a complete simulation input from a bundle object, defaulting
/// everything that is missing or malformed.
pub fn simulation_input_from_value(value: &Value) -> Result<SimulationInput, FireError> {
    let Value::Object(root) = value else {
        return Err(FireError::InvalidRequest(
            "expected a JSON object with player_status, investment_config, salary_config and life_planning"
                .to_string(),
        ));
    };

    Ok(SimulationInput {
        person: section::<PlayerStatusPayload>(root, "player_status").into_person(),
        investment: section::<InvestmentConfigPayload>(root, "investment_config").into_policy(),
        salary: section::<SalaryConfigPayload>(root, "salary_config").into_policy(),
        life_plan: life_plan_from_value(root.get("life_planning")),
    })
}

pub fn simulation_input_from_slice(body: &[u8]) -> Result<SimulationInput, FireError> {
    let value = serde_json::from_slice::<Value>(body)
        .map_err(|e| FireError::InvalidRequest(format!("invalid JSON payload: {e}")))?;
    simulation_input_from_value(&value)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RetirementTargetPayload {
    #[serde(deserialize_with = "lenient_f64")]
    pub monthly_expense: Option<f64>,
    #[serde(deserialize_with = "lenient_age")]
    pub current_age: Option<u32>,
    #[serde(deserialize_with = "lenient_age")]
    pub retirement_age: Option<u32>,
    #[serde(deserialize_with = "lenient_age")]
    pub life_expectancy: Option<u32>,
    #[serde(deserialize_with = "lenient_f64")]
    pub inflation_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub conservative_return_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetirementTargetRequest {
    pub monthly_expense: f64,
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub inflation_rate: f64,
    pub real_return_rate: f64,
}

impl RetirementTargetPayload {
    pub fn into_request(self) -> RetirementTargetRequest {
        RetirementTargetRequest {
            monthly_expense: self.monthly_expense.unwrap_or(30_000.0),
            current_age: self.current_age.unwrap_or(25),
            retirement_age: self.retirement_age.unwrap_or(65),
            life_expectancy: self.life_expectancy.unwrap_or(85),
            inflation_rate: self.inflation_rate.unwrap_or(0.03),
            real_return_rate: self.conservative_return_rate.unwrap_or(0.03),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RandomEventPayload {
    #[serde(deserialize_with = "lenient_age", alias = "age")]
    pub current_age: Option<u32>,
    #[serde(deserialize_with = "lenient_age")]
    pub retirement_age: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    pub seed: Option<u32>,
    pub life_planning: Option<Value>,
}

pub fn parse_object<T>(body: &[u8]) -> Result<T, FireError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let value = serde_json::from_slice::<Value>(body)
        .map_err(|e| FireError::InvalidRequest(format!("invalid JSON payload: {e}")))?;
    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| FireError::InvalidRequest(format!("invalid payload: {e}"))),
        Value::Null => Ok(T::default()),
        _ => Err(FireError::InvalidRequest("expected a JSON object".to_string())),
    }
}
