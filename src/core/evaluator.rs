use std::collections::BTreeMap;

use super::format::format_amount;
use super::targets::{
    SAFE_WITHDRAWAL_RATE, growing_annuity_present_value, projected_annual_expense,
    retirement_target_growing_annuity, retirement_target_traditional_25x, traditional_target,
};
use super::types::{
    FireAssessment, InvestmentPolicy, PersonStatus, RetirementStatus, YearEndSnapshot,
};

/// Scans the year-end series for the first age at which net worth covers each
/// target independently. The growing-annuity target discounts at the
/// conservative return and grows expenses with inflation.
pub fn evaluate_fire(
    yearly: &BTreeMap<u32, YearEndSnapshot>,
    person: &PersonStatus,
    policy: &InvestmentPolicy,
) -> FireAssessment {
    let discount_rate = policy.returns.conservative;
    let inflation = policy.inflation_rate;
    let retirement_age = policy.retirement_age;

    let (fire_target_growing, fire_target_traditional) = match yearly.get(&retirement_age) {
        Some(snapshot) => {
            let annual_expense = snapshot.monthly_expense * 12.0;
            (
                growing_annuity_present_value(
                    annual_expense,
                    policy.life_expectancy.saturating_sub(retirement_age),
                    discount_rate,
                    inflation,
                ),
                traditional_target(annual_expense),
            )
        }
        None => (
            retirement_target_growing_annuity(
                person.monthly_expense,
                person.age,
                retirement_age,
                policy.life_expectancy,
                inflation,
                discount_rate,
            ),
            retirement_target_traditional_25x(
                person.monthly_expense,
                person.age,
                retirement_age,
                inflation,
            ),
        ),
    };

    let mut fire_age_growing = None;
    let mut fire_age_traditional = None;
    let mut achievements = Vec::new();

    for (&age, snapshot) in yearly {
        if age >= policy.life_expectancy {
            continue;
        }
        let remaining_years = policy.life_expectancy - age;
        let annual_expense = projected_annual_expense(
            person.monthly_expense,
            age.saturating_sub(person.age),
            inflation,
        );
        let growing_target =
            growing_annuity_present_value(annual_expense, remaining_years, discount_rate, inflation);
        let traditional = traditional_target(annual_expense);
        let net_worth = snapshot.net_worth;

        if fire_age_growing.is_none() && net_worth >= growing_target {
            fire_age_growing = Some(age);
            achievements.push(format!(
                "growing annuity target met at age {age} (needs {}, has {})",
                format_amount(growing_target),
                format_amount(net_worth)
            ));
        }
        if fire_age_traditional.is_none() && net_worth >= traditional {
            fire_age_traditional = Some(age);
            achievements.push(format!(
                "25x rule target met at age {age} (needs {}, has {})",
                format_amount(traditional),
                format_amount(net_worth)
            ));
        }
        if fire_age_growing.is_some() && fire_age_traditional.is_some() {
            break;
        }
    }

    let retirement_status = yearly.get(&retirement_age).map(|snapshot| RetirementStatus {
        age: retirement_age,
        net_worth: snapshot.net_worth,
        monthly_expense: snapshot.monthly_expense,
        annual_expense: snapshot.monthly_expense * 12.0,
        safe_withdrawal: snapshot.net_worth * SAFE_WITHDRAWAL_RATE,
    });

    log::debug!(
        "fire evaluation: growing age {fire_age_growing:?}, traditional age {fire_age_traditional:?}"
    );

    FireAssessment {
        fire_age_growing,
        fire_age_traditional,
        fire_target_growing,
        fire_target_traditional,
        retirement_status,
        achievements,
    }
}
