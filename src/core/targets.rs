/// Multiplier of the traditional rule, equivalent to a 4% withdrawal rate.
pub const TRADITIONAL_MULTIPLIER: f64 = 25.0;
pub const SAFE_WITHDRAWAL_RATE: f64 = 0.04;

const DEGENERATE_RATE_GAP: f64 = 1e-6;

/// Present value of `years` annual payments starting at `first_year_expense`
/// and growing at `growth_rate`, discounted at `discount_rate`.
pub fn growing_annuity_present_value(
    first_year_expense: f64,
    years: u32,
    discount_rate: f64,
    growth_rate: f64,
) -> f64 {
    if years == 0 || first_year_expense <= 0.0 {
        return 0.0;
    }

    let n = years as f64;
    if (discount_rate - growth_rate).abs() < DEGENERATE_RATE_GAP {
        return first_year_expense * n / (1.0 + discount_rate);
    }

    let ratio = (1.0 + growth_rate) / (1.0 + discount_rate);
    first_year_expense * (1.0 - ratio.powf(n)) / (discount_rate - growth_rate)
}

/// Today's monthly expense compounded by inflation for `years` and annualized.
pub fn projected_annual_expense(monthly_expense: f64, years: u32, inflation_rate: f64) -> f64 {
    monthly_expense * 12.0 * (1.0 + inflation_rate).powi(years as i32)
}

pub fn traditional_target(annual_expense: f64) -> f64 {
    annual_expense * TRADITIONAL_MULTIPLIER
}

pub fn retirement_target_growing_annuity(
    monthly_expense: f64,
    current_age: u32,
    retirement_age: u32,
    life_expectancy: u32,
    inflation_rate: f64,
    real_return_rate: f64,
) -> f64 {
    let annual_expense = projected_annual_expense(
        monthly_expense,
        retirement_age.saturating_sub(current_age),
        inflation_rate,
    );
    growing_annuity_present_value(
        annual_expense,
        life_expectancy.saturating_sub(retirement_age),
        real_return_rate,
        inflation_rate,
    )
}

pub fn retirement_target_traditional_25x(
    monthly_expense: f64,
    current_age: u32,
    retirement_age: u32,
    inflation_rate: f64,
) -> f64 {
    traditional_target(projected_annual_expense(
        monthly_expense,
        retirement_age.saturating_sub(current_age),
        inflation_rate,
    ))
}
