use super::types::HousePurchase;

/// Level principal-reduction payment: `principal / (term_years * 12)`.
///
/// The annual rate is carried for reporting only and does not enter the
/// payment, so interest cost is not modelled.
pub fn monthly_payment(principal: f64, _annual_rate: f64, term_years: u32) -> f64 {
    if principal <= 0.0 || term_years == 0 {
        return 0.0;
    }
    principal / (term_years as f64 * 12.0)
}

/// Balance after one serviced month, floored at zero.
pub fn service_month(balance: f64, payment: f64) -> f64 {
    (balance - payment).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mortgage {
    pub principal: f64,
    pub monthly_payment: f64,
}

impl Mortgage {
    pub fn originate(purchase: &HousePurchase) -> Self {
        let principal = purchase.loan_principal().max(0.0);
        Self {
            principal,
            monthly_payment: monthly_payment(
                principal,
                purchase.loan_annual_rate,
                purchase.loan_term_years,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    #[test]
    fn payment_ignores_rate() {
        let a = monthly_payment(12_000_000.0, 0.03, 30);
        let b = monthly_payment(12_000_000.0, 0.09, 30);
        assert_eq!(a, b);
        assert!((a - 33_333.333_333).abs() < 1e-3);
    }

    #[test]
    fn degenerate_loans_have_no_payment() {
        assert_eq!(monthly_payment(0.0, 0.03, 30), 0.0);
        assert_eq!(monthly_payment(-10.0, 0.03, 30), 0.0);
        assert_eq!(monthly_payment(100_000.0, 0.03, 0), 0.0);
    }

    #[test]
    fn service_month_floors_at_zero() {
        assert_eq!(service_month(100.0, 40.0), 60.0);
        assert_eq!(service_month(30.0, 40.0), 0.0);
        assert_eq!(service_month(0.0, 0.0), 0.0);
    }

    #[test]
    fn originate_applies_down_payment_fraction() {
        let purchase = HousePurchase {
            price: 15_000_000.0,
            down_payment_fraction: 0.2,
            loan_annual_rate: 0.03,
            loan_term_years: 30,
        };
        let mortgage = Mortgage::originate(&purchase);
        assert!((mortgage.principal - 12_000_000.0).abs() < 1e-6);
        assert!((mortgage.monthly_payment - 12_000_000.0 / 360.0).abs() < 1e-9);
    }

    #[test]
    fn originate_never_produces_negative_principal() {
        let over_paid = HousePurchase {
            price: 1_000_000.0,
            down_payment_fraction: 1.5,
            loan_annual_rate: 0.03,
            loan_term_years: 30,
        };
        let negative_price = HousePurchase {
            price: -500_000.0,
            ..over_paid
        };
        for purchase in [over_paid, negative_price] {
            let mortgage = Mortgage::originate(&purchase);
            assert_eq!(mortgage.principal, 0.0);
            assert_eq!(mortgage.monthly_payment, 0.0);
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_payments_sum_to_principal(
            principal in 1u32..50_000_000,
            term_years in 1u32..41
        ) {
            let principal = principal as f64;
            let payment = monthly_payment(principal, 0.03, term_years);
            let months = term_years * 12;

            let total = payment * months as f64;
            prop_assert!((total - principal).abs() <= principal * 1e-12 + 1e-6);

            let mut balance = principal;
            for _ in 0..months {
                balance = service_month(balance, payment);
            }
            prop_assert!(balance <= principal * 1e-9 + 1e-6);
            prop_assert!(balance >= 0.0);
        }
    }
}
