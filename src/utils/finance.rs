use serde::Serialize;

pub const DEFAULT_INTEREST_RATE: f64 = 5.0;
pub const DEFAULT_TENURE_YEARS: u32 = 5;

const MIN_INTEREST_RATE: f64 = 0.1;
const MAX_INTEREST_RATE: f64 = 25.0;
const MIN_TENURE_YEARS: u32 = 1;
const MAX_TENURE_YEARS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanEstimate {
    pub monthly_payment: f64,
    pub total_interest: f64,
    pub total_payment: f64,
    pub loan_principal: f64,
    pub down_payment: f64,
    pub interest_rate: f64,
    pub tenure_years: u32,
}

/// Equated monthly instalment for financing `price` minus `down_payment`.
/// Rate is annual percent. Returns `None` when nothing is left to finance.
pub fn estimate_loan(price: f64, down_payment: f64, interest_rate: f64, tenure_years: u32) -> Option<LoanEstimate> {
    let down = down_payment.clamp(0.0, price.max(0.0));
    let rate = interest_rate.clamp(MIN_INTEREST_RATE, MAX_INTEREST_RATE);
    let years = tenure_years.clamp(MIN_TENURE_YEARS, MAX_TENURE_YEARS);

    let principal = price - down;
    if principal <= 0.0 {
        return None;
    }

    let monthly_rate = rate / 100.0 / 12.0;
    let months = (years * 12) as i32;
    let growth = (1.0 + monthly_rate).powi(months);

    let emi = principal * monthly_rate * growth / (growth - 1.0);
    let total_payment = emi * months as f64;

    Some(LoanEstimate {
        monthly_payment: round2(emi),
        total_interest: round2(total_payment - principal),
        total_payment: round2(total_payment),
        loan_principal: round2(principal),
        down_payment: round2(down),
        interest_rate: rate,
        tenure_years: years,
    })
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emi_for_known_loan() {
        // 20,000 at 5% over 5 years is about 377.42 a month
        let estimate = estimate_loan(25_000.0, 5_000.0, 5.0, 5).unwrap();
        assert_eq!(estimate.loan_principal, 20_000.0);
        assert!((estimate.monthly_payment - 377.42).abs() < 0.01);
        assert!((estimate.total_payment - estimate.monthly_payment * 60.0).abs() < 1.0);
        assert!(estimate.total_interest > 0.0);
    }

    #[test]
    fn test_full_down_payment_leaves_nothing_to_finance() {
        assert!(estimate_loan(10_000.0, 10_000.0, 5.0, 5).is_none());
        assert!(estimate_loan(10_000.0, 50_000.0, 5.0, 5).is_none());
    }

    #[test]
    fn test_inputs_are_clamped() {
        let estimate = estimate_loan(10_000.0, -500.0, 99.0, 30).unwrap();
        assert_eq!(estimate.down_payment, 0.0);
        assert_eq!(estimate.interest_rate, 25.0);
        assert_eq!(estimate.tenure_years, 8);

        let estimate = estimate_loan(10_000.0, 0.0, 0.0, 0).unwrap();
        assert_eq!(estimate.interest_rate, 0.1);
        assert_eq!(estimate.tenure_years, 1);
    }
}
