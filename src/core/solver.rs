use serde::Serialize;

use super::engine::calculate_net_pay;
use super::types::{CountryRules, PayFrequency, UserInputs};

pub const NET_TOLERANCE: f64 = 1.0;
pub const MAX_EXPANSIONS: u32 = 20;
pub const MAX_BISECTIONS: u32 = 50;

/// Outcome of a net-to-gross search. `gross` and `achieved_net` use the
/// frequency of the base inputs; `residual` is annual net minus annual target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrossSolution {
    pub gross: f64,
    pub achieved_net: f64,
    pub residual: f64,
    pub iterations: u32,
    pub converged: bool,
}

impl GrossSolution {
    fn zero() -> Self {
        Self {
            gross: 0.0,
            achieved_net: 0.0,
            residual: 0.0,
            iterations: 0,
            converged: true,
        }
    }
}

/// Gross income whose net pay matches `target_net`, or the last estimate.
pub fn solve_gross_for_net(target_net: f64, base: &UserInputs, country: &CountryRules) -> f64 {
    solve_gross(target_net, base, country).gross
}

/// Brackets the root by doubling from `[target, 3 * target]`, then bisects.
/// Assumes net pay is non-decreasing in gross pay; a regressive table can
/// make it settle on a wrong root.
pub fn solve_gross(target_net: f64, base: &UserInputs, country: &CountryRules) -> GrossSolution {
    if !target_net.is_finite() || target_net <= 0.0 {
        return GrossSolution::zero();
    }

    let periods = match base.frequency {
        PayFrequency::Monthly => 12.0,
        PayFrequency::Annual => 1.0,
    };
    let target = target_net * periods;

    let mut lo = target;
    let mut hi = target * 3.0;
    let mut expansions = 0;
    while expansions < MAX_EXPANSIONS && net_at(hi, base, country) < target {
        lo = hi;
        hi *= 2.0;
        expansions += 1;
    }

    let mut best = (lo + hi) * 0.5;
    let mut best_net = f64::NAN;
    let mut converged = false;
    let mut it = 0;
    while it < MAX_BISECTIONS {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let net = net_at(mid, base, country);
        best = mid;
        best_net = net;

        if (net - target).abs() <= NET_TOLERANCE {
            converged = true;
            break;
        }
        if net < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    if !converged {
        tracing::warn!(
            jurisdiction = %country.code,
            target,
            best,
            residual = best_net - target,
            "gross search did not converge; returning best estimate"
        );
    }

    GrossSolution {
        gross: best / periods,
        achieved_net: best_net / periods,
        residual: best_net - target,
        iterations: it,
        converged,
    }
}

fn net_at(gross_annual: f64, base: &UserInputs, country: &CountryRules) -> f64 {
    let mut inputs = base.clone();
    inputs.gross_income = gross_annual.max(0.0);
    inputs.frequency = PayFrequency::Annual;
    calculate_net_pay(&inputs, country).net_annual
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::RuleTable;
    use crate::core::types::{
        Bracket, Currency, Deductible, MaritalStatus, RuleCategory, SubNationalRule,
    };
    use proptest::prelude::{prop_assert, proptest};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn country(code: &str) -> &'static CountryRules {
        RuleTable::builtin()
            .get(code)
            .expect("built-in jurisdiction")
    }

    fn flat_country(rate: f64) -> CountryRules {
        CountryRules {
            code: "FL".to_string(),
            name: "Flatland".to_string(),
            currency: Currency {
                code: "FLT".to_string(),
                symbol: "F".to_string(),
            },
            federal_deductibles: vec![Deductible::percentage(
                "Income Tax",
                RuleCategory::PrimaryIncomeTax,
                rate,
            )],
            sub_national_rules: vec![SubNationalRule {
                id: "E".to_string(),
                name: "East".to_string(),
                deductibles: Vec::new(),
                policies: Vec::new(),
            }],
            policies: Vec::new(),
            supports_marital_status: false,
            supports_church_tax: false,
            supports_expatriate: false,
        }
    }

    #[test]
    fn non_positive_target_returns_zero() {
        let base = UserInputs::annual("US", 0.0);
        assert_eq!(solve_gross_for_net(0.0, &base, country("US")), 0.0);
        assert_eq!(solve_gross_for_net(-500.0, &base, country("US")), 0.0);
        assert_eq!(solve_gross_for_net(f64::NAN, &base, country("US")), 0.0);
    }

    #[test]
    fn tax_free_jurisdiction_returns_target_itself() {
        let country = flat_country(0.0);
        let solution = solve_gross(40_000.0, &UserInputs::annual("FL", 0.0), &country);
        assert!(solution.converged);
        assert_close(solution.gross, 40_000.0, 1.0);
    }

    #[test]
    fn flat_tax_inverts_to_closed_form() {
        let country = flat_country(0.25);
        let solution = solve_gross(30_000.0, &UserInputs::annual("FL", 0.0), &country);
        assert!(solution.converged);
        assert!(solution.residual.abs() <= NET_TOLERANCE);
        assert_close(solution.gross, 40_000.0, 2.0);
    }

    #[test]
    fn heavy_tax_needs_bracket_expansion() {
        let country = flat_country(0.9);
        let solution = solve_gross(10_000.0, &UserInputs::annual("FL", 0.0), &country);
        assert!(solution.converged);
        assert_close(solution.gross, 100_000.0, 11.0);
    }

    #[test]
    fn monthly_inputs_are_solved_and_returned_monthly() {
        let mut base = UserInputs::annual("DE", 0.0);
        base.frequency = PayFrequency::Monthly;
        base.details.church_tax = true;
        let solution = solve_gross(3_000.0, &base, country("DE"));
        assert!(solution.converged);
        assert_close(solution.achieved_net, 3_000.0, NET_TOLERANCE / 12.0 + 1e-9);

        let mut check = base.clone();
        check.gross_income = solution.gross;
        let forward = calculate_net_pay(&check, country("DE"));
        assert_close(forward.net_monthly, 3_000.0, NET_TOLERANCE / 12.0 + 1e-6);
    }

    #[test]
    fn us_married_round_trip_matches_forward_calculation() {
        let mut base = UserInputs::annual("US", 0.0);
        base.details.marital_status = MaritalStatus::Married;
        base.sub_region = Some("CA".to_string());
        let gross = solve_gross_for_net(120_000.0, &base, country("US"));
        let mut check = base.clone();
        check.gross_income = gross;
        assert_close(
            calculate_net_pay(&check, country("US")).net_annual,
            120_000.0,
            NET_TOLERANCE,
        );
    }

    #[test]
    fn confiscatory_table_reports_best_effort_without_converging() {
        let mut country = flat_country(0.0);
        country.federal_deductibles = vec![Deductible::progressive(
            "Income Tax",
            RuleCategory::PrimaryIncomeTax,
            &[Bracket::new(0.0, 0.0), Bracket::new(1_000.0, 1.0)],
        )];
        let solution = solve_gross(5_000.0, &UserInputs::annual("FL", 0.0), &country);
        assert!(!solution.converged);
        assert!(solution.gross.is_finite());
        assert!(solution.residual < 0.0);
        assert_eq!(solution.iterations, MAX_BISECTIONS);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_solved_gross_reproduces_target_net(
            country_index in 0usize..6,
            target in 1_000u32..400_000,
            age in 20u32..75,
            married in proptest::bool::ANY,
            church in proptest::bool::ANY,
            expatriate in proptest::bool::ANY,
            region_index in 0usize..4
        ) {
            let table = RuleTable::builtin();
            let code = table.codes().nth(country_index % table.len()).unwrap();
            let mut base = UserInputs::annual(code, 0.0);
            base.details.age = Some(age);
            base.details.church_tax = church;
            base.details.expatriate = expatriate;
            base.sub_region = country(code)
                .sub_national_rules
                .get(region_index)
                .map(|region| region.id.clone());
            if married {
                base.details.marital_status = MaritalStatus::Married;
            }

            let solution = solve_gross(target as f64, &base, country(code));
            let mut check = base.clone();
            check.gross_income = solution.gross;
            let net = calculate_net_pay(&check, country(code)).net_annual;
            prop_assert!(solution.converged);
            prop_assert!((net - target as f64).abs() <= NET_TOLERANCE + 1e-6);
            prop_assert!(solution.gross + 1e-6 >= target as f64);
        }
    }
}
