use super::policy::RuleScope;
use super::types::{Bracket, DeductionKind, Deductible, FilerDetails};

/// Amount owed for one rule on an annual gross income. Never negative.
///
/// `accumulated_income_tax` is the primary income tax computed so far for
/// the same filer; church tax is a share of it rather than of income.
pub fn evaluate_deduction(
    gross_annual: f64,
    deductible: &Deductible,
    details: &FilerDetails,
    scope: &RuleScope<'_>,
    accumulated_income_tax: f64,
) -> f64 {
    if deductible.is_church_tax {
        if !details.church_tax {
            return 0.0;
        }
        let rate = deductible.rate.unwrap_or(0.0).max(0.0);
        return (accumulated_income_tax.max(0.0) * rate).max(0.0);
    }

    if !gross_annual.is_finite() || gross_annual <= 0.0 {
        return 0.0;
    }

    let rate = effective_rate(deductible, details.age);
    let policy = scope.resolve(deductible.category, details);

    let mut basis = gross_annual * policy.taxable_fraction;
    if let Some(capped_base) = deductible.capped_base {
        basis = basis.min(capped_base.max(0.0));
    }

    let exempt = policy
        .exempt_amount
        .or(deductible.exempt_amount)
        .unwrap_or(0.0)
        .max(0.0);
    let basis = (basis - exempt).max(0.0);

    let tax = match deductible.kind {
        DeductionKind::Percentage => basis * rate,
        DeductionKind::Progressive => match policy.brackets {
            Some(table) => progressive_tax(basis, table),
            None if policy.income_splitting => {
                progressive_tax(basis / 2.0, &deductible.brackets) * 2.0
            }
            None => progressive_tax(basis, &deductible.brackets),
        },
        DeductionKind::Fixed => 0.0,
    };

    let credits = deductible.fixed_credits.unwrap_or(0.0).max(0.0) + policy.additional_credits;
    let mut amount = (tax - credits).max(0.0);
    if let Some(cap) = deductible.cap {
        amount = amount.min(cap.max(0.0));
    }

    tracing::trace!(
        jurisdiction = scope.jurisdiction,
        rule = %deductible.name,
        basis,
        amount,
        "evaluated deduction"
    );
    amount
}

/// Age band rate when one matches, otherwise the rule's own rate.
pub fn effective_rate(deductible: &Deductible, age: Option<u32>) -> f64 {
    let banded = age.and_then(|age| {
        deductible
            .rates_by_age
            .iter()
            .find(|band| band.contains(age))
            .map(|band| band.rate)
    });
    banded.or(deductible.rate).unwrap_or(0.0).max(0.0)
}

/// Marginal accumulation over a bracket table sorted ascending by threshold.
pub fn progressive_tax(basis: f64, brackets: &[Bracket]) -> f64 {
    if basis <= 0.0 || brackets.is_empty() {
        return 0.0;
    }

    let mut sorted = brackets.to_vec();
    sorted.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));

    let mut total = 0.0;
    for (i, bracket) in sorted.iter().enumerate() {
        let bottom = bracket.threshold;
        if basis <= bottom {
            break;
        }
        let top = sorted.get(i + 1).map_or(f64::INFINITY, |next| next.threshold);
        total += (basis.min(top) - bottom) * bracket.rate;
    }
    total.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        AgeRate, FilerPolicy, FilerState, MaritalStatus, PolicyOverride, RuleCategory,
    };
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn scope() -> RuleScope<'static> {
        RuleScope::without_policies("XX")
    }

    fn sample_brackets() -> Vec<Bracket> {
        vec![
            Bracket::new(0.0, 0.10),
            Bracket::new(10_000.0, 0.20),
            Bracket::new(50_000.0, 0.40),
        ]
    }

    fn income_tax_rule() -> Deductible {
        Deductible::progressive("Income Tax", RuleCategory::PrimaryIncomeTax, &sample_brackets())
    }

    fn married() -> FilerDetails {
        FilerDetails {
            marital_status: MaritalStatus::Married,
            ..FilerDetails::default()
        }
    }

    #[test]
    fn progressive_tax_accumulates_marginal_slices() {
        let brackets = sample_brackets();
        assert_approx(progressive_tax(5_000.0, &brackets), 500.0);
        assert_approx(progressive_tax(30_000.0, &brackets), 1_000.0 + 4_000.0);
        assert_approx(progressive_tax(60_000.0, &brackets), 1_000.0 + 8_000.0 + 4_000.0);
    }

    #[test]
    fn progressive_tax_sorts_unordered_brackets() {
        let mut brackets = sample_brackets();
        brackets.reverse();
        assert_approx(
            progressive_tax(60_000.0, &brackets),
            progressive_tax(60_000.0, &sample_brackets()),
        );
    }

    #[test]
    fn income_below_lowest_threshold_pays_nothing() {
        let brackets = vec![Bracket::new(10_000.0, 0.2), Bracket::new(20_000.0, 0.3)];
        assert_approx(progressive_tax(9_999.0, &brackets), 0.0);
        assert_approx(progressive_tax(15_000.0, &brackets), 1_000.0);
    }

    #[test]
    fn percentage_rule_applies_cap_exemption_credit_and_final_cap() {
        let rule = Deductible::percentage("Levy", RuleCategory::Other, 0.10)
            .with_capped_base(50_000.0)
            .with_exemption(10_000.0);
        let details = FilerDetails::default();
        let eval = |rule: &Deductible, income: f64| {
            evaluate_deduction(income, rule, &details, &scope(), 0.0)
        };
        assert_approx(eval(&rule, 30_000.0), 2_000.0);
        assert_approx(eval(&rule, 90_000.0), 4_000.0);

        let credited = rule.clone().with_credits(500.0);
        assert_approx(eval(&credited, 30_000.0), 1_500.0);
        assert_approx(eval(&credited, 12_000.0), 0.0);

        let capped = rule.with_cap(1_000.0);
        assert_approx(eval(&capped, 90_000.0), 1_000.0);
    }

    #[test]
    fn church_tax_uses_accumulated_income_tax_only_when_opted_in() {
        let rule =
            Deductible::percentage("Church Tax", RuleCategory::DependentTax, 0.09).church_tax();
        let mut details = FilerDetails::default();
        assert_approx(evaluate_deduction(80_000.0, &rule, &details, &scope(), 10_000.0), 0.0);

        details.church_tax = true;
        assert_approx(evaluate_deduction(80_000.0, &rule, &details, &scope(), 10_000.0), 900.0);
        assert_approx(evaluate_deduction(0.0, &rule, &details, &scope(), 0.0), 0.0);
    }

    #[test]
    fn age_bands_override_the_default_rate() {
        let rule = Deductible::percentage("Pension", RuleCategory::SocialContribution, 0.20)
            .with_age_rates(&[
                AgeRate {
                    min_age: 0,
                    max_age: 55,
                    rate: 0.20,
                },
                AgeRate {
                    min_age: 55,
                    max_age: 60,
                    rate: 0.17,
                },
            ]);
        assert_approx(effective_rate(&rule, Some(55)), 0.20);
        assert_approx(effective_rate(&rule, Some(56)), 0.17);
        assert_approx(effective_rate(&rule, Some(60)), 0.17);
        assert_approx(effective_rate(&rule, Some(61)), 0.20);
        assert_approx(effective_rate(&rule, None), 0.20);
    }

    #[test]
    fn fixed_kind_is_reserved_and_evaluates_to_zero() {
        let mut rule = Deductible::percentage("Flat Fee", RuleCategory::Other, 0.5);
        rule.kind = DeductionKind::Fixed;
        assert_approx(
            evaluate_deduction(50_000.0, &rule, &FilerDetails::default(), &scope(), 0.0),
            0.0,
        );
    }

    #[test]
    fn non_positive_or_non_finite_income_yields_zero() {
        let rule = income_tax_rule();
        let details = FilerDetails::default();
        assert_approx(evaluate_deduction(0.0, &rule, &details, &scope(), 0.0), 0.0);
        assert_approx(evaluate_deduction(-5_000.0, &rule, &details, &scope(), 0.0), 0.0);
        assert_approx(evaluate_deduction(f64::NAN, &rule, &details, &scope(), 0.0), 0.0);
    }

    #[test]
    fn income_splitting_doubles_tax_on_half_the_basis() {
        let rule = income_tax_rule();
        let policies = vec![FilerPolicy::new(
            RuleCategory::PrimaryIncomeTax,
            FilerState::Married,
            PolicyOverride::IncomeSplitting,
        )];
        let splitting = RuleScope::new("XX", &policies);

        let single =
            evaluate_deduction(100_000.0, &rule, &FilerDetails::default(), &splitting, 0.0);
        let joint = evaluate_deduction(100_000.0, &rule, &married(), &splitting, 0.0);
        assert_approx(single, 1_000.0 + 8_000.0 + 20_000.0);
        assert_approx(joint, 2.0 * (1_000.0 + 8_000.0));
    }

    #[test]
    fn substituted_table_and_exemption_apply_to_married_filers() {
        let rule = income_tax_rule().with_exemption(5_000.0);
        let policies = vec![
            FilerPolicy::new(
                RuleCategory::PrimaryIncomeTax,
                FilerState::Married,
                PolicyOverride::BracketTable(vec![Bracket::new(0.0, 0.05)]),
            ),
            FilerPolicy::new(
                RuleCategory::PrimaryIncomeTax,
                FilerState::Married,
                PolicyOverride::ExemptAmount(20_000.0),
            ),
            FilerPolicy::new(
                RuleCategory::PrimaryIncomeTax,
                FilerState::Married,
                PolicyOverride::AdditionalCredits(100.0),
            ),
        ];
        let scope = RuleScope::new("XX", &policies);
        assert_approx(
            evaluate_deduction(60_000.0, &rule, &married(), &scope, 0.0),
            40_000.0 * 0.05 - 100.0,
        );
        assert_approx(
            evaluate_deduction(15_000.0, &rule, &FilerDetails::default(), &scope, 0.0),
            1_000.0,
        );
    }

    #[test]
    fn taxable_fraction_scales_income_before_capping() {
        let rule = Deductible::percentage("Income Tax", RuleCategory::PrimaryIncomeTax, 0.5)
            .with_capped_base(50_000.0);
        let policies = vec![FilerPolicy::new(
            RuleCategory::PrimaryIncomeTax,
            FilerState::Expatriate,
            PolicyOverride::TaxableFraction(0.7),
        )];
        let scope = RuleScope::new("NL", &policies);
        let details = FilerDetails {
            expatriate: true,
            ..FilerDetails::default()
        };
        assert_approx(evaluate_deduction(50_000.0, &rule, &details, &scope, 0.0), 17_500.0);
        assert_approx(evaluate_deduction(100_000.0, &rule, &details, &scope, 0.0), 25_000.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_bracket_boundaries_are_continuous(
            boundary_index in 0usize..3,
            epsilon_cents in 1u32..10_000
        ) {
            let brackets = sample_brackets();
            let threshold = brackets[boundary_index].threshold;
            let epsilon = epsilon_cents as f64 / 100.0;
            let at = progressive_tax(threshold, &brackets);
            let above = progressive_tax(threshold + epsilon, &brackets);
            let expected = epsilon * brackets[boundary_index].rate;
            prop_assert!((above - at - expected).abs() <= 1e-6);
        }

        #[test]
        fn prop_capped_base_bounds_the_contribution(
            income in 0u32..5_000_000,
            base in 1_000u32..200_000,
            exempt in 0u32..1_000,
            rate_bp in 0u32..5_000
        ) {
            let rate = rate_bp as f64 / 10_000.0;
            let rule = Deductible::percentage("Contribution", RuleCategory::SocialContribution, rate)
                .with_capped_base(base as f64)
                .with_exemption(exempt as f64);
            let amount = evaluate_deduction(
                income as f64,
                &rule,
                &FilerDetails::default(),
                &RuleScope::without_policies("XX"),
                0.0,
            );
            prop_assert!(amount >= 0.0);
            prop_assert!(amount <= (base as f64 - exempt as f64) * rate + 1e-9);
        }
    }
}
