use super::evaluator::evaluate_deduction;
use super::policy::RuleScope;
use super::types::{
    CalculationResult, CountryRules, DeductionEntry, Deductible, RuleCategory, UserInputs,
};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Forward calculation: applies the federal rules in declaration order, then
/// the selected region's rules, and splits employee from employer amounts.
pub fn calculate_net_pay(inputs: &UserInputs, country: &CountryRules) -> CalculationResult {
    let gross_annual = inputs.gross_annual();
    let mut breakdown = Vec::new();

    let federal_scope = RuleScope::new(&country.code, &country.policies);
    let mut accumulated_income_tax = 0.0;
    for deductible in &country.federal_deductibles {
        let amount = evaluate_deduction(
            gross_annual,
            deductible,
            &inputs.details,
            &federal_scope,
            accumulated_income_tax,
        );
        if deductible.category == RuleCategory::PrimaryIncomeTax {
            accumulated_income_tax += amount;
        }
        push_entry(&mut breakdown, deductible, deductible.name.clone(), amount);
    }

    if let Some(region) = inputs
        .sub_region
        .as_deref()
        .and_then(|id| country.region(id))
    {
        let regional_scope = RuleScope::new(&country.code, &region.policies);
        // Regional amounts never feed the federal accumulator.
        for deductible in &region.deductibles {
            let amount = evaluate_deduction(
                gross_annual,
                deductible,
                &inputs.details,
                &regional_scope,
                accumulated_income_tax,
            );
            let name = format!("{} {}", region.name, deductible.name);
            push_entry(&mut breakdown, deductible, name, amount);
        }
    } else if let Some(id) = inputs.sub_region.as_deref() {
        tracing::debug!(
            jurisdiction = %country.code,
            sub_region = id,
            "unknown sub-region, applying federal rules only"
        );
    }

    let total_employee_annual: f64 = breakdown
        .iter()
        .filter(|entry| !entry.is_employer)
        .map(|entry| entry.amount)
        .sum();
    let employer_contributions_annual: f64 = breakdown
        .iter()
        .filter(|entry| entry.is_employer)
        .map(|entry| entry.amount)
        .sum();

    let net_annual = gross_annual - total_employee_annual;
    let net_monthly = net_annual / MONTHS_PER_YEAR;
    let personal_costs_total = inputs.costs.disposable_total();

    tracing::debug!(
        jurisdiction = %country.code,
        gross_annual,
        net_annual,
        entries = breakdown.len(),
        "calculated net pay"
    );

    CalculationResult {
        gross_annual,
        gross_monthly: gross_annual / MONTHS_PER_YEAR,
        net_annual,
        net_monthly,
        total_deductions_monthly: total_employee_annual / MONTHS_PER_YEAR,
        employer_contributions_annual,
        effective_tax_rate: if gross_annual > 0.0 {
            total_employee_annual / gross_annual
        } else {
            0.0
        },
        deductions_breakdown: breakdown,
        disposable_monthly: net_monthly - personal_costs_total,
        personal_costs_total,
        annual_bonus: inputs.annual_bonus.max(0.0),
    }
}

fn push_entry(
    breakdown: &mut Vec<DeductionEntry>,
    deductible: &Deductible,
    name: String,
    amount: f64,
) {
    if amount <= 0.0 {
        return;
    }
    breakdown.push(DeductionEntry {
        name,
        description: deductible.description.clone(),
        amount,
        amount_monthly: amount / MONTHS_PER_YEAR,
        is_employer: deductible.employer_paid,
    });
}
