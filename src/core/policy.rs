use super::types::{Bracket, FilerDetails, FilerPolicy, PolicyOverride, RuleCategory};

/// Policy rows in force for one evaluation: the jurisdiction code for
/// diagnostics and the carve-outs of the federal or regional scope.
#[derive(Copy, Clone, Debug)]
pub struct RuleScope<'a> {
    pub jurisdiction: &'a str,
    pub policies: &'a [FilerPolicy],
}

impl<'a> RuleScope<'a> {
    pub fn new(jurisdiction: &'a str, policies: &'a [FilerPolicy]) -> Self {
        Self {
            jurisdiction,
            policies,
        }
    }

    pub fn without_policies(jurisdiction: &'a str) -> Self {
        Self::new(jurisdiction, &[])
    }

    pub fn resolve(&self, category: RuleCategory, details: &FilerDetails) -> ResolvedPolicy<'a> {
        let mut resolved = ResolvedPolicy::default();
        for policy in self
            .policies
            .iter()
            .filter(|p| p.category == category && p.filer_state.applies_to(details))
        {
            match &policy.action {
                PolicyOverride::ExemptAmount(amount) => resolved.exempt_amount = Some(*amount),
                PolicyOverride::BracketTable(brackets) => {
                    resolved.brackets = Some(brackets.as_slice())
                }
                PolicyOverride::IncomeSplitting => resolved.income_splitting = true,
                PolicyOverride::AdditionalCredits(amount) => {
                    resolved.additional_credits += amount.max(0.0)
                }
                PolicyOverride::TaxableFraction(fraction) => {
                    resolved.taxable_fraction *= fraction.clamp(0.0, 1.0)
                }
            }
        }
        resolved
    }
}

/// Carve-outs merged for one rule. Last exemption and bracket rows win,
/// credits add up, taxable fractions multiply.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPolicy<'a> {
    pub exempt_amount: Option<f64>,
    pub brackets: Option<&'a [Bracket]>,
    pub income_splitting: bool,
    pub additional_credits: f64,
    pub taxable_fraction: f64,
}

impl Default for ResolvedPolicy<'_> {
    fn default() -> Self {
        Self {
            exempt_amount: None,
            brackets: None,
            income_splitting: false,
            additional_credits: 0.0,
            taxable_fraction: 1.0,
        }
    }
}
