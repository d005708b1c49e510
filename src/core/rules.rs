use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use super::engine::calculate_net_pay;
use super::error::{EngineError, RuleTableError};
use super::jurisdictions::builtin_countries;
use super::solver::{GrossSolution, solve_gross};
use super::types::{
    CalculationResult, CountryRules, DeductionKind, Deductible, FilerPolicy, PolicyOverride,
    UserInputs,
};

static BUILTIN: LazyLock<RuleTable> = LazyLock::new(|| RuleTable {
    countries: builtin_countries()
        .into_iter()
        .map(|country| (country.code.clone(), country))
        .collect(),
});

/// Read-only map from jurisdiction code to its rules. There is no mutating
/// API once a table is built; evaluation only ever sees `&CountryRules`.
#[derive(Debug, Clone)]
pub struct RuleTable {
    countries: BTreeMap<String, CountryRules>,
}

impl RuleTable {
    pub fn builtin() -> &'static RuleTable {
        &BUILTIN
    }

    pub fn new(countries: Vec<CountryRules>) -> Result<Self, RuleTableError> {
        let mut map = BTreeMap::new();
        for country in countries {
            validate_country(&country)?;
            let code = country.code.clone();
            if map.insert(code.clone(), country).is_some() {
                return Err(RuleTableError::DuplicateJurisdiction(code));
            }
        }
        Ok(Self { countries: map })
    }

    /// Parses a JSON array of jurisdictions and validates it.
    pub fn from_json(json: &str) -> Result<Self, RuleTableError> {
        let countries: Vec<CountryRules> = serde_json::from_str(json)?;
        Self::new(countries)
    }

    pub fn from_path(path: &Path) -> Result<Self, RuleTableError> {
        let data = std::fs::read_to_string(path)?;
        let table = Self::from_json(&data)?;
        tracing::info!(
            path = %path.display(),
            jurisdictions = table.len(),
            "loaded rule table"
        );
        Ok(table)
    }

    pub fn get(&self, code: &str) -> Option<&CountryRules> {
        self.countries
            .get(code)
            .or_else(|| self.countries.get(&code.to_ascii_uppercase()))
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    pub fn countries(&self) -> impl Iterator<Item = &CountryRules> {
        self.countries.values()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn calculate(&self, inputs: &UserInputs) -> Result<CalculationResult, EngineError> {
        let country = self.lookup(&inputs.country)?;
        Ok(calculate_net_pay(inputs, country))
    }

    pub fn solve(&self, target_net: f64, base: &UserInputs) -> Result<GrossSolution, EngineError> {
        let country = self.lookup(&base.country)?;
        Ok(solve_gross(target_net, base, country))
    }

    fn lookup(&self, code: &str) -> Result<&CountryRules, EngineError> {
        self.get(code)
            .ok_or_else(|| EngineError::UnknownJurisdiction(code.to_string()))
    }
}

pub fn validate_country(country: &CountryRules) -> Result<(), RuleTableError> {
    for deductible in &country.federal_deductibles {
        validate_deductible(&country.code, deductible)?;
    }
    for policy in &country.policies {
        validate_policy(&country.code, &country.code, policy)?;
    }

    let mut seen = HashSet::new();
    for region in &country.sub_national_rules {
        if !seen.insert(region.id.as_str()) {
            return Err(RuleTableError::DuplicateRegion {
                jurisdiction: country.code.clone(),
                id: region.id.clone(),
            });
        }
        for deductible in &region.deductibles {
            validate_deductible(&country.code, deductible)?;
        }
        for policy in &region.policies {
            validate_policy(&country.code, &region.id, policy)?;
        }
    }
    Ok(())
}

fn validate_policy(
    jurisdiction: &str,
    scope: &str,
    policy: &FilerPolicy,
) -> Result<(), RuleTableError> {
    let invalid = |field: &'static str, value: f64| RuleTableError::InvalidPolicyValue {
        jurisdiction: jurisdiction.to_string(),
        scope: scope.to_string(),
        category: policy.category,
        field,
        value,
    };
    let check = |field: &'static str, value: f64| {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(invalid(field, value))
        }
    };

    match &policy.action {
        PolicyOverride::ExemptAmount(amount) => check("exemptAmount", *amount),
        PolicyOverride::AdditionalCredits(amount) => check("additionalCredits", *amount),
        PolicyOverride::TaxableFraction(fraction) => {
            if (0.0..=1.0).contains(fraction) {
                Ok(())
            } else {
                Err(invalid("taxableFraction", *fraction))
            }
        }
        PolicyOverride::BracketTable(brackets) if brackets.is_empty() => {
            Err(RuleTableError::EmptyPolicyTable {
                jurisdiction: jurisdiction.to_string(),
                scope: scope.to_string(),
                category: policy.category,
            })
        }
        PolicyOverride::BracketTable(brackets) => brackets.iter().try_for_each(|bracket| {
            check("threshold", bracket.threshold)?;
            check("rate", bracket.rate)
        }),
        PolicyOverride::IncomeSplitting => Ok(()),
    }
}

fn validate_deductible(jurisdiction: &str, deductible: &Deductible) -> Result<(), RuleTableError> {
    match deductible.kind {
        DeductionKind::Progressive if deductible.brackets.is_empty() => {
            return Err(RuleTableError::MissingBrackets {
                jurisdiction: jurisdiction.to_string(),
                rule: deductible.name.clone(),
            });
        }
        DeductionKind::Percentage
            if deductible.rate.is_none() && deductible.rates_by_age.is_empty() =>
        {
            return Err(RuleTableError::MissingRate {
                jurisdiction: jurisdiction.to_string(),
                rule: deductible.name.clone(),
            });
        }
        // Church tax is a share of income tax and never reads age bands.
        _ if deductible.is_church_tax && deductible.rate.is_none() => {
            return Err(RuleTableError::MissingRate {
                jurisdiction: jurisdiction.to_string(),
                rule: deductible.name.clone(),
            });
        }
        _ => {}
    }

    let rates = deductible
        .rate
        .iter()
        .copied()
        .chain(deductible.brackets.iter().map(|b| b.rate))
        .chain(deductible.rates_by_age.iter().map(|b| b.rate))
        .map(|value| ("rate", value));
    let amounts = [
        ("cappedBase", deductible.capped_base),
        ("exemptAmount", deductible.exempt_amount),
        ("fixedCredits", deductible.fixed_credits),
        ("cap", deductible.cap),
    ]
    .into_iter()
    .filter_map(|(field, value)| value.map(|v| (field, v)))
    .chain(deductible.brackets.iter().map(|b| ("threshold", b.threshold)));

    for (field, value) in rates.chain(amounts) {
        if !value.is_finite() || value < 0.0 {
            return Err(RuleTableError::InvalidValue {
                jurisdiction: jurisdiction.to_string(),
                rule: deductible.name.clone(),
                field,
                value,
            });
        }
    }
    Ok(())
}
