use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeductionKind {
    Percentage,
    Progressive,
    /// Reserved. Accepted by the schema, evaluates to zero.
    Fixed,
}

/// Semantic tag used for dispatch instead of the display name.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleCategory {
    /// Feeds the accumulated income tax that dependent taxes are based on.
    PrimaryIncomeTax,
    SocialContribution,
    DependentTax,
    #[default]
    Other,
}

/// Marginal tier: `rate` applies from `threshold` up to the next tier.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub threshold: f64,
    pub rate: f64,
}

impl Bracket {
    pub const fn new(threshold: f64, rate: f64) -> Self {
        Self { threshold, rate }
    }
}

/// Age band overriding a rule's rate for `min_age < age <= max_age`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeRate {
    pub min_age: u32,
    pub max_age: u32,
    pub rate: f64,
}

impl AgeRate {
    pub fn contains(&self, age: u32) -> bool {
        self.min_age < age && age <= self.max_age
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deductible {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: DeductionKind,
    #[serde(default)]
    pub category: RuleCategory,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub brackets: Vec<Bracket>,
    #[serde(default)]
    pub capped_base: Option<f64>,
    #[serde(default)]
    pub exempt_amount: Option<f64>,
    #[serde(default)]
    pub fixed_credits: Option<f64>,
    #[serde(default)]
    pub cap: Option<f64>,
    #[serde(default)]
    pub rates_by_age: Vec<AgeRate>,
    #[serde(default)]
    pub is_church_tax: bool,
    #[serde(default)]
    pub employer_paid: bool,
}

impl Deductible {
    pub fn percentage(name: &str, category: RuleCategory, rate: f64) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            kind: DeductionKind::Percentage,
            category,
            rate: Some(rate),
            brackets: Vec::new(),
            capped_base: None,
            exempt_amount: None,
            fixed_credits: None,
            cap: None,
            rates_by_age: Vec::new(),
            is_church_tax: false,
            employer_paid: false,
        }
    }

    pub fn progressive(name: &str, category: RuleCategory, brackets: &[Bracket]) -> Self {
        Self {
            kind: DeductionKind::Progressive,
            rate: None,
            brackets: brackets.to_vec(),
            ..Self::percentage(name, category, 0.0)
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_capped_base(mut self, base: f64) -> Self {
        self.capped_base = Some(base);
        self
    }

    pub fn with_exemption(mut self, amount: f64) -> Self {
        self.exempt_amount = Some(amount);
        self
    }

    pub fn with_credits(mut self, amount: f64) -> Self {
        self.fixed_credits = Some(amount);
        self
    }

    pub fn with_cap(mut self, cap: f64) -> Self {
        self.cap = Some(cap);
        self
    }

    pub fn with_age_rates(mut self, bands: &[AgeRate]) -> Self {
        self.rates_by_age = bands.to_vec();
        self
    }

    pub fn church_tax(mut self) -> Self {
        self.is_church_tax = true;
        self
    }

    pub fn employer(mut self) -> Self {
        self.employer_paid = true;
        self
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilerState {
    Single,
    Married,
    Expatriate,
}

impl FilerState {
    pub fn applies_to(self, details: &FilerDetails) -> bool {
        match self {
            FilerState::Single => details.marital_status == MaritalStatus::Single,
            FilerState::Married => details.marital_status == MaritalStatus::Married,
            FilerState::Expatriate => details.expatriate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum PolicyOverride {
    ExemptAmount(f64),
    BracketTable(Vec<Bracket>),
    /// Halve the basis, tax it at the rule's own brackets, double the result.
    IncomeSplitting,
    AdditionalCredits(f64),
    /// Share of income that stays taxable, applied before basis capping.
    TaxableFraction(f64),
}

/// One carve-out row keyed by rule category and filer state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilerPolicy {
    pub category: RuleCategory,
    pub filer_state: FilerState,
    #[serde(rename = "override")]
    pub action: PolicyOverride,
}

impl FilerPolicy {
    pub fn new(category: RuleCategory, filer_state: FilerState, action: PolicyOverride) -> Self {
        Self {
            category,
            filer_state,
            action,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubNationalRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub deductibles: Vec<Deductible>,
    #[serde(default)]
    pub policies: Vec<FilerPolicy>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub code: String,
    pub symbol: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRules {
    pub code: String,
    pub name: String,
    pub currency: Currency,
    pub federal_deductibles: Vec<Deductible>,
    #[serde(default)]
    pub sub_national_rules: Vec<SubNationalRule>,
    #[serde(default)]
    pub policies: Vec<FilerPolicy>,
    #[serde(default)]
    pub supports_marital_status: bool,
    #[serde(default)]
    pub supports_church_tax: bool,
    #[serde(default)]
    pub supports_expatriate: bool,
}

impl CountryRules {
    pub fn region(&self, id: &str) -> Option<&SubNationalRule> {
        self.sub_national_rules.iter().find(|r| r.id == id)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayFrequency {
    Monthly,
    #[default]
    Annual,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilerDetails {
    pub age: Option<u32>,
    pub marital_status: MaritalStatus,
    pub church_tax: bool,
    pub expatriate: bool,
}

/// Recurring monthly living costs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalCosts {
    pub rent: f64,
    pub groceries: f64,
    pub utilities: f64,
    pub transport: f64,
    pub insurance: f64,
    pub emergency_fund: f64,
    pub debt: f64,
    pub freedom_fund: f64,
}

impl PersonalCosts {
    /// Costs subtracted from disposable income. `debt` and `freedom_fund`
    /// are tracked but not subtracted.
    pub fn disposable_total(&self) -> f64 {
        [
            self.rent,
            self.groceries,
            self.utilities,
            self.transport,
            self.insurance,
            self.emergency_fund,
        ]
        .iter()
        .map(|v| v.max(0.0))
        .sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInputs {
    pub gross_income: f64,
    #[serde(default)]
    pub frequency: PayFrequency,
    pub country: String,
    #[serde(default)]
    pub sub_region: Option<String>,
    #[serde(default)]
    pub details: FilerDetails,
    #[serde(default)]
    pub costs: PersonalCosts,
    #[serde(default)]
    pub annual_bonus: f64,
}

impl UserInputs {
    pub fn annual(country: &str, gross_income: f64) -> Self {
        Self {
            gross_income,
            frequency: PayFrequency::Annual,
            country: country.to_string(),
            sub_region: None,
            details: FilerDetails::default(),
            costs: PersonalCosts::default(),
            annual_bonus: 0.0,
        }
    }

    pub fn gross_annual(&self) -> f64 {
        let gross = if self.gross_income.is_finite() {
            self.gross_income.max(0.0)
        } else {
            0.0
        };
        match self.frequency {
            PayFrequency::Monthly => gross * 12.0,
            PayFrequency::Annual => gross,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionEntry {
    pub name: String,
    pub description: String,
    pub amount: f64,
    pub amount_monthly: f64,
    pub is_employer: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub gross_annual: f64,
    pub gross_monthly: f64,
    pub net_annual: f64,
    pub net_monthly: f64,
    pub total_deductions_monthly: f64,
    pub employer_contributions_annual: f64,
    pub effective_tax_rate: f64,
    pub deductions_breakdown: Vec<DeductionEntry>,
    pub disposable_monthly: f64,
    pub personal_costs_total: f64,
    pub annual_bonus: f64,
}
