//! Built-in rule tables.
//!
//! Figures are 2024 schedules, simplified where the real rule is not a
//! bracket table (the German tariff formula, Irish USC exemptions, Dutch
//! credit phase-outs). They exist to exercise the engine, not to file taxes.

use super::types::{
    AgeRate, Bracket, CountryRules, Currency, Deductible, FilerPolicy, FilerState, PolicyOverride,
    RuleCategory::{DependentTax, Other, PrimaryIncomeTax, SocialContribution},
    SubNationalRule,
};

pub fn builtin_countries() -> Vec<CountryRules> {
    vec![
        united_states(),
        germany(),
        singapore(),
        ireland(),
        united_kingdom(),
        netherlands(),
    ]
}

fn currency(code: &str, symbol: &str) -> Currency {
    Currency {
        code: code.to_string(),
        symbol: symbol.to_string(),
    }
}

fn country(code: &str, name: &str, currency: Currency, federal: Vec<Deductible>) -> CountryRules {
    CountryRules {
        code: code.to_string(),
        name: name.to_string(),
        currency,
        federal_deductibles: federal,
        sub_national_rules: Vec::new(),
        policies: Vec::new(),
        supports_marital_status: false,
        supports_church_tax: false,
        supports_expatriate: false,
    }
}

fn region(id: &str, name: &str, deductibles: Vec<Deductible>) -> SubNationalRule {
    SubNationalRule {
        id: id.to_string(),
        name: name.to_string(),
        deductibles,
        policies: Vec::new(),
    }
}

fn brackets(rows: &[(f64, f64)]) -> Vec<Bracket> {
    rows.iter()
        .map(|&(threshold, rate)| Bracket::new(threshold, rate))
        .collect()
}

const US_SINGLE: &[(f64, f64)] = &[
    (0.0, 0.10),
    (11_600.0, 0.12),
    (47_150.0, 0.22),
    (100_525.0, 0.24),
    (191_950.0, 0.32),
    (243_725.0, 0.35),
    (609_350.0, 0.37),
];

const US_JOINT: &[(f64, f64)] = &[
    (0.0, 0.10),
    (23_200.0, 0.12),
    (94_300.0, 0.22),
    (201_050.0, 0.24),
    (383_900.0, 0.32),
    (487_450.0, 0.35),
    (731_200.0, 0.37),
];

const CA_SINGLE: &[(f64, f64)] = &[
    (0.0, 0.01),
    (10_756.0, 0.02),
    (25_499.0, 0.04),
    (40_245.0, 0.06),
    (55_866.0, 0.08),
    (70_606.0, 0.093),
    (360_659.0, 0.103),
    (432_787.0, 0.113),
    (721_314.0, 0.123),
];

const NY_SINGLE: &[(f64, f64)] = &[
    (0.0, 0.04),
    (8_500.0, 0.045),
    (11_700.0, 0.0525),
    (13_900.0, 0.055),
    (80_650.0, 0.06),
    (215_400.0, 0.0685),
    (1_077_550.0, 0.0965),
    (5_000_000.0, 0.103),
    (25_000_000.0, 0.109),
];

fn united_states() -> CountryRules {
    let mut us = country(
        "US",
        "United States",
        currency("USD", "$"),
        vec![
            Deductible::progressive("Federal Income Tax", PrimaryIncomeTax, &brackets(US_SINGLE))
                .described("Federal income tax after the standard deduction")
                .with_exemption(14_600.0),
            Deductible::percentage("Social Security", SocialContribution, 0.062)
                .described("OASDI up to the wage base")
                .with_capped_base(168_600.0),
            Deductible::percentage("Medicare", SocialContribution, 0.0145)
                .described("Hospital insurance, no wage base"),
        ],
    );
    us.supports_marital_status = true;
    us.policies = vec![
        FilerPolicy::new(
            PrimaryIncomeTax,
            FilerState::Married,
            PolicyOverride::BracketTable(brackets(US_JOINT)),
        ),
        FilerPolicy::new(
            PrimaryIncomeTax,
            FilerState::Married,
            PolicyOverride::ExemptAmount(29_200.0),
        ),
    ];

    let joint_ca: Vec<(f64, f64)> = CA_SINGLE.iter().map(|&(t, r)| (t * 2.0, r)).collect();
    let mut california = region(
        "CA",
        "California",
        vec![
            Deductible::progressive("State Income Tax", PrimaryIncomeTax, &brackets(CA_SINGLE))
                .with_exemption(5_540.0),
            Deductible::percentage("State Disability Insurance", SocialContribution, 0.011),
        ],
    );
    california.policies = vec![
        FilerPolicy::new(
            PrimaryIncomeTax,
            FilerState::Married,
            PolicyOverride::BracketTable(brackets(&joint_ca)),
        ),
        FilerPolicy::new(
            PrimaryIncomeTax,
            FilerState::Married,
            PolicyOverride::ExemptAmount(11_080.0),
        ),
    ];

    us.sub_national_rules = vec![
        california,
        region(
            "NY",
            "New York",
            vec![
                Deductible::progressive("State Income Tax", PrimaryIncomeTax, &brackets(NY_SINGLE))
                    .with_exemption(8_000.0),
            ],
        ),
        region("TX", "Texas", Vec::new()),
    ];
    us
}

fn germany() -> CountryRules {
    let mut de = country(
        "DE",
        "Germany",
        currency("EUR", "€"),
        vec![
            Deductible::progressive(
                "Income Tax",
                PrimaryIncomeTax,
                &brackets(&[
                    (0.0, 0.0),
                    (11_604.0, 0.14),
                    (17_006.0, 0.24),
                    (66_761.0, 0.42),
                    (277_826.0, 0.45),
                ]),
            )
            .described("Einkommensteuer, linearised tariff"),
            Deductible::percentage("Church Tax", DependentTax, 0.09)
                .described("Kirchensteuer on income tax")
                .church_tax(),
            Deductible::percentage("Pension Insurance", SocialContribution, 0.093)
                .with_capped_base(90_600.0),
            Deductible::percentage("Unemployment Insurance", SocialContribution, 0.013)
                .with_capped_base(90_600.0),
            Deductible::percentage("Health Insurance", SocialContribution, 0.0815)
                .with_capped_base(62_100.0),
            Deductible::percentage("Long-term Care Insurance", SocialContribution, 0.017)
                .with_capped_base(62_100.0),
        ],
    );
    de.supports_marital_status = true;
    de.supports_church_tax = true;
    de.policies = vec![FilerPolicy::new(
        PrimaryIncomeTax,
        FilerState::Married,
        PolicyOverride::IncomeSplitting,
    )];
    de
}

fn singapore() -> CountryRules {
    let cpf_bands = [
        (0, 55, 0.20),
        (55, 60, 0.17),
        (60, 65, 0.115),
        (65, 70, 0.075),
        (70, 150, 0.05),
    ]
    .map(|(min_age, max_age, rate)| AgeRate {
        min_age,
        max_age,
        rate,
    });

    country(
        "SG",
        "Singapore",
        currency("SGD", "S$"),
        vec![
            Deductible::progressive(
                "Income Tax",
                PrimaryIncomeTax,
                &brackets(&[
                    (0.0, 0.0),
                    (20_000.0, 0.02),
                    (30_000.0, 0.035),
                    (40_000.0, 0.07),
                    (80_000.0, 0.115),
                    (120_000.0, 0.15),
                    (160_000.0, 0.18),
                    (200_000.0, 0.19),
                    (240_000.0, 0.195),
                    (280_000.0, 0.20),
                    (320_000.0, 0.22),
                    (500_000.0, 0.23),
                    (1_000_000.0, 0.24),
                ]),
            ),
            Deductible::percentage("CPF Employee", SocialContribution, 0.20)
                .described("Central Provident Fund, ordinary wage ceiling")
                .with_capped_base(81_600.0)
                .with_age_rates(&cpf_bands),
        ],
    )
}

fn ireland() -> CountryRules {
    let mut ie = country(
        "IE",
        "Ireland",
        currency("EUR", "€"),
        vec![
            Deductible::progressive(
                "Income Tax",
                PrimaryIncomeTax,
                &brackets(&[(0.0, 0.20), (42_000.0, 0.40)]),
            )
            .described("PAYE after personal and employee credits")
            .with_credits(3_750.0),
            Deductible::progressive(
                "Universal Social Charge",
                Other,
                &brackets(&[
                    (0.0, 0.005),
                    (12_012.0, 0.02),
                    (25_760.0, 0.04),
                    (70_044.0, 0.08),
                ]),
            ),
            Deductible::percentage("PRSI", SocialContribution, 0.04),
        ],
    );
    ie.supports_marital_status = true;
    ie.policies = vec![
        FilerPolicy::new(
            PrimaryIncomeTax,
            FilerState::Married,
            PolicyOverride::BracketTable(brackets(&[(0.0, 0.20), (51_000.0, 0.40)])),
        ),
        FilerPolicy::new(
            PrimaryIncomeTax,
            FilerState::Married,
            PolicyOverride::AdditionalCredits(3_750.0),
        ),
    ];
    ie
}

fn united_kingdom() -> CountryRules {
    country(
        "GB",
        "United Kingdom",
        currency("GBP", "£"),
        vec![
            Deductible::progressive(
                "Income Tax",
                PrimaryIncomeTax,
                &brackets(&[(0.0, 0.20), (37_700.0, 0.40), (112_570.0, 0.45)]),
            )
            .described("Basic, higher and additional rate after the personal allowance")
            .with_exemption(12_570.0),
            Deductible::progressive(
                "National Insurance",
                SocialContribution,
                &brackets(&[(0.0, 0.0), (12_570.0, 0.08), (50_270.0, 0.02)]),
            ),
            Deductible::progressive(
                "Employer National Insurance",
                SocialContribution,
                &brackets(&[(0.0, 0.0), (9_100.0, 0.138)]),
            )
            .employer(),
        ],
    )
}

fn netherlands() -> CountryRules {
    let mut nl = country(
        "NL",
        "Netherlands",
        currency("EUR", "€"),
        vec![
            Deductible::progressive(
                "Income Tax",
                PrimaryIncomeTax,
                &brackets(&[(0.0, 0.3697), (75_518.0, 0.495)]),
            )
            .described("Box 1 including national insurance, general tax credit applied")
            .with_credits(3_362.0),
        ],
    );
    nl.supports_expatriate = true;
    nl.policies = vec![FilerPolicy::new(
        PrimaryIncomeTax,
        FilerState::Expatriate,
        PolicyOverride::TaxableFraction(0.70),
    )];
    nl
}
