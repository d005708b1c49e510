mod engine;
mod error;
mod evaluator;
mod jurisdictions;
mod policy;
mod rules;
mod solver;
mod types;

pub use engine::calculate_net_pay;
pub use error::{EngineError, RuleTableError};
pub use evaluator::{effective_rate, evaluate_deduction, progressive_tax};
pub use policy::{ResolvedPolicy, RuleScope};
pub use rules::{RuleTable, validate_country};
pub use solver::{
    GrossSolution, MAX_BISECTIONS, MAX_EXPANSIONS, NET_TOLERANCE, solve_gross,
    solve_gross_for_net,
};
pub use types::{
    AgeRate, Bracket, CalculationResult, CountryRules, Currency, DeductionEntry, DeductionKind,
    Deductible, FilerDetails, FilerPolicy, FilerState, MaritalStatus, PayFrequency,
    PersonalCosts, PolicyOverride, RuleCategory, SubNationalRule, UserInputs,
};
