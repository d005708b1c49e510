use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{
    CountryRules, EngineError, FilerDetails, MaritalStatus, PayFrequency, PersonalCosts,
    RuleTable, UserInputs,
};

const MAX_AGE: u32 = 130;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFrequency {
    Monthly,
    Annual,
}

impl From<CliFrequency> for PayFrequency {
    fn from(value: CliFrequency) -> Self {
        match value {
            CliFrequency::Monthly => PayFrequency::Monthly,
            CliFrequency::Annual => PayFrequency::Annual,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFrequency {
    #[serde(alias = "month", alias = "MONTHLY")]
    Monthly,
    #[serde(alias = "year", alias = "yearly", alias = "ANNUAL")]
    Annual,
}

impl From<ApiFrequency> for CliFrequency {
    fn from(value: ApiFrequency) -> Self {
        match value {
            ApiFrequency::Monthly => CliFrequency::Monthly,
            ApiFrequency::Annual => CliFrequency::Annual,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiMaritalStatus {
    Single,
    Married,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculatePayload {
    country: Option<String>,
    sub_region: Option<String>,
    gross_income: Option<f64>,
    frequency: Option<ApiFrequency>,
    age: Option<u32>,
    marital_status: Option<ApiMaritalStatus>,
    church_tax: Option<bool>,
    expatriate: Option<bool>,

    rent: Option<f64>,
    groceries: Option<f64>,
    utilities: Option<f64>,
    transport: Option<f64>,
    insurance: Option<f64>,
    emergency_fund: Option<f64>,
    debt: Option<f64>,
    freedom_fund: Option<f64>,
    annual_bonus: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    target_net: Option<f64>,
    #[serde(flatten)]
    filer: CalculatePayload,
}

#[derive(Parser, Debug)]
#[command(
    name = "netpay",
    about = "Take-home pay estimator (progressive and flat schedules, caps, credits, net-to-gross)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "JSON rule table to use instead of the built-in jurisdictions"
    )]
    rules: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Net pay and deduction breakdown for a gross income.
    Net(NetArgs),
    /// Gross income needed to take home a target net income.
    Gross(GrossArgs),
    /// List the available jurisdictions and regions.
    Countries,
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug)]
struct NetArgs {
    #[arg(long, help = "Gross income in the chosen frequency")]
    gross: f64,
    #[command(flatten)]
    filer: FilerArgs,
}

#[derive(Args, Debug)]
struct GrossArgs {
    #[arg(long, help = "Target net income in the chosen frequency")]
    target_net: f64,
    #[command(flatten)]
    filer: FilerArgs,
}

#[derive(Args, Debug, Clone)]
struct FilerArgs {
    #[arg(long, default_value = "US", help = "Jurisdiction code, e.g. US, DE, SG")]
    country: String,
    #[arg(long, help = "State, canton or province id within the jurisdiction")]
    sub_region: Option<String>,
    #[arg(long, value_enum, default_value_t = CliFrequency::Annual)]
    frequency: CliFrequency,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long, default_value_t = false)]
    married: bool,
    #[arg(long, default_value_t = false)]
    church_tax: bool,
    #[arg(long, default_value_t = false)]
    expatriate: bool,
    #[arg(long, default_value_t = 0.0, help = "Monthly rent")]
    rent: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly groceries")]
    groceries: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly utilities")]
    utilities: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly transport")]
    transport: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly insurance")]
    insurance: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly emergency fund contribution")]
    emergency_fund: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly debt payments (not subtracted from disposable income)"
    )]
    debt: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly freedom fund savings (not subtracted from disposable income)"
    )]
    freedom_fund: f64,
    #[arg(long, default_value_t = 0.0, help = "Annual bonus, reported but not taxed")]
    annual_bonus: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegionSummary {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CountrySummary {
    code: String,
    name: String,
    currency_code: String,
    currency_symbol: String,
    supports_marital_status: bool,
    supports_church_tax: bool,
    supports_expatriate: bool,
    sub_regions: Vec<RegionSummary>,
}

impl From<&CountryRules> for CountrySummary {
    fn from(country: &CountryRules) -> Self {
        Self {
            code: country.code.clone(),
            name: country.name.clone(),
            currency_code: country.currency.code.clone(),
            currency_symbol: country.currency.symbol.clone(),
            supports_marital_status: country.supports_marital_status,
            supports_church_tax: country.supports_church_tax,
            supports_expatriate: country.supports_expatriate,
            sub_regions: country
                .sub_national_rules
                .iter()
                .map(|r| RegionSummary {
                    id: r.id.clone(),
                    name: r.name.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(filer: FilerArgs, gross_income: f64) -> Result<UserInputs, String> {
    if !gross_income.is_finite() {
        return Err("--gross must be a finite number".to_string());
    }
    let mut inputs = filer_inputs(filer)?;
    inputs.gross_income = gross_income;
    Ok(inputs)
}

fn solve_request_from_args(args: GrossArgs) -> Result<(f64, UserInputs), String> {
    if !args.target_net.is_finite() {
        return Err("--target-net must be a finite number".to_string());
    }
    let inputs = filer_inputs(args.filer)?;
    Ok((args.target_net, inputs))
}

/// Validates the filer profile; the income field is left at zero.
fn filer_inputs(filer: FilerArgs) -> Result<UserInputs, String> {
    if filer.country.trim().is_empty() {
        return Err("--country must not be empty".to_string());
    }

    if let Some(age) = filer.age {
        if age > MAX_AGE {
            return Err(format!("--age must be <= {MAX_AGE}"));
        }
    }

    for (name, value) in [
        ("--rent", filer.rent),
        ("--groceries", filer.groceries),
        ("--utilities", filer.utilities),
        ("--transport", filer.transport),
        ("--insurance", filer.insurance),
        ("--emergency-fund", filer.emergency_fund),
        ("--debt", filer.debt),
        ("--freedom-fund", filer.freedom_fund),
        ("--annual-bonus", filer.annual_bonus),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    Ok(UserInputs {
        gross_income: 0.0,
        frequency: filer.frequency.into(),
        country: filer.country.trim().to_ascii_uppercase(),
        sub_region: filer.sub_region.filter(|id| !id.trim().is_empty()),
        details: FilerDetails {
            age: filer.age,
            marital_status: if filer.married {
                MaritalStatus::Married
            } else {
                MaritalStatus::Single
            },
            church_tax: filer.church_tax,
            expatriate: filer.expatriate,
        },
        costs: PersonalCosts {
            rent: filer.rent,
            groceries: filer.groceries,
            utilities: filer.utilities,
            transport: filer.transport,
            insurance: filer.insurance,
            emergency_fund: filer.emergency_fund,
            debt: filer.debt,
            freedom_fund: filer.freedom_fund,
        },
        annual_bonus: filer.annual_bonus,
    })
}

fn load_table(path: Option<&PathBuf>) -> Result<Arc<RuleTable>, String> {
    match path {
        Some(path) => RuleTable::from_path(path)
            .map(Arc::new)
            .map_err(|e| format!("failed to load rules from {}: {e}", path.display())),
        None => Ok(Arc::new(RuleTable::builtin().clone())),
    }
}

/// Dispatches a parsed command line. One-shot commands print JSON to stdout.
pub async fn run(cli: Cli) -> Result<(), String> {
    let table = load_table(cli.rules.as_ref())?;

    match cli.command {
        Command::Net(args) => {
            let inputs = build_inputs(args.filer, args.gross)?;
            let result = table.calculate(&inputs).map_err(|e| e.to_string())?;
            print_json(&result)
        }
        Command::Gross(args) => {
            let (target_net, inputs) = solve_request_from_args(args)?;
            let solution = table
                .solve(target_net, &inputs)
                .map_err(|e| e.to_string())?;
            print_json(&solution)
        }
        Command::Countries => {
            let summaries: Vec<CountrySummary> = table.countries().map(Into::into).collect();
            print_json(&summaries)
        }
        Command::Serve { port } => run_http_server(port, table)
            .await
            .map_err(|e| format!("Server error: {e}")),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

pub fn router(table: Arc<RuleTable>) -> Router {
    Router::new()
        .route("/api/countries", get(countries_handler))
        .route(
            "/api/calculate",
            get(calculate_get_handler).post(calculate_post_handler),
        )
        .route("/api/solve", post(solve_handler))
        .fallback(not_found_handler)
        .with_state(table)
}

pub async fn run_http_server(port: u16, table: Arc<RuleTable>) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let jurisdictions = table.len();
    let app = router(table);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, jurisdictions, "netpay HTTP API listening");

    axum::serve(listener, app).await
}

async fn countries_handler(State(table): State<Arc<RuleTable>>) -> Response {
    let summaries: Vec<CountrySummary> = table.countries().map(Into::into).collect();
    json_response(StatusCode::OK, summaries)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn calculate_get_handler(
    State(table): State<Arc<RuleTable>>,
    Query(payload): Query<CalculatePayload>,
) -> Response {
    calculate_handler_impl(&table, payload)
}

async fn calculate_post_handler(
    State(table): State<Arc<RuleTable>>,
    Json(payload): Json<CalculatePayload>,
) -> Response {
    calculate_handler_impl(&table, payload)
}

fn calculate_handler_impl(table: &RuleTable, payload: CalculatePayload) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match table.calculate(&inputs) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => engine_error_response(err),
    }
}

async fn solve_handler(
    State(table): State<Arc<RuleTable>>,
    Json(payload): Json<SolvePayload>,
) -> Response {
    let (target_net, inputs) = match solve_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match table.solve(target_net, &inputs) {
        Ok(solution) => json_response(StatusCode::OK, solution),
        Err(err) => engine_error_response(err),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn engine_error_response(err: EngineError) -> Response {
    match err {
        EngineError::UnknownJurisdiction(_) => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

#[cfg(test)]
fn inputs_from_json(json: &str) -> Result<UserInputs, String> {
    let payload = serde_json::from_str::<CalculatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload)
}

fn inputs_from_payload(payload: CalculatePayload) -> Result<UserInputs, String> {
    let mut filer = default_filer_for_api();
    let mut gross_income = DEFAULT_API_GROSS;

    if let Some(v) = payload.country {
        filer.country = v;
    }
    if let Some(v) = payload.sub_region {
        filer.sub_region = Some(v);
    }
    if let Some(v) = payload.gross_income {
        gross_income = v;
    }
    if let Some(v) = payload.frequency {
        filer.frequency = v.into();
    }
    if let Some(v) = payload.age {
        filer.age = Some(v);
    }
    if let Some(v) = payload.marital_status {
        filer.married = v == ApiMaritalStatus::Married;
    }
    if let Some(v) = payload.church_tax {
        filer.church_tax = v;
    }
    if let Some(v) = payload.expatriate {
        filer.expatriate = v;
    }
    if let Some(v) = payload.rent {
        filer.rent = v;
    }
    if let Some(v) = payload.groceries {
        filer.groceries = v;
    }
    if let Some(v) = payload.utilities {
        filer.utilities = v;
    }
    if let Some(v) = payload.transport {
        filer.transport = v;
    }
    if let Some(v) = payload.insurance {
        filer.insurance = v;
    }
    if let Some(v) = payload.emergency_fund {
        filer.emergency_fund = v;
    }
    if let Some(v) = payload.debt {
        filer.debt = v;
    }
    if let Some(v) = payload.freedom_fund {
        filer.freedom_fund = v;
    }
    if let Some(v) = payload.annual_bonus {
        filer.annual_bonus = v;
    }

    build_inputs(filer, gross_income).map_err(|msg| msg.replace("--gross", "grossIncome"))
}

fn solve_request_from_payload(payload: SolvePayload) -> Result<(f64, UserInputs), String> {
    let Some(target_net) = payload.target_net else {
        return Err("targetNet is required".to_string());
    };
    if !target_net.is_finite() {
        return Err("targetNet must be a finite number".to_string());
    }
    let inputs = inputs_from_payload(payload.filer)?;
    Ok((target_net, inputs))
}

const DEFAULT_API_GROSS: f64 = 60_000.0;

fn default_filer_for_api() -> FilerArgs {
    FilerArgs {
        country: "US".to_string(),
        sub_region: None,
        frequency: CliFrequency::Annual,
        age: None,
        married: false,
        church_tax: false,
        expatriate: false,
        rent: 0.0,
        groceries: 0.0,
        utilities: 0.0,
        transport: 0.0,
        insurance: 0.0,
        emergency_fund: 0.0,
        debt: 0.0,
        freedom_fund: 0.0,
        annual_bonus: 0.0,
    }
}
