mod payload;

use axum::{
    Router,
    body::Bytes,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tokio::net::TcpListener;

use crate::core::{
    FireAssessment, FireError, MAX_AGE, SimulationInput, SimulationOutput, evaluate_fire,
    random_events::{RandomEventDraw, draw_event, inject},
    retirement_target_growing_annuity, retirement_target_traditional_25x, simulate,
};

pub use payload::{
    RetirementTargetRequest, life_plan_from_value, life_plan_to_value,
    simulation_input_from_slice, simulation_input_from_value,
};
use payload::{RandomEventPayload, RetirementTargetPayload, parse_object};

#[derive(Parser, Debug)]
#[command(
    name = "fire-planner",
    about = "Deterministic FIRE projection: monthly cash flow, mortgage, withdrawals and FIRE targets"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP.
    Serve {
        #[arg(long, env = "FIRE_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Run one projection from a JSON bundle and print the result.
    Simulate {
        #[arg(long, help = "Path to the JSON bundle; reads stdin when omitted")]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the retirement targets for today's expense.
    Target(TargetArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    #[arg(long, default_value_t = 30_000.0)]
    pub monthly_expense: f64,
    #[arg(long, default_value_t = 25)]
    pub current_age: u32,
    #[arg(long, default_value_t = 65)]
    pub retirement_age: u32,
    #[arg(long, default_value_t = 85)]
    pub life_expectancy: u32,
    #[arg(long, default_value_t = 3.0, help = "Annual inflation in percent, e.g. 3")]
    pub inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Annual conservative return used as discount rate, in percent"
    )]
    pub conservative_return_rate: f64,
}

fn build_target_request(args: &TargetArgs) -> Result<RetirementTargetRequest, String> {
    if !args.monthly_expense.is_finite() || args.monthly_expense < 0.0 {
        return Err("--monthly-expense must be >= 0".to_string());
    }

    if args.retirement_age < args.current_age {
        return Err("--retirement-age must be >= --current-age".to_string());
    }

    if args.life_expectancy <= args.retirement_age {
        return Err("--life-expectancy must be > --retirement-age".to_string());
    }

    if args.life_expectancy > MAX_AGE {
        return Err(format!("--life-expectancy must be <= {MAX_AGE}"));
    }

    if !(-99.0..=100.0).contains(&args.inflation_rate) {
        return Err("--inflation-rate must be between -99 and 100".to_string());
    }

    if !(-99.0..=100.0).contains(&args.conservative_return_rate) {
        return Err("--conservative-return-rate must be between -99 and 100".to_string());
    }

    Ok(RetirementTargetRequest {
        monthly_expense: args.monthly_expense,
        current_age: args.current_age,
        retirement_age: args.retirement_age,
        life_expectancy: args.life_expectancy,
        inflation_rate: args.inflation_rate / 100.0,
        real_return_rate: args.conservative_return_rate / 100.0,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetResponse {
    pub retirement_target: f64,
    pub traditional_target: f64,
}

pub fn retirement_targets(request: &RetirementTargetRequest) -> TargetResponse {
    TargetResponse {
        retirement_target: retirement_target_growing_annuity(
            request.monthly_expense,
            request.current_age,
            request.retirement_age,
            request.life_expectancy,
            request.inflation_rate,
            request.real_return_rate,
        ),
        traditional_target: retirement_target_traditional_25x(
            request.monthly_expense,
            request.current_age,
            request.retirement_age,
            request.inflation_rate,
        ),
    }
}

#[derive(Debug, Serialize)]
struct ProjectionReport<'a> {
    simulation: &'a SimulationOutput,
    fire: &'a FireAssessment,
}

pub async fn run_cli(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Simulate { input, pretty } => {
            let body = match input {
                Some(path) => std::fs::read(&path)
                    .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin()
                        .read_to_end(&mut buf)
                        .map_err(|e| format!("failed to read stdin: {e}"))?;
                    buf
                }
            };
            let input = simulation_input_from_slice(&body).map_err(|e| e.to_string())?;
            let output = simulate(&input).map_err(|e| e.to_string())?;
            let fire = evaluate_fire(&output.yearly, &input.person, &input.investment);
            let report = ProjectionReport {
                simulation: &output,
                fire: &fire,
            };
            print_json(&report, pretty)
        }
        Command::Target(args) => {
            let request = build_target_request(&args)?;
            print_json(&retirement_targets(&request), true)
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| format!("failed to serialize output: {e}"))?;
    println!("{text}");
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/simulate", post(simulate_handler))
        .route("/api/fire-check", post(fire_check_handler))
        .route("/api/retirement-target", post(retirement_target_handler))
        .route("/api/random-event", post(random_event_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("FIRE HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, router()).await
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct RandomEventResponse {
    event: RandomEventDraw,
    life_planning: serde_json::Value,
}

impl IntoResponse for FireError {
    fn into_response(self) -> Response {
        match &self {
            FireError::InvalidRequest(msg) => {
                log::warn!("rejected request: {msg}");
                error_response(StatusCode::BAD_REQUEST, &self.to_string())
            }
            FireError::ComputationFailed(msg) => {
                log::error!("computation failed: {msg}");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string())
            }
        }
    }
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(body: Bytes) -> Response {
    let started = Instant::now();
    let result = match simulation_input_from_slice(&body) {
        Ok(input) => run_blocking(move || simulate(&input)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => {
            log::info!(
                "simulate: {} months, {} years in {:?}",
                output.monthly.len(),
                output.yearly.len(),
                started.elapsed()
            );
            json_response(StatusCode::OK, output)
        }
        Err(e) => e.into_response(),
    }
}

async fn fire_check_handler(body: Bytes) -> Response {
    let started = Instant::now();
    let result = match simulation_input_from_slice(&body) {
        Ok(input) => run_blocking(move || assess(&input)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(assessment) => {
            log::info!(
                "fire-check: growing {:?}, traditional {:?} in {:?}",
                assessment.fire_age_growing,
                assessment.fire_age_traditional,
                started.elapsed()
            );
            json_response(StatusCode::OK, assessment)
        }
        Err(e) => e.into_response(),
    }
}

async fn retirement_target_handler(body: Bytes) -> Response {
    match parse_object::<RetirementTargetPayload>(&body) {
        Ok(payload) => {
            let request = payload.into_request();
            json_response(StatusCode::OK, retirement_targets(&request))
        }
        Err(e) => e.into_response(),
    }
}

async fn random_event_handler(body: Bytes) -> Response {
    match random_event_response(&body) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => e.into_response(),
    }
}

/// Simulates and evaluates in one pass.
pub fn assess(input: &SimulationInput) -> Result<FireAssessment, FireError> {
    let output = simulate(input)?;
    Ok(evaluate_fire(&output.yearly, &input.person, &input.investment))
}

fn random_event_response(body: &[u8]) -> Result<RandomEventResponse, FireError> {
    let payload = parse_object::<RandomEventPayload>(body)?;
    let current_age = payload.current_age.unwrap_or(25);
    let retirement_age = payload.retirement_age.unwrap_or(65);
    let mut plan = life_plan_from_value(payload.life_planning.as_ref());

    let event = match payload.seed {
        Some(seed) => draw_event(
            &mut StdRng::seed_from_u64(u64::from(seed)),
            current_age,
            retirement_age,
        ),
        None => draw_event(&mut rand::thread_rng(), current_age, retirement_age),
    };
    inject(&mut plan, &event);
    log::info!(
        "random event: {:?} at age {} ({})",
        event.category,
        event.trigger_age,
        event.amount
    );

    Ok(RandomEventResponse {
        event,
        life_planning: life_plan_to_value(&plan),
    })
}

/// Runs a projection off the async workers. A panicking job surfaces as
/// `ComputationFailed`, never as a partial result.
async fn run_blocking<T, F>(job: F) -> Result<T, FireError>
where
    F: FnOnce() -> Result<T, FireError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| FireError::ComputationFailed(e.to_string()))?
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_target_args() -> TargetArgs {
        TargetArgs {
            monthly_expense: 30_000.0,
            current_age: 25,
            retirement_age: 65,
            life_expectancy: 85,
            inflation_rate: 3.0,
            conservative_return_rate: 3.0,
        }
    }

    const SMOKE_BUNDLE: &str = r#"{
        "player_status": {"age": 25, "monthly_income": 30000, "monthly_expense": 25000, "savings": 0, "debt": 0},
        "investment_config": {
            "retirement_age": 65, "life_expectancy": 85, "inflation_rate": 0.03,
            "young_cash_reserve_ratio": 1.0, "middle_cash_reserve_ratio": 1.0, "old_cash_reserve_ratio": 1.0,
            "growth_return_rate": 0.07, "conservative_return_rate": 0.03, "cash_return": 0.0
        },
        "salary_config": {"young_growth_rate": 0.05},
        "life_planning": {"30": [{"type": "house purchase", "house_data": {"house_price": 15000000, "down_payment_ratio": 20, "loan_rate": 0.03, "loan_years": 30}}]}
    }"#;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("body is JSON")
    }

    #[test]
    fn build_target_request_converts_percentages() {
        let request = build_target_request(&sample_target_args()).expect("valid args");
        assert_approx(request.inflation_rate, 0.03);
        assert_approx(request.real_return_rate, 0.03);
    }

    #[test]
    fn build_target_request_rejects_inverted_horizon() {
        let mut args = sample_target_args();
        args.life_expectancy = 60;
        let err = build_target_request(&args).expect_err("must reject horizon");
        assert!(err.contains("--life-expectancy"));

        let mut args = sample_target_args();
        args.retirement_age = 20;
        let err = build_target_request(&args).expect_err("must reject retirement age");
        assert!(err.contains("--retirement-age"));
    }

    #[test]
    fn build_target_request_rejects_unbounded_horizon() {
        let mut args = sample_target_args();
        args.life_expectancy = 4_000_000_000;
        let err = build_target_request(&args).expect_err("must reject horizon");
        assert!(err.contains("<= 150"));
    }

    #[test]
    fn build_target_request_rejects_negative_expense() {
        let mut args = sample_target_args();
        args.monthly_expense = -1.0;
        let err = build_target_request(&args).expect_err("must reject expense");
        assert!(err.contains("--monthly-expense"));
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["fire-planner", "serve", "--port", "9000"]).expect("parses");
        assert!(matches!(cli.command, Command::Serve { port: 9000 }));

        let cli = Cli::try_parse_from([
            "fire-planner",
            "target",
            "--monthly-expense",
            "20000",
            "--inflation-rate",
            "2.5",
        ])
        .expect("parses");
        let Command::Target(args) = cli.command else {
            panic!("expected target subcommand");
        };
        assert_approx(args.monthly_expense, 20_000.0);
        assert_approx(args.inflation_rate, 2.5);
        assert_eq!(args.retirement_age, 65);

        let cli = Cli::try_parse_from(["fire-planner", "simulate", "--pretty"]).expect("parses");
        assert!(matches!(
            cli.command,
            Command::Simulate {
                input: None,
                pretty: true
            }
        ));
    }

    #[test]
    fn retirement_targets_match_calculator_defaults() {
        let request = build_target_request(&sample_target_args()).expect("valid args");
        let targets = retirement_targets(&request);
        let annual = 30_000.0 * 12.0 * 1.03_f64.powi(40);
        assert_approx(targets.traditional_target, annual * 25.0);
        assert_approx(targets.retirement_target, annual * 20.0 / 1.03);
    }

    #[tokio::test]
    async fn simulate_endpoint_returns_series_and_log() {
        let response = simulate_handler(Bytes::from_static(SMOKE_BUNDLE.as_bytes())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let json = body_json(response).await;
        let monthly = json["financial_results"].as_array().expect("monthly series");
        assert_eq!(monthly.len(), 720);
        assert_eq!(monthly[60]["age"], 30);
        assert_eq!(monthly[60]["month"], 1);
        assert_approx(
            monthly[60]["debt"].as_f64().expect("debt"),
            12_000_000.0 - 12_000_000.0 / 360.0,
        );
        assert!(json["simulation_results"]["64"]["stock_investment"].is_number());
        assert_eq!(json["simulation_results"]["64"]["yearly_withdrawn"], 0.0);
        assert!(json["event_log"].as_array().expect("log").len() >= 3);
    }

    #[tokio::test]
    async fn simulate_endpoint_rejects_invalid_json() {
        let response = simulate_handler(Bytes::from_static(b"{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().expect("message").contains("Invalid request"));
    }

    #[tokio::test]
    async fn simulate_endpoint_reports_computation_failures() {
        let body = r#"{"player_status": {"age": 25, "monthly_expense": 1000},
                       "investment_config": {"inflation_rate": 1e300, "retirement_age": 28, "life_expectancy": 29}}"#;
        let response = simulate_handler(Bytes::from(body.to_string())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().expect("message").contains("Computation failed"));
    }

    #[tokio::test]
    async fn simulate_endpoint_clamps_unbounded_horizon() {
        let body = r#"{"investment_config": {"retirement_age": 4000000000, "life_expectancy": 4000000000}}"#;
        let response = simulate_handler(Bytes::from(body.to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;

        let months = json["financial_results"].as_array().expect("monthly series").len();
        assert_eq!(months, ((MAX_AGE - 25) * 12) as usize);
        assert!(json["simulation_results"][MAX_AGE.to_string()].is_null());
    }

    #[tokio::test]
    async fn fire_check_endpoint_returns_assessment() {
        let response = fire_check_handler(Bytes::from_static(SMOKE_BUNDLE.as_bytes())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;

        assert!(json["fire_target_growing"].as_f64().expect("target") > 0.0);
        assert!(json["fire_target_traditional"].as_f64().expect("target") > 0.0);
        assert_eq!(json["retirement_status"]["age"], 65);
        assert!(json["achievements"].is_array());
        assert!(json.get("fire_age_growing").is_some());
    }

    #[tokio::test]
    async fn retirement_target_endpoint_uses_defaults() {
        let response = retirement_target_handler(Bytes::from_static(b"{}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let expected = retirement_targets(&RetirementTargetRequest {
            monthly_expense: 30_000.0,
            current_age: 25,
            retirement_age: 65,
            life_expectancy: 85,
            inflation_rate: 0.03,
            real_return_rate: 0.03,
        });
        assert_approx(
            json["retirement_target"].as_f64().expect("target"),
            expected.retirement_target,
        );
    }

    #[tokio::test]
    async fn random_event_endpoint_injects_seeded_draw() {
        let body = r#"{"current_age": 30, "retirement_age": 40, "seed": 5,
                       "life_planning": {"32": [{"type": "marriage"}]}}"#;
        let response = random_event_handler(Bytes::from(body.to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;

        let age = json["event"]["trigger_age"].as_u64().expect("age") as u32;
        assert!((30..40).contains(&age));
        assert!(json["event"]["amount"].as_f64().expect("amount") < 0.0);
        let injected = json["life_planning"][age.to_string()]
            .as_array()
            .expect("events at trigger age");
        assert_eq!(
            injected.last().expect("injected")["type"],
            "random_event"
        );
        assert_eq!(json["life_planning"]["32"][0]["type"], "marriage");
    }

    #[tokio::test]
    async fn random_event_endpoint_rejects_non_object() {
        let response = random_event_handler(Bytes::from_static(b"[]")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_and_fallback_respond_with_json() {
        let response = health_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");

        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
