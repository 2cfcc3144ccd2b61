//! Endpoint handlers.
//!
//! Each handler validates its parameters, runs the provider work on the
//! blocking pool, and projects the result into a response model. Failures are
//! returned as RFC 9457 problem details carrying the request ID.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::{error, info};

use f1data_lib::{
    driver_performance, select_lap, team_analysis, LoadOptions, Result as LibResult, SessionKind,
};
use f1data_service_shared::{
    from_lib_error, record_events_skipped, record_provider_call, record_provider_failure,
    record_rows_returned, AppState, LapTimesQuery, ProblemDetails, ProblemKind, RequestId,
    RoundPath, SeasonPath, SessionPath, TelemetryPath, TelemetryQuery, Validate,
};

use crate::models::{
    CalendarResponse, ConstructorStandingDto, DriverPerformanceResponse, DriverStandingDto,
    DriversResponse, LapDto, LapTelemetryDto, LapTimesResponse, ResultDto, ServiceInfo,
    SessionResponse, StandingsResponse, TeamAnalysisResponse, TelemetryResponse,
};

type ApiResult<T> = Result<Json<T>, ProblemDetails>;

/// Round whose race defines a season's driver line-up.
const LINEUP_ROUND: u32 = 1;

fn path_params<T>(
    path: Result<Path<T>, PathRejection>,
    request_id: &RequestId,
) -> Result<T, ProblemDetails> {
    path.map(|Path(params)| params).map_err(|rejection| {
        ProblemDetails::bad_request(rejection.body_text(), request_id.as_str())
    })
}

fn query_params<T>(
    query: Result<Query<T>, QueryRejection>,
    request_id: &RequestId,
) -> Result<T, ProblemDetails> {
    query.map(|Query(params)| params).map_err(|rejection| {
        ProblemDetails::bad_request(rejection.body_text(), request_id.as_str())
    })
}

fn validated<T: Validate>(params: T, request_id: &RequestId) -> Result<T, ProblemDetails> {
    params.validate(request_id.as_str()).map_err(|problem| *problem)?;
    Ok(params)
}

/// Run provider work on the blocking pool and map its failure to a problem.
///
/// `operation` labels metrics and logs; `thing` completes the
/// "Failed to fetch <thing>" detail of provider errors.
async fn run_provider<T, F>(
    operation: &'static str,
    thing: &'static str,
    request_id: &RequestId,
    work: F,
) -> Result<T, ProblemDetails>
where
    F: FnOnce() -> LibResult<T> + Send + 'static,
    T: Send + 'static,
{
    let started = Instant::now();
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => {
            record_provider_call(operation, started.elapsed());
            Ok(value)
        }
        Ok(Err(err)) => {
            let problem = from_lib_error(&err, thing, request_id.as_str());
            error!(
                request_id = %request_id,
                operation,
                error = %err,
                status = problem.status,
                "provider call failed"
            );
            record_provider_failure(operation, problem.kind.metric_reason());
            Err(problem)
        }
        Err(join_error) => {
            error!(
                request_id = %request_id,
                operation,
                error = %join_error,
                "provider task did not complete"
            );
            record_provider_failure(operation, ProblemKind::Internal.metric_reason());
            Err(ProblemDetails::internal_error(
                format!("Failed to fetch {}: worker task did not complete", thing),
                request_id.as_str(),
            ))
        }
    }
}

/// `GET /`
pub async fn root() -> Json<ServiceInfo> {
    let endpoints = BTreeMap::from([
        ("/health", "Service and provider health"),
        ("/drivers/{year}", "Driver line-up of a season's first race"),
        (
            "/telemetry/{year}/{round}/{driver}",
            "Car telemetry for one lap (?lap_number=, default fastest)",
        ),
        ("/lap-times/{year}/{round}", "Race lap times (?driver= to filter)"),
        (
            "/session/{year}/{round}/{session_type}",
            "Session results (FP1, FP2, FP3, Q, SQ, S, R)",
        ),
        ("/championship-standings/{year}", "Driver and constructor standings"),
        ("/driver-performance/{year}", "Per-race driver performance across a season"),
        ("/race-calendar/{year}", "Season event schedule"),
        ("/team-analysis/{year}", "Per-team aggregates across a season"),
        ("/metrics", "Prometheus metrics"),
    ]);

    Json(ServiceInfo {
        service: "F1 Data API",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        endpoints,
    })
}

/// `GET /drivers/{year}`
pub async fn drivers(
    State(state): State<AppState>,
    request_id: RequestId,
    path: Result<Path<SeasonPath>, PathRejection>,
) -> ApiResult<DriversResponse> {
    let SeasonPath { year } = validated(path_params(path, &request_id)?, &request_id)?;
    info!(request_id = %request_id, year, "fetching drivers");

    let provider = state.provider();
    let session = run_provider("drivers", "drivers", &request_id, move || {
        provider.load_session(
            year,
            LINEUP_ROUND,
            SessionKind::Race,
            LoadOptions::results_only(),
        )
    })
    .await?;

    let response = DriversResponse::new(year, &session.drivers);
    record_rows_returned("drivers", response.driver_count);
    Ok(Json(response))
}

/// `GET /telemetry/{year}/{round}/{driver}?lap_number=`
pub async fn telemetry(
    State(state): State<AppState>,
    request_id: RequestId,
    path: Result<Path<TelemetryPath>, PathRejection>,
    query: Result<Query<TelemetryQuery>, QueryRejection>,
) -> ApiResult<TelemetryResponse> {
    let TelemetryPath {
        year,
        round,
        driver,
    } = validated(path_params(path, &request_id)?, &request_id)?;
    let TelemetryQuery { lap_number } =
        validated(query_params(query, &request_id)?, &request_id)?;
    info!(
        request_id = %request_id,
        year,
        round,
        driver = %driver,
        lap_number,
        "fetching telemetry"
    );

    let provider = state.provider();
    let code = driver.clone();
    let (samples, data) = run_provider("telemetry", "telemetry", &request_id, move || {
        let session =
            provider.load_session(year, round, SessionKind::Race, LoadOptions::with_laps())?;
        let lap = select_lap(&session, &code, lap_number)?;
        let car_data = provider.car_data(&session, lap)?;
        Ok((car_data.len(), LapTelemetryDto::new(lap, &car_data)))
    })
    .await?;

    record_rows_returned("telemetry", samples);
    Ok(Json(TelemetryResponse {
        year,
        round,
        driver,
        data,
    }))
}

/// `GET /lap-times/{year}/{round}?driver=`
pub async fn lap_times(
    State(state): State<AppState>,
    request_id: RequestId,
    path: Result<Path<RoundPath>, PathRejection>,
    query: Result<Query<LapTimesQuery>, QueryRejection>,
) -> ApiResult<LapTimesResponse> {
    let RoundPath { year, round } = validated(path_params(path, &request_id)?, &request_id)?;
    let LapTimesQuery { driver } =
        validated(query_params(query, &request_id)?, &request_id)?;
    info!(request_id = %request_id, year, round, driver = ?driver, "fetching lap times");

    let provider = state.provider();
    let filter = driver.clone();
    let laps = run_provider("lap_times", "lap times", &request_id, move || {
        let session =
            provider.load_session(year, round, SessionKind::Race, LoadOptions::with_laps())?;
        let laps: Vec<LapDto> = match &filter {
            Some(code) => session.laps_for(code).map(LapDto::from).collect(),
            None => session.laps.iter().map(LapDto::from).collect(),
        };
        Ok(laps)
    })
    .await?;

    record_rows_returned("lap_times", laps.len());
    Ok(Json(LapTimesResponse {
        year,
        round,
        driver_filter: driver,
        lap_count: laps.len(),
        laps,
    }))
}

/// `GET /session/{year}/{round}/{session_type}`
pub async fn session(
    State(state): State<AppState>,
    request_id: RequestId,
    path: Result<Path<SessionPath>, PathRejection>,
) -> ApiResult<SessionResponse> {
    let params = validated(path_params(path, &request_id)?, &request_id)?;
    let kind = params.kind().ok_or_else(|| {
        ProblemDetails::bad_request(
            format!("unsupported session type '{}'", params.session_type),
            request_id.as_str(),
        )
    })?;
    let (year, round) = (params.year, params.round);
    info!(
        request_id = %request_id,
        year,
        round,
        session = kind.code(),
        "fetching session data"
    );

    let provider = state.provider();
    let session = run_provider("session", "session data", &request_id, move || {
        provider.load_session(year, round, kind, LoadOptions::results_only())
    })
    .await?;

    let results: Vec<ResultDto> = session.results.iter().map(ResultDto::from).collect();
    record_rows_returned("session", results.len());
    Ok(Json(SessionResponse {
        year,
        round,
        session_type: kind.code().to_string(),
        event_name: session.event.name,
        location: session.event.location,
        country: session.event.country,
        results,
    }))
}

/// `GET /championship-standings/{year}`
pub async fn championship_standings(
    State(state): State<AppState>,
    request_id: RequestId,
    path: Result<Path<SeasonPath>, PathRejection>,
) -> ApiResult<StandingsResponse> {
    let SeasonPath { year } = validated(path_params(path, &request_id)?, &request_id)?;
    info!(request_id = %request_id, year, "fetching championship standings");

    let provider = state.provider();
    let (drivers, constructors) = run_provider("standings", "standings", &request_id, move || {
        Ok((provider.driver_standings(year)?, provider.constructor_standings(year)?))
    })
    .await?;

    Ok(Json(StandingsResponse {
        year,
        driver_standings: drivers.iter().map(DriverStandingDto::from).collect(),
        constructor_standings: constructors.iter().map(ConstructorStandingDto::from).collect(),
    }))
}

/// `GET /driver-performance/{year}`
pub async fn driver_performance_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    path: Result<Path<SeasonPath>, PathRejection>,
) -> ApiResult<DriverPerformanceResponse> {
    let SeasonPath { year } = validated(path_params(path, &request_id)?, &request_id)?;
    info!(request_id = %request_id, year, "computing driver performance");

    let provider = state.provider();
    let season = run_provider(
        "driver_performance",
        "driver performance",
        &request_id,
        move || driver_performance(provider.as_ref(), year),
    )
    .await?;

    record_events_skipped("driver_performance", season.skipped_rounds.len());
    record_rows_returned("driver_performance", season.records.len());
    Ok(Json(DriverPerformanceResponse::from(&season)))
}

/// `GET /race-calendar/{year}`
pub async fn race_calendar(
    State(state): State<AppState>,
    request_id: RequestId,
    path: Result<Path<SeasonPath>, PathRejection>,
) -> ApiResult<CalendarResponse> {
    let SeasonPath { year } = validated(path_params(path, &request_id)?, &request_id)?;
    info!(request_id = %request_id, year, "fetching race calendar");

    let provider = state.provider();
    let events = run_provider("race_calendar", "race calendar", &request_id, move || {
        provider.event_schedule(year)
    })
    .await?;

    record_rows_returned("race_calendar", events.len());
    Ok(Json(CalendarResponse::new(year, &events)))
}

/// `GET /team-analysis/{year}`
pub async fn team_analysis_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    path: Result<Path<SeasonPath>, PathRejection>,
) -> ApiResult<TeamAnalysisResponse> {
    let SeasonPath { year } = validated(path_params(path, &request_id)?, &request_id)?;
    info!(request_id = %request_id, year, "computing team analysis");

    let provider = state.provider();
    let season = run_provider("team_analysis", "team analysis", &request_id, move || {
        team_analysis(provider.as_ref(), year)
    })
    .await?;

    record_events_skipped("team_analysis", season.skipped_rounds.len());
    record_rows_returned("team_analysis", season.teams.len());
    Ok(Json(TeamAnalysisResponse::from(&season)))
}
