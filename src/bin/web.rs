//! Single binary web server: JSON API over the player registry and Swiss tournaments.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT.
//! Data lives in DATA_DIR (default `data/`) and is saved after every change.

use actix_web::{
    get, post,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::RwLock;
use swiss_tournament::{
    generate_next_round_with, register_outcome, report, start_current_round, Config,
    PairingSettings, Player, PlayerId, Points, Store, StoreError, Tournament, TournamentError,
};

/// Settings handlers read while changing the store.
#[derive(Clone, Copy)]
struct Settings {
    pairing: PairingSettings,
    default_total_rounds: usize,
}

/// In-memory store plus where to persist it.
struct AppData {
    store: Store,
    data_dir: PathBuf,
    settings: Settings,
}

type AppState = Data<RwLock<AppData>>;

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct CreatePlayerBody {
    national_id: String,
    first_name: String,
    last_name: String,
    birth_date: NaiveDate,
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    name: String,
    location: String,
    begin_date: NaiveDate,
    end_date: NaiveDate,
    total_rounds: Option<usize>,
}

#[derive(Deserialize)]
struct AddParticipantBody {
    player_id: PlayerId,
}

#[derive(Deserialize)]
struct OutcomeBody {
    /// Result of the first participant of the match.
    result: Points,
}

#[derive(Deserialize)]
struct TournamentPath {
    id: usize,
}

#[derive(Deserialize)]
struct RoundPath {
    id: usize,
    round: usize,
}

#[derive(Deserialize)]
struct MatchPath {
    id: usize,
    round: usize,
    game: usize,
}

fn error_response(e: &TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        TournamentError::UnknownTournament(_) | TournamentError::UnknownPlayer(_) => {
            HttpResponse::NotFound().json(body)
        }
        _ => HttpResponse::BadRequest().json(body),
    }
}

/// Apply `change` and save. A refused change or a failed save leaves the
/// store as it was, so the response always matches the state in memory.
fn commit<T, C, R>(state: &AppState, change: C, respond: R) -> HttpResponse
where
    C: FnOnce(&mut Store, &Settings) -> Result<T, TournamentError>,
    R: FnOnce(&Store, T) -> HttpResponse,
{
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let app = &mut *g;
    let settings = app.settings;
    match app.store.commit(&app.data_dir, |store| change(store, &settings)) {
        Ok(value) => respond(&app.store, value),
        Err(StoreError::Rejected(e)) => error_response(&e),
        Err(e) => {
            log::error!("Saving to {} failed: {}", app.data_dir.display(), e);
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

/// Run a mutation on one tournament, save, and answer with the tournament.
fn mutate_tournament<F>(state: &AppState, id: usize, f: F) -> HttpResponse
where
    F: FnOnce(&mut Tournament, &PairingSettings) -> Result<(), TournamentError>,
{
    commit(
        state,
        |store, settings| f(store.tournament_mut(id)?, &settings.pairing),
        |store, ()| HttpResponse::Ok().json(&store.tournaments[id]),
    )
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "swiss-tournament",
    })
}

/// All players, alphabetically.
#[get("/api/players")]
async fn api_list_players(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    HttpResponse::Ok().json(report::players_alphabetical(&g.store.players))
}

#[post("/api/players")]
async fn api_create_player(state: AppState, body: Json<CreatePlayerBody>) -> HttpResponse {
    let body = body.into_inner();
    let player = Player::new(
        body.national_id,
        body.first_name.trim(),
        body.last_name.trim(),
        body.birth_date,
    );
    commit(
        &state,
        |store, _| store.add_player(player),
        |store, id| HttpResponse::Ok().json(store.player(id)),
    )
}

/// Tournaments with their ids, by begin date.
#[get("/api/tournaments")]
async fn api_list_tournaments(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let list: Vec<_> = report::find_by_name(&g.store.tournaments, "")
        .into_iter()
        .map(|(id, t)| {
            serde_json::json!({
                "id": id,
                "name": t.name,
                "location": t.location,
                "begin_date": t.begin_date,
                "end_date": t.end_date,
                "started": t.is_started(),
                "ended": t.is_ended(),
            })
        })
        .collect();
    HttpResponse::Ok().json(list)
}

#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    let body = body.into_inner();
    commit(
        &state,
        |store, settings| {
            let tournament = Tournament::new(
                body.name.trim(),
                body.location.trim(),
                body.begin_date,
                body.end_date,
                body.total_rounds.unwrap_or(settings.default_total_rounds),
            );
            store.add_tournament(tournament)
        },
        |store, id| {
            log::info!("Created tournament {} ({})", id, store.tournaments[id]);
            HttpResponse::Ok().json(serde_json::json!({ "id": id, "tournament": store.tournaments[id] }))
        },
    )
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.store.tournament(path.id) {
        Ok(t) => HttpResponse::Ok().json(serde_json::json!({
            "tournament": t,
            "total_started_rounds": t.total_started_rounds(),
            "total_finished_rounds": t.total_finished_rounds(),
            "total_matches": t.total_matches(),
            "total_finished_matches": t.total_finished_matches(),
            "is_started": t.is_started(),
            "is_ended": t.is_ended(),
        })),
        Err(e) => error_response(&e),
    }
}

/// Enroll a registered player (tournament must not have started).
#[post("/api/tournaments/{id}/participants")]
async fn api_add_participant(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<AddParticipantBody>,
) -> HttpResponse {
    let (id, player) = (path.id, body.player_id);
    commit(
        &state,
        |store, _| store.enroll(id, player),
        |store, ()| HttpResponse::Ok().json(&store.tournaments[id]),
    )
}

/// Generate the next round's pairings.
#[post("/api/tournaments/{id}/rounds")]
async fn api_generate_round(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    mutate_tournament(&state, path.id, |t, pairing| {
        generate_next_round_with(t, pairing, &mut rand::thread_rng())
    })
}

#[post("/api/tournaments/{id}/rounds/start")]
async fn api_start_round(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    mutate_tournament(&state, path.id, |t, _| start_current_round(t))
}

/// Summary of one round, with player names.
#[get("/api/tournaments/{id}/rounds/{round}")]
async fn api_get_round(state: AppState, path: Path<RoundPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let t = match g.store.tournament(path.id) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = t.get_round_matches(path.round) {
        return error_response(&e);
    }
    let summary = report::round_summaries(t, &g.store.players).swap_remove(path.round);
    HttpResponse::Ok().json(summary)
}

#[post("/api/tournaments/{id}/rounds/{round}/matches/{game}/outcome")]
async fn api_register_outcome(
    state: AppState,
    path: Path<MatchPath>,
    body: Json<OutcomeBody>,
) -> HttpResponse {
    let (round, game, result) = (path.round, path.game, body.result);
    mutate_tournament(&state, path.id, |t, _| register_outcome(t, round, game, result))
}

#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.store.tournament(path.id) {
        Ok(t) => HttpResponse::Ok().json(report::standings(t, &g.store.players)),
        Err(e) => error_response(&e),
    }
}

#[get("/api/tournaments/{id}/standings.csv")]
async fn api_standings_csv(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let t = match g.store.tournament(path.id) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };
    let mut buf = Vec::new();
    match report::write_standings_csv(t, &g.store.players, &mut buf) {
        Ok(()) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .body(buf),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

/// Tournaments running today, upcoming, or finished.
#[get("/api/tournaments/timing/{timing}")]
async fn api_tournaments_by_timing(state: AppState, path: Path<String>) -> HttpResponse {
    let timing = match path.as_str() {
        "past" => report::Timing::Past,
        "ongoing" => report::Timing::Ongoing,
        "future" => report::Timing::Future,
        other => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({ "error": format!("Unknown timing {}", other) }))
        }
    };
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let today = Utc::now().date_naive();
    let list: Vec<_> = report::by_timing(&g.store.tournaments, timing, today)
        .into_iter()
        .map(|(id, t)| serde_json::json!({ "id": id, "name": t.name, "location": t.location }))
        .collect();
    HttpResponse::Ok().json(list)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let store = match Store::load(&config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Cannot load data from {}: {}", config.data_dir.display(), e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };
    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(RwLock::new(AppData {
        store,
        data_dir: config.data_dir,
        settings: Settings {
            pairing: config.pairing,
            default_total_rounds: config.default_total_rounds,
        },
    }));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_list_players)
            .service(api_create_player)
            .service(api_list_tournaments)
            .service(api_create_tournament)
            .service(api_tournaments_by_timing)
            .service(api_get_tournament)
            .service(api_add_participant)
            .service(api_generate_round)
            .service(api_start_round)
            .service(api_get_round)
            .service(api_register_outcome)
            .service(api_standings_csv)
            .service(api_standings)
    })
    .bind(bind)?
    .run()
    .await
}
