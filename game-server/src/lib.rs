use std::sync::Arc;

use warp::Filter;

use crate::orchestrator::MatchOrchestrator;

pub mod auth;
pub mod config;
pub mod history;
pub mod matchmaking;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod websocket;

pub fn create_routes(
    orchestrator: Arc<MatchOrchestrator>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let orchestrator_filter = warp::any().map(move || orchestrator.clone());

    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(orchestrator_filter)
        .map(|ws: warp::ws::Ws, orchestrator: Arc<MatchOrchestrator>| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, orchestrator))
        });

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .with(cors)
        .with(warp::log("nine_letters"))
}
