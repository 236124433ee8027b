//! Optional HTTP control API.  Every mutation goes through the same
//! `PlayerHandle` as the keyboard, so the core sees one command stream.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use radio_core::station::NewStation;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::core::PlayerHandle;
use crate::state::{PlayerState, StateManager};

#[derive(Clone)]
struct HttpState {
    state_manager: Arc<StateManager>,
    player: PlayerHandle,
}

pub fn router(state_manager: Arc<StateManager>, player: PlayerHandle) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/toggle", post(toggle))
        .route("/api/mute", post(mute))
        .route("/api/volume/:value", post(set_volume))
        .route("/api/station/:idx", post(change_station))
        .route("/api/stations", post(add_station))
        .layer(CorsLayer::permissive())
        .with_state(HttpState { state_manager, player })
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state_manager: Arc<StateManager>,
    player: PlayerHandle,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(state_manager, player);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_state(State(state): State<HttpState>) -> Json<PlayerState> {
    Json(state.state_manager.get_state().await)
}

async fn toggle(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: toggle play");
    state.player.toggle_play().await;
    StatusCode::OK
}

async fn mute(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: toggle mute");
    state.player.toggle_mute().await;
    StatusCode::OK
}

/// `value` is a percentage, 0 to 100.
async fn set_volume(State(state): State<HttpState>, Path(value): Path<String>) -> Response {
    let percent = match value.parse::<f32>() {
        Ok(p) if (0.0..=100.0).contains(&p) => p,
        _ => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("volume must be a number between 0 and 100, got {:?}", value),
            )
                .into_response()
        }
    };
    info!("HTTP API: set volume to {}%", percent);
    state.player.change_volume(percent / 100.0).await;
    StatusCode::OK.into_response()
}

async fn change_station(State(state): State<HttpState>, Path(idx): Path<usize>) -> StatusCode {
    let url = {
        let player = state.state_manager.get_state().await;
        match player.stations.get(idx) {
            Some(s) => s.url.clone(),
            None => return StatusCode::NOT_FOUND,
        }
    };
    info!("HTTP API: change station to #{}", idx);
    state.player.change_station(url).await;
    StatusCode::OK
}

async fn add_station(State(state): State<HttpState>, Json(input): Json<NewStation>) -> Response {
    match input.validate() {
        Ok(station) => {
            info!("HTTP API: add station {:?}", station.name);
            state.player.add_station(station).await;
            StatusCode::CREATED.into_response()
        }
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlayerCommand, SwitchTickets};
    use radio_core::station::Station;
    use tokio::sync::{broadcast, mpsc};

    struct TestServer {
        base: String,
        commands: mpsc::Receiver<PlayerCommand>,
    }

    async fn serve() -> TestServer {
        let stations = vec![
            Station::new("DIGI FM", "https://a/digi"),
            Station::new("Radio ZU", "https://c/zu"),
        ];
        let (bc_tx, _) = broadcast::channel(16);
        let manager = Arc::new(StateManager::new(PlayerState::new(stations, 0.8), bc_tx));
        let (tx, commands) = mpsc::channel(16);
        let app = router(manager, PlayerHandle::new(tx, SwitchTickets::default()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        TestServer {
            base: format!("http://{}", addr),
            commands,
        }
    }

    #[tokio::test]
    async fn test_state_is_served_as_json() {
        let server = serve().await;
        let body: serde_json::Value = reqwest::get(format!("{}/api/state", server.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["stations"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(body["current_track"], "Unknown");
        assert_eq!(body["playing"], false);
    }

    #[tokio::test]
    async fn test_volume_percent_becomes_command() {
        let mut server = serve().await;
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/api/volume/40", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(server.commands.recv().await, Some(PlayerCommand::ChangeVolume(0.4)));

        let resp = client
            .post(format!("{}/api/volume/150", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_station_index_is_checked() {
        let mut server = serve().await;
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/api/station/7", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        client
            .post(format!("{}/api/station/1", server.base))
            .send()
            .await
            .unwrap();
        match server.commands.recv().await {
            Some(PlayerCommand::ChangeStation { url, .. }) => assert_eq!(url, "https://c/zu"),
            other => panic!("expected ChangeStation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_station_validates_input() {
        let mut server = serve().await;
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/api/stations", server.base))
            .json(&serde_json::json!({ "name": "Kiss FM" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(resp.text().await.unwrap(), "Name and URL are required!");

        let resp = client
            .post(format!("{}/api/stations", server.base))
            .json(&serde_json::json!({ "name": "Kiss FM", "url": "https://k/kiss" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        assert_eq!(
            server.commands.recv().await,
            Some(PlayerCommand::AddStation(Station::new("Kiss FM", "https://k/kiss")))
        );
    }

    #[tokio::test]
    async fn test_toggle_and_mute_forward_commands() {
        let mut server = serve().await;
        let client = reqwest::Client::new();
        client.post(format!("{}/api/toggle", server.base)).send().await.unwrap();
        client.post(format!("{}/api/mute", server.base)).send().await.unwrap();
        assert_eq!(server.commands.recv().await, Some(PlayerCommand::TogglePlay));
        assert_eq!(server.commands.recv().await, Some(PlayerCommand::ToggleMute));
    }
}
