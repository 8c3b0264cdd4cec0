//! Station and country handlers

use crate::error::ApiError;
use crate::services::DirectoryRoute;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use hub_types::{LimitQuery, SearchQuery};
use serde_json::Value;

pub async fn popular(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let route = DirectoryRoute::TopVoted {
        limit: query.limit(),
    };
    let stations = state
        .stations
        .fetch_and_cache(&route)
        .await
        .map_err(ApiError::upstream("Error fetching stations"))?;
    Ok(Json(stations))
}

pub async fn by_country(
    State(state): State<AppState>,
    Path(country): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let route = DirectoryRoute::ByCountry {
        country,
        limit: query.limit(),
    };
    let stations = state
        .stations
        .fetch_and_cache(&route)
        .await
        .map_err(ApiError::upstream("Error fetching stations"))?;
    Ok(Json(stations))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let route = DirectoryRoute::ByName {
        limit: query.limit(),
        query: query.q,
    };
    let stations = state
        .stations
        .fetch_and_cache(&route)
        .await
        .map_err(ApiError::upstream("Error searching stations"))?;
    Ok(Json(stations))
}

pub async fn countries(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let countries = state
        .stations
        .top_countries()
        .await
        .map_err(ApiError::upstream("Error fetching countries"))?;
    Ok(Json(countries))
}
