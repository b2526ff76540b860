//! Restaurant API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use shared::waitlist::ReinsertionPolicy;

use crate::core::ServerState;
use crate::db::models::{Restaurant, RestaurantCreate, RestaurantUpdate};
use crate::db::repository::RestaurantRepository;
use crate::utils::validation::{MAX_NAME_LEN, validate_optional_text, validate_required_text};
use crate::utils::{AppError, AppResult};

/// Wire shape for a restaurant: the record key travels as a plain string
#[derive(Debug, Serialize)]
pub struct RestaurantResponse {
    pub id: String,
    pub name: String,
    pub tolerance_minutes: u32,
    pub reinsertion_policy: ReinsertionPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<u32>,
    pub is_active: bool,
    pub created_at: i64,
}

impl TryFrom<Restaurant> for RestaurantResponse {
    type Error = AppError;

    fn try_from(r: Restaurant) -> Result<Self, Self::Error> {
        let id = r
            .key()
            .ok_or_else(|| AppError::internal("restaurant record without id"))?;
        Ok(Self {
            id,
            name: r.name,
            tolerance_minutes: r.tolerance_minutes,
            reinsertion_policy: r.reinsertion_policy,
            max_queue_size: r.max_queue_size,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}

/// GET /api/restaurants - 获取所有启用的餐厅
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<RestaurantResponse>>> {
    let repo = RestaurantRepository::new(state.db.clone());
    let restaurants = repo.find_all().await?;
    let responses = restaurants
        .into_iter()
        .map(RestaurantResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(responses))
}

/// GET /api/restaurants/:id - 获取单个餐厅
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<RestaurantResponse>> {
    let repo = RestaurantRepository::new(state.db.clone());
    let restaurant = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Restaurant {} not found", id)))?;
    Ok(Json(restaurant.try_into()?))
}

/// POST /api/restaurants - 注册餐厅
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<RestaurantCreate>,
) -> AppResult<Json<RestaurantResponse>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;

    let repo = RestaurantRepository::new(state.db.clone());
    let restaurant = repo.create(payload).await?;
    Ok(Json(restaurant.try_into()?))
}

/// PUT /api/restaurants/:id - 更新餐厅设置
///
/// 宽容期等设置只影响之后的叫号。
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<RestaurantUpdate>,
) -> AppResult<Json<RestaurantResponse>> {
    validate_optional_text(&payload.name, "name", MAX_NAME_LEN)?;

    let repo = RestaurantRepository::new(state.db.clone());
    let restaurant = repo.update(&id, payload).await?;
    Ok(Json(restaurant.try_into()?))
}

/// DELETE /api/restaurants/:id - 删除餐厅
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    let repo = RestaurantRepository::new(state.db.clone());
    let result = repo.delete(&id).await?;
    Ok(Json(result))
}
