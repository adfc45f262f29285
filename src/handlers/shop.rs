// src/handlers/shop.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::shop::{InventoryItem, SHOP_ITEM_COLUMNS, ShopItem},
    utils::jwt::Claims,
};

/// Active items on sale.
#[utoipa::path(
    get,
    path = "/api/shop/items",
    responses((status = 200, description = "Items for sale")),
    tag = "shop"
)]
pub async fn list_items(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let items = sqlx::query_as::<_, ShopItem>(&format!(
        "SELECT {SHOP_ITEM_COLUMNS} FROM shop_items WHERE is_active = TRUE ORDER BY kind, price"
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(items))
}

/// Buys one unit of an item with coins.
///
/// The coin deduction is conditional on the balance inside the same
/// transaction as the inventory write, so parallel purchases cannot overdraw.
#[utoipa::path(
    post,
    path = "/api/shop/items/{id}/purchase",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 201, description = "Purchased"),
        (status = 400, description = "Not enough coins"),
        (status = 404, description = "Unknown or inactive item"),
        (status = 409, description = "Cosmetic already owned")
    ),
    security(("bearer" = [])),
    tag = "shop"
)]
pub async fn purchase(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let item = sqlx::query_as::<_, ShopItem>(&format!(
        "SELECT {SHOP_ITEM_COLUMNS} FROM shop_items WHERE id = $1 AND is_active = TRUE"
    ))
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Item not found".to_string()))?;

    if !item.is_stackable() {
        let owned: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM user_items WHERE user_id = $1 AND item_id = $2",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;
        if owned.is_some() {
            return Err(AppError::Conflict("You already own this item".to_string()));
        }
    }

    let remaining: Option<i64> = sqlx::query_scalar(
        "UPDATE users SET coins = coins - $1 WHERE id = $2 AND coins >= $1 RETURNING coins",
    )
    .bind(item.price)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(remaining) = remaining else {
        return Err(AppError::BadRequest("Not enough coins".to_string()));
    };

    let insert = if item.is_stackable() {
        r#"
        INSERT INTO user_items (user_id, item_id, quantity)
        VALUES ($1, $2, 1)
        ON CONFLICT (user_id, item_id) DO UPDATE SET quantity = user_items.quantity + 1
        "#
    } else {
        "INSERT INTO user_items (user_id, item_id, quantity) VALUES ($1, $2, 1) ON CONFLICT DO NOTHING"
    };

    let inserted = sqlx::query(insert)
        .bind(user_id)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

    // A parallel purchase of the same cosmetic won; dropping `tx` refunds the coins.
    if inserted.rows_affected() == 0 {
        return Err(AppError::Conflict("You already own this item".to_string()));
    }

    tx.commit().await?;

    tracing::info!(user_id, item_id, price = item.price, "item purchased");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "item_id": item_id, "coins": remaining })),
    ))
}

/// Items owned by the current user.
pub async fn inventory(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let items = sqlx::query_as::<_, InventoryItem>(
        r#"
        SELECT ui.item_id, s.name, s.kind, s.image_url, ui.quantity, ui.equipped, ui.purchased_at
        FROM user_items ui
        JOIN shop_items s ON s.id = ui.item_id
        WHERE ui.user_id = $1
        ORDER BY ui.purchased_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(items))
}

/// Equips an owned cosmetic, unequipping others of the same kind.
pub async fn equip(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let kind: String = sqlx::query_scalar(
        r#"
        SELECT s.kind
        FROM user_items ui
        JOIN shop_items s ON s.id = ui.item_id
        WHERE ui.user_id = $1 AND ui.item_id = $2
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("You do not own this item".to_string()))?;

    if kind == crate::models::shop::KIND_POWER_UP {
        return Err(AppError::BadRequest("Power-ups cannot be equipped".to_string()));
    }

    sqlx::query(
        r#"
        UPDATE user_items ui
        SET equipped = (ui.item_id = $2)
        FROM shop_items s
        WHERE s.id = ui.item_id AND ui.user_id = $1 AND s.kind = $3
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(&kind)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(StatusCode::OK)
}
