// src/models/shop.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::utils::validate::validate_url_string;

pub const KIND_POWER_UP: &str = "power_up";

/// Represents the 'shop_items' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// 'avatar', 'theme', 'title' or 'power_up'.
    pub kind: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl ShopItem {
    /// Power-ups are consumables and stack; everything else is owned once.
    pub fn is_stackable(&self) -> bool {
        self.kind == KIND_POWER_UP
    }
}

pub const SHOP_ITEM_COLUMNS: &str = "id, name, description, kind, price, image_url, is_active";

/// Row of a user's inventory joined with the item.
#[derive(Debug, Serialize, FromRow)]
pub struct InventoryItem {
    pub item_id: i64,
    pub name: String,
    pub kind: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub equipped: bool,
    pub purchased_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateShopItemRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = validate_item_kind))]
    pub kind: String,
    #[validate(range(min = 0, max = 1_000_000))]
    pub price: i64,
    #[validate(custom(function = validate_url_string))]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateShopItemRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 1_000_000))]
    pub price: Option<i64>,
    #[validate(custom(function = validate_url_string))]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_item_kind(kind: &str) -> Result<(), ValidationError> {
    match kind {
        "avatar" | "theme" | "title" | KIND_POWER_UP => Ok(()),
        _ => Err(ValidationError::new("invalid_item_kind")),
    }
}
