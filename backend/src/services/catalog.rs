//! Catalog service: donors, parts and listings
//!
//! Admin CRUD plus the public storefront reads. A listing is the sellable
//! unit; it can be backed by several part rows, each traceable to the donor
//! vehicle it was stripped from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::types::{PaginatedResponse, Pagination, PaginationMeta};

use crate::error::{AppError, AppResult};

/// Catalog service
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// A donor vehicle parts are stripped from
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Donor {
    pub id: Uuid,
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: Option<String>,
    pub arrived_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a donor
#[derive(Debug, Deserialize)]
pub struct CreateDonorInput {
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: Option<String>,
    pub arrived_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A physical stock unit
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Part {
    pub id: Uuid,
    pub listing_id: Option<Uuid>,
    pub donor_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a part
#[derive(Debug, Deserialize)]
pub struct CreatePartInput {
    pub listing_id: Option<Uuid>,
    pub donor_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub location: Option<String>,
}

/// Input for updating a part
#[derive(Debug, Deserialize)]
pub struct UpdatePartInput {
    pub listing_id: Option<Uuid>,
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub location: Option<String>,
}

/// A sellable listing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub sku: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing with the stock backing it
#[derive(Debug, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub available_quantity: i64,
    pub parts: Vec<Part>,
}

/// Input for creating a listing
#[derive(Debug, Deserialize)]
pub struct CreateListingInput {
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub sku: Option<String>,
    pub is_published: Option<bool>,
}

/// Input for updating a listing
#[derive(Debug, Deserialize)]
pub struct UpdateListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub sku: Option<String>,
    pub is_published: Option<bool>,
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Published listings for the storefront, newest first.
    pub async fn list_published(
        &self,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Listing>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM listings WHERE is_published = true")
                .fetch_one(&self.db)
                .await?;

        let offset = (pagination.page.saturating_sub(1) * pagination.per_page) as i64;
        let listings = sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, title, description, price_cents, sku, is_published, created_at, updated_at
            FROM listings
            WHERE is_published = true
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.per_page as i64)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: listings,
            pagination: PaginationMeta::new(pagination.page, pagination.per_page, total as u64),
        })
    }

    /// One listing with its backing stock.
    pub async fn get_listing(&self, listing_id: Uuid) -> AppResult<ListingDetail> {
        let listing = sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, title, description, price_cents, sku, is_published, created_at, updated_at
            FROM listings
            WHERE id = $1
            "#,
        )
        .bind(listing_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing".to_string()))?;

        let parts = sqlx::query_as::<_, Part>(
            r#"
            SELECT id, listing_id, donor_id, name, quantity, location, created_at
            FROM parts
            WHERE listing_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(listing_id)
        .fetch_all(&self.db)
        .await?;

        let available_quantity = parts.iter().map(|p| p.quantity as i64).sum();

        Ok(ListingDetail {
            listing,
            available_quantity,
            parts,
        })
    }

    /// All listings, published or not (admin).
    pub async fn list_all(&self) -> AppResult<Vec<Listing>> {
        let listings = sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, title, description, price_cents, sku, is_published, created_at, updated_at
            FROM listings
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(listings)
    }

    /// Create a listing (admin).
    pub async fn create_listing(&self, input: CreateListingInput) -> AppResult<Listing> {
        if input.price_cents < 0 {
            return Err(AppError::Validation {
                field: "price_cents".to_string(),
                message: "Price cannot be negative".to_string(),
            });
        }

        let listing = sqlx::query_as::<_, Listing>(
            r#"
            INSERT INTO listings (title, description, price_cents, sku, is_published)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, price_cents, sku, is_published, created_at, updated_at
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(&input.sku)
        .bind(input.is_published.unwrap_or(false))
        .fetch_one(&self.db)
        .await?;

        Ok(listing)
    }

    /// Update a listing (admin).
    pub async fn update_listing(
        &self,
        listing_id: Uuid,
        input: UpdateListingInput,
    ) -> AppResult<Listing> {
        let existing = sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, title, description, price_cents, sku, is_published, created_at, updated_at
            FROM listings
            WHERE id = $1
            "#,
        )
        .bind(listing_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing".to_string()))?;

        let price_cents = input.price_cents.unwrap_or(existing.price_cents);
        if price_cents < 0 {
            return Err(AppError::Validation {
                field: "price_cents".to_string(),
                message: "Price cannot be negative".to_string(),
            });
        }

        let listing = sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings
            SET title = $1, description = $2, price_cents = $3, sku = $4, is_published = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING id, title, description, price_cents, sku, is_published, created_at, updated_at
            "#,
        )
        .bind(input.title.unwrap_or(existing.title))
        .bind(input.description.or(existing.description))
        .bind(price_cents)
        .bind(input.sku.or(existing.sku))
        .bind(input.is_published.unwrap_or(existing.is_published))
        .bind(listing_id)
        .fetch_one(&self.db)
        .await?;

        Ok(listing)
    }

    /// Delete a listing (admin). Parts keep their rows but lose the link.
    pub async fn delete_listing(&self, listing_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(listing_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Listing".to_string()));
        }

        Ok(())
    }

    // ========================================================================
    // Donors
    // ========================================================================

    /// Register a donor vehicle (admin).
    pub async fn create_donor(&self, input: CreateDonorInput) -> AppResult<Donor> {
        if input.vin.trim().is_empty() {
            return Err(AppError::Validation {
                field: "vin".to_string(),
                message: "VIN is required".to_string(),
            });
        }

        let donor = sqlx::query_as::<_, Donor>(
            r#"
            INSERT INTO donors (vin, make, model, year, color, arrived_on, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, vin, make, model, year, color, arrived_on, notes, created_at
            "#,
        )
        .bind(&input.vin)
        .bind(&input.make)
        .bind(&input.model)
        .bind(input.year)
        .bind(&input.color)
        .bind(input.arrived_on)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        Ok(donor)
    }

    /// All donor vehicles, newest arrivals first (admin).
    pub async fn list_donors(&self) -> AppResult<Vec<Donor>> {
        let donors = sqlx::query_as::<_, Donor>(
            r#"
            SELECT id, vin, make, model, year, color, arrived_on, notes, created_at
            FROM donors
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(donors)
    }

    /// One donor with the parts stripped from it (admin).
    pub async fn get_donor(&self, donor_id: Uuid) -> AppResult<(Donor, Vec<Part>)> {
        let donor = sqlx::query_as::<_, Donor>(
            r#"
            SELECT id, vin, make, model, year, color, arrived_on, notes, created_at
            FROM donors
            WHERE id = $1
            "#,
        )
        .bind(donor_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Donor".to_string()))?;

        let parts = sqlx::query_as::<_, Part>(
            r#"
            SELECT id, listing_id, donor_id, name, quantity, location, created_at
            FROM parts
            WHERE donor_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(donor_id)
        .fetch_all(&self.db)
        .await?;

        Ok((donor, parts))
    }

    /// Delete a donor (admin).
    pub async fn delete_donor(&self, donor_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM donors WHERE id = $1")
            .bind(donor_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Donor".to_string()));
        }

        Ok(())
    }

    // ========================================================================
    // Parts
    // ========================================================================

    /// Record a part stripped into stock (admin).
    pub async fn create_part(&self, input: CreatePartInput) -> AppResult<Part> {
        if input.quantity < 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity cannot be negative".to_string(),
            });
        }

        let part = sqlx::query_as::<_, Part>(
            r#"
            INSERT INTO parts (listing_id, donor_id, name, quantity, location)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, listing_id, donor_id, name, quantity, location, created_at
            "#,
        )
        .bind(input.listing_id)
        .bind(input.donor_id)
        .bind(&input.name)
        .bind(input.quantity)
        .bind(&input.location)
        .fetch_one(&self.db)
        .await?;

        Ok(part)
    }

    /// Update a part (admin). Quantity edits here are manual stock
    /// corrections, not sales.
    pub async fn update_part(&self, part_id: Uuid, input: UpdatePartInput) -> AppResult<Part> {
        let existing = sqlx::query_as::<_, Part>(
            r#"
            SELECT id, listing_id, donor_id, name, quantity, location, created_at
            FROM parts
            WHERE id = $1
            "#,
        )
        .bind(part_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Part".to_string()))?;

        let quantity = input.quantity.unwrap_or(existing.quantity);
        if quantity < 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity cannot be negative".to_string(),
            });
        }

        let part = sqlx::query_as::<_, Part>(
            r#"
            UPDATE parts
            SET listing_id = $1, name = $2, quantity = $3, location = $4
            WHERE id = $5
            RETURNING id, listing_id, donor_id, name, quantity, location, created_at
            "#,
        )
        .bind(input.listing_id.or(existing.listing_id))
        .bind(input.name.unwrap_or(existing.name))
        .bind(quantity)
        .bind(input.location.or(existing.location))
        .bind(part_id)
        .fetch_one(&self.db)
        .await?;

        Ok(part)
    }

    /// Delete a part (admin).
    pub async fn delete_part(&self, part_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM parts WHERE id = $1")
            .bind(part_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Part".to_string()));
        }

        Ok(())
    }
}
