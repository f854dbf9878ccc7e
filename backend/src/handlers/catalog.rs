//! HTTP handlers for the catalog: listings, donors and parts

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::types::{PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::middleware::CurrentAdmin;
use crate::services::catalog::{
    CreateDonorInput, CreateListingInput, CreatePartInput, Donor, Listing, ListingDetail, Part,
    UpdateListingInput, UpdatePartInput,
};
use crate::services::CatalogService;
use crate::AppState;

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    fn pagination(&self) -> Pagination {
        let default = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(default.page).max(1),
            per_page: self.per_page.unwrap_or(default.per_page).clamp(1, 100),
        }
    }
}

// ============================================================================
// Public storefront handlers
// ============================================================================

/// List published listings
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Listing>>> {
    let service = CatalogService::new(state.db);
    let listings = service.list_published(query.pagination()).await?;
    Ok(Json(listings))
}

/// Get one listing with availability
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> AppResult<Json<ListingDetail>> {
    let service = CatalogService::new(state.db);
    let listing = service.get_listing(listing_id).await?;
    Ok(Json(listing))
}

// ============================================================================
// Admin handlers
// ============================================================================

/// List all listings, drafts included
pub async fn list_all_listings(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> AppResult<Json<Vec<Listing>>> {
    let service = CatalogService::new(state.db);
    let listings = service.list_all().await?;
    Ok(Json(listings))
}

/// Create a listing
pub async fn create_listing(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Json(input): Json<CreateListingInput>,
) -> AppResult<Json<Listing>> {
    let service = CatalogService::new(state.db);
    let listing = service.create_listing(input).await?;
    Ok(Json(listing))
}

/// Update a listing
pub async fn update_listing(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(listing_id): Path<Uuid>,
    Json(input): Json<UpdateListingInput>,
) -> AppResult<Json<Listing>> {
    let service = CatalogService::new(state.db);
    let listing = service.update_listing(listing_id, input).await?;
    Ok(Json(listing))
}

/// Delete a listing
pub async fn delete_listing(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(listing_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = CatalogService::new(state.db);
    service.delete_listing(listing_id).await?;
    Ok(Json(()))
}

/// Register a donor vehicle
pub async fn create_donor(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Json(input): Json<CreateDonorInput>,
) -> AppResult<Json<Donor>> {
    let service = CatalogService::new(state.db);
    let donor = service.create_donor(input).await?;
    Ok(Json(donor))
}

/// List donor vehicles
pub async fn list_donors(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> AppResult<Json<Vec<Donor>>> {
    let service = CatalogService::new(state.db);
    let donors = service.list_donors().await?;
    Ok(Json(donors))
}

/// Donor with the parts stripped from it
#[derive(Debug, serde::Serialize)]
pub struct DonorDetail {
    #[serde(flatten)]
    pub donor: Donor,
    pub parts: Vec<Part>,
}

/// Get one donor with its parts
pub async fn get_donor(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(donor_id): Path<Uuid>,
) -> AppResult<Json<DonorDetail>> {
    let service = CatalogService::new(state.db);
    let (donor, parts) = service.get_donor(donor_id).await?;
    Ok(Json(DonorDetail { donor, parts }))
}

/// Delete a donor
pub async fn delete_donor(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(donor_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = CatalogService::new(state.db);
    service.delete_donor(donor_id).await?;
    Ok(Json(()))
}

/// Record a part into stock
pub async fn create_part(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Json(input): Json<CreatePartInput>,
) -> AppResult<Json<Part>> {
    let service = CatalogService::new(state.db);
    let part = service.create_part(input).await?;
    Ok(Json(part))
}

/// Update a part
pub async fn update_part(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(part_id): Path<Uuid>,
    Json(input): Json<UpdatePartInput>,
) -> AppResult<Json<Part>> {
    let service = CatalogService::new(state.db);
    let part = service.update_part(part_id, input).await?;
    Ok(Json(part))
}

/// Delete a part
pub async fn delete_part(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(part_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = CatalogService::new(state.db);
    service.delete_part(part_id).await?;
    Ok(Json(()))
}
