use serde::{Deserialize, Serialize};

use crate::domain::{Coordinate, PackageId};

pub const DEFAULT_PAGE_LIMIT: u32 = 4;

/// Page cursor owned by a list view. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub page: u32,
    pub limit: u32,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PaginationState {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub fn with_page(self, page: u32) -> Self {
        Self { page, ..self }
    }
}

/// Query string sent with every collection fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionQuery {
    pub paginate: bool,
    pub page: u32,
    pub limit: u32,
}

impl From<PaginationState> for CollectionQuery {
    fn from(state: PaginationState) -> Self {
        Self {
            paginate: true,
            page: state.page,
            limit: state.limit,
        }
    }
}

/// One page of a server-side collection. Immutable once received; a new page
/// request always yields a whole new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
    pub docs: Vec<T>,
}

impl<T> PaginatedResult<T> {
    /// ceiling(total / limit), zero for a zero limit.
    pub fn expected_pages(total: u64, limit: u32) -> u32 {
        if limit == 0 {
            return 0;
        }
        let pages = total.div_ceil(u64::from(limit));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Slices `items` the way a well-behaved server would for `state`.
    pub fn from_items(items: &[T], state: PaginationState) -> Self
    where
        T: Clone,
    {
        let total = items.len() as u64;
        let start = (state.page.saturating_sub(1) as usize).saturating_mul(state.limit as usize);
        let docs = items
            .iter()
            .skip(start)
            .take(state.limit as usize)
            .cloned()
            .collect();
        Self {
            page: state.page,
            limit: state.limit,
            total,
            pages: Self::expected_pages(total, state.limit),
            docs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn state(&self) -> PaginationState {
        PaginationState::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePackageRequest {
    pub description: String,
    pub weight: f64,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub from_name: String,
    pub from_address: String,
    pub from_location: Coordinate,
    pub to_name: String,
    pub to_address: String,
    pub to_location: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDeliveryRequest {
    pub package_id: PackageId,
}
