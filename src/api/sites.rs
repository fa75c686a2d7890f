//! # Sites API
//!
//! Listing the sites visible to the configured API key.

use crate::api::client::{ApiClient, ApiError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_SITES_LIMIT: i64 = 100;

// =============================================================================
// Response Types
// =============================================================================

/// A site tracked in the Plausible account.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Site {
    /// Domain, used as `site_id` in queries.
    #[serde(default)]
    pub domain: Option<String>,
    /// IANA timezone the site reports in.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Any further fields the service returns, kept for display.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Site {
    /// The domain, unless it is missing or blank.
    pub fn queryable_domain(&self) -> Option<&str> {
        self.domain.as_deref().filter(|d| !d.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct SitesResponse {
    sites: Vec<Site>,
}

// =============================================================================
// API Client Methods
// =============================================================================

impl ApiClient {
    /// List sites accessible to the API key.
    ///
    /// Only the first page is fetched.
    ///
    /// # Errors
    ///
    /// * `ApiError::ValidationError` - `limit` is not positive (nothing sent)
    /// * `ApiError::ParseError` - the body has no `sites` list
    /// * any other `ApiError` from the request itself
    pub async fn list_sites(&self, limit: i64) -> Result<Vec<Site>, ApiError> {
        if limit <= 0 {
            return Err(ApiError::validation(format!(
                "limit must be a positive integer, got {}",
                limit
            )));
        }

        let url = format!("{}/api/v1/sites", self.base_url);
        let limit = limit.to_string();

        let response: SitesResponse = self
            .send_json("sites", |client| {
                client.get(&url).query(&[("limit", limit.as_str())])
            })
            .await?;

        Ok(response.sites)
    }
}
