//! Query parameter types for list and search endpoints.

use serde::Deserialize;

use procforge_catalog::{DraftQuery, PublishedQuery};
use procforge_core::error::CoreError;
use procforge_core::template::TemplateStatus;
use procforge_core::types::DbId;

/// `?keyword=` for category search.
#[derive(Debug, Default, Deserialize)]
pub struct KeywordParams {
    pub keyword: Option<String>,
}

/// `?categoryId=&keyword=&limit=&offset=` for draft listings.
///
/// Limits are clamped by the lifecycle manager.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftListParams {
    pub category_id: Option<DbId>,
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<DraftListParams> for DraftQuery {
    fn from(params: DraftListParams) -> Self {
        DraftQuery {
            category_id: params.category_id,
            keyword: params.keyword,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

/// `?categoryId=&status=&keyword=&limit=&offset=` for published listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedListParams {
    pub category_id: Option<DbId>,
    pub status: Option<String>,
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TryFrom<PublishedListParams> for PublishedQuery {
    type Error = CoreError;

    fn try_from(params: PublishedListParams) -> Result<Self, Self::Error> {
        let status = params
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<TemplateStatus>)
            .transpose()?;
        if let Some(status) = status.filter(|s| !s.is_published()) {
            return Err(CoreError::Validation(format!(
                "status {status} is not a published status; expected ACTIVE or INACTIVE"
            )));
        }
        Ok(PublishedQuery {
            category_id: params.category_id,
            status,
            keyword: params.keyword,
            limit: params.limit,
            offset: params.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_filter_is_case_insensitive() {
        let query = PublishedQuery::try_from(PublishedListParams {
            status: Some("inactive".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query.status, Some(TemplateStatus::Inactive));
    }

    #[test]
    fn blank_status_means_any() {
        let query = PublishedQuery::try_from(PublishedListParams {
            status: Some(" ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query.status, None);
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        assert_matches!(
            PublishedQuery::try_from(PublishedListParams {
                status: Some("archived".to_string()),
                ..Default::default()
            }),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn draft_status_is_rejected_for_published_listings() {
        assert_matches!(
            PublishedQuery::try_from(PublishedListParams {
                status: Some("draft".to_string()),
                ..Default::default()
            }),
            Err(CoreError::Validation(msg)) if msg.contains("DRAFT")
        );
    }
}
