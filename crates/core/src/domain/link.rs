// Shareable join link

use crate::domain::error::{DomainError, Result};
use url::Url;

/// Page customers land on to join a queue
pub const JOIN_PAGE: &str = "join.html";

/// Build the join link for `queue_id` relative to the organizer's page.
///
/// The last path segment of `page_url` is replaced by the join page, so
/// `https://host/app/index.html` becomes
/// `https://host/app/join.html?queueId=<id>`.
pub fn join_url(page_url: &str, queue_id: &str) -> Result<String> {
    let base = Url::parse(page_url).map_err(|e| DomainError::InvalidLink(e.to_string()))?;
    let mut url = base
        .join(JOIN_PAGE)
        .map_err(|e| DomainError::InvalidLink(e.to_string()))?;

    url.query_pairs_mut().clear().append_pair("queueId", queue_id);
    Ok(url.into())
}
