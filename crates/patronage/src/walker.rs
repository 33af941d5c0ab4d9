//! Breadth-first traversal of paginated API listings.
//!
//! A walk starts from the seed URIs and follows `links.next` pointers until
//! the queue drains. Any unusable page aborts the whole walk: bulk resyncs
//! replace the cached state wholesale, and a partial traversal would make
//! that replacement lossy.

use std::collections::VecDeque;

use tracing::debug;

use crate::client::ApiClient;
use crate::error::SyncError;
use crate::resource::Document;

/// Fetch every page reachable from the seed URIs, in traversal order.
///
/// Seeds are one member-listing URI per campaign; their continuation pages
/// join the back of the same queue as they are discovered.
pub async fn walk_pages<I, S>(client: &ApiClient, seed_uris: I) -> Result<Vec<Document>, SyncError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut queue: VecDeque<String> = seed_uris.into_iter().map(Into::into).collect();
    let mut pages = Vec::new();

    while let Some(uri) = queue.pop_front() {
        let document = fetch_page(client, &uri).await?;
        if let Some(next) = document.next_link() {
            queue.push_back(next.to_string());
        }
        pages.push(document);
    }

    debug!(pages = pages.len(), "page walk complete");
    Ok(pages)
}

/// Fetch and validate a single page.
async fn fetch_page(client: &ApiClient, uri: &str) -> Result<Document, SyncError> {
    let raw = client
        .get(uri)
        .await
        .map_err(|source| SyncError::IncompletePage {
            uri: uri.to_string(),
            source,
        })?;

    let document: Document =
        serde_json::from_value(raw).map_err(|source| SyncError::MalformedPage {
            uri: uri.to_string(),
            source,
        })?;

    if !document.has_data() {
        return Err(SyncError::EmptyPage {
            uri: uri.to_string(),
        });
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;

    use crate::config::ApiConfig;
    use crate::http::{HttpResponse, MockTransport};
    use crate::report::LogReporter;

    const BASE: &str = "https://api.test";

    fn client(transport: &MockTransport) -> ApiClient {
        let config = ApiConfig {
            base_url: BASE.to_string(),
            access_token: "tok".to_string(),
            ..ApiConfig::default()
        };
        ApiClient::with_transport(
            &config,
            Arc::new(transport.clone()),
            Arc::new(LogReporter),
            Arc::new(LogReporter),
        )
    }

    fn json_page(value: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: serde_json::to_vec(&value).unwrap(),
        }
    }

    #[tokio::test]
    async fn follows_next_links_in_order() {
        let transport = MockTransport::new();
        transport.push_response(
            format!("{BASE}/members"),
            json_page(json!({
                "data": [{"id": "m1", "type": "member"}],
                "links": {"next": format!("{BASE}/members?page=2")}
            })),
        );
        transport.push_response(
            format!("{BASE}/members?page=2"),
            json_page(json!({
                "data": [{"id": "m2", "type": "member"}]
            })),
        );

        let client = client(&transport);
        let pages = walk_pages(&client, ["/members"]).await.expect("walk completes");

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].entries()[0].id, "m1");
        assert_eq!(pages[1].entries()[0].id, "m2");
    }

    #[tokio::test]
    async fn continuation_pages_queue_behind_the_remaining_seeds() {
        let transport = MockTransport::new();
        transport.push_response(
            format!("{BASE}/a/members"),
            json_page(json!({
                "data": [{"id": "a1", "type": "member"}],
                "links": {"next": format!("{BASE}/a/members?page=2")}
            })),
        );
        transport.push_response(
            format!("{BASE}/b/members"),
            json_page(json!({"data": [{"id": "b1", "type": "member"}]})),
        );
        transport.push_response(
            format!("{BASE}/a/members?page=2"),
            json_page(json!({"data": [{"id": "a2", "type": "member"}]})),
        );

        let client = client(&transport);
        let pages = walk_pages(&client, ["/a/members", "/b/members"])
            .await
            .expect("walk completes");

        let ids: Vec<_> = pages.iter().map(|p| p.entries()[0].id.clone()).collect();
        assert_eq!(ids, ["a1", "b1", "a2"]);
    }

    #[tokio::test]
    async fn single_page_walks_terminate() {
        let transport = MockTransport::new();
        transport.push_response(
            format!("{BASE}/members"),
            json_page(json!({"data": []})),
        );

        let client = client(&transport);
        let pages = walk_pages(&client, ["/members"]).await.expect("walk completes");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].entries().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_mid_walk_aborts_with_the_failing_uri() {
        let transport = MockTransport::new();
        transport.push_response(
            format!("{BASE}/members"),
            json_page(json!({
                "data": [{"id": "m1", "type": "member"}],
                "links": {"next": format!("{BASE}/members?page=2")}
            })),
        );
        transport.push_response(
            format!("{BASE}/members?page=2"),
            HttpResponse {
                status: 403,
                body: b"forbidden".to_vec(),
            },
        );

        let client = client(&transport);
        let err = walk_pages(&client, ["/members"]).await.expect_err("walk aborts");
        match err {
            SyncError::IncompletePage { uri, .. } => {
                assert_eq!(uri, format!("{BASE}/members?page=2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn page_without_a_data_section_is_fatal() {
        let transport = MockTransport::new();
        transport.push_response(format!("{BASE}/members"), json_page(json!({})));

        let client = client(&transport);
        let err = walk_pages(&client, ["/members"]).await.expect_err("walk aborts");
        assert!(matches!(err, SyncError::EmptyPage { .. }));
    }

    #[tokio::test]
    async fn page_that_is_not_a_document_is_malformed() {
        let transport = MockTransport::new();
        transport.push_response(
            format!("{BASE}/members"),
            json_page(json!({"data": [{"type": "member"}]})),
        );

        let client = client(&transport);
        let err = walk_pages(&client, ["/members"]).await.expect_err("walk aborts");
        match err {
            SyncError::MalformedPage { uri, .. } => assert_eq!(uri, format!("{BASE}/members")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
