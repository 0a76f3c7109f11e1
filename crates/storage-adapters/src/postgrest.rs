//! # PostgrestEntryStore
//!
//! `EntryStore` over a hosted PostgREST endpoint (the REST face of a
//! Supabase project). Tables: `diary_entries`, `comments`, `categories`.
//! Counter increments run server-side through the
//! `increment_entry_counter(entry_id, counter)` function.

use std::time::Duration;

use async_trait::async_trait;
use domains::{
    Category, Comment, Counter, DomainError, DomainResult, Entry, EntryPatch, EntryQuery, EntryStore,
    SortKey,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

const ENTRIES: &str = "diary_entries";
const COMMENTS: &str = "comments";
const CATEGORIES: &str = "categories";

pub struct PostgrestEntryStore {
    http: Client,
    rest_url: String,
}

#[derive(Serialize)]
struct IncrementArgs<'a> {
    entry_id: &'a str,
    counter: Counter,
}

impl PostgrestEntryStore {
    /// `base_url` is the project root (e.g. `https://xyz.supabase.co`).
    ///
    /// Requests carry `api_key` as `apikey` and authorize as `access_token`
    /// when a user is signed in, otherwise as the anonymous key.
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        access_token: Option<&SecretString>,
        timeout: Duration,
    ) -> DomainResult<Self> {
        let bearer = access_token.unwrap_or(api_key).expose_secret();

        let mut apikey = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|_| DomainError::Validation("api key is not a valid header value".into()))?;
        apikey.set_sensitive(true);
        let mut authorization = HeaderValue::from_str(&format!("Bearer {bearer}"))
            .map_err(|_| DomainError::Validation("access token is not a valid header value".into()))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, authorization);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(DomainError::transient)?;

        Ok(Self { http, rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')) })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}/{}", self.rest_url, path))
    }

    /// Cheap round trip used to verify connectivity and credentials.
    pub async fn ping(&self) -> DomainResult<()> {
        let response = self
            .request(Method::GET, ENTRIES)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .map_err(DomainError::transient)?;
        check(response).await?;
        info!(url = %self.rest_url, "remote store reachable");
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> DomainResult<T> {
        let response = request.send().await.map_err(DomainError::transient)?;
        check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DomainError::Transient(format!("decode: {e}")))
    }

    /// Sends a write that asks for the touched rows back; an empty answer
    /// means nothing matched `id`.
    async fn write_one(&self, request: RequestBuilder, id: &str) -> DomainResult<Entry> {
        let rows: Vec<Entry> = self.fetch(request.header("Prefer", "return=representation")).await?;
        rows.into_iter().next().ok_or_else(|| DomainError::NotFound("Entry".into(), id.to_string()))
    }
}

async fn check(response: Response) -> DomainResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> DomainError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DomainError::AuthRequired(format!("HTTP {}: {body}", status.as_u16()))
        }
        StatusCode::NOT_FOUND => DomainError::NotFound("Resource".into(), body.to_string()),
        // Malformed filter or unknown column: asking again cannot help.
        StatusCode::BAD_REQUEST => DomainError::Validation(format!("HTTP 400: {body}")),
        _ => DomainError::Transient(format!("HTTP {}: {body}", status.as_u16())),
    }
}

/// PostgREST query-string parameters for `query`.
pub fn entry_query_params(query: &EntryQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    if let Some(public) = query.visibility {
        params.push(("is_public".into(), format!("eq.{public}")));
    }
    if let Some(owner) = &query.owner {
        params.push(("user_id".into(), format!("eq.{owner}")));
    }
    if let Some(category) = &query.category {
        params.push(("category_id".into(), format!("eq.{category}")));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = quote(&format!("*{search}*"));
        params.push(("or".into(), format!("(content.ilike.{pattern},user_id.ilike.{pattern})")));
    }

    let sort = query.sort;
    let mut order = format!("{}.{}", sort.key.column(), sort.direction.as_str());
    if sort.key != SortKey::Date {
        order.push_str(",created_at.desc");
    }
    order.push_str(",id.asc");
    params.push(("order".into(), order));

    if let Some(range) = query.range {
        params.push(("offset".into(), range.offset.to_string()));
        params.push(("limit".into(), range.limit.to_string()));
    }
    params
}

/// Double-quotes a filter value so commas and parentheses stay literal.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl EntryStore for PostgrestEntryStore {
    async fn query_entries(&self, query: &EntryQuery) -> DomainResult<Vec<Entry>> {
        let params = entry_query_params(query);
        debug!(?params, "remote entry query");
        self.fetch(self.request(Method::GET, ENTRIES).query(&params)).await
    }

    async fn insert_entry(&self, entry: Entry) -> DomainResult<Entry> {
        let id = entry.id.clone();
        self.write_one(self.request(Method::POST, ENTRIES).json(&[entry]), &id).await
    }

    async fn update_entry(&self, id: &str, patch: EntryPatch) -> DomainResult<()> {
        let request = self
            .request(Method::PATCH, ENTRIES)
            .query(&[("id", format!("eq.{id}"))])
            .json(&patch);
        self.write_one(request, id).await.map(|_| ())
    }

    async fn delete_entry(&self, id: &str) -> DomainResult<()> {
        let request = self.request(Method::DELETE, ENTRIES).query(&[("id", format!("eq.{id}"))]);
        self.write_one(request, id).await.map(|_| ())
    }

    async fn increment_counter(&self, id: &str, counter: Counter) -> DomainResult<u64> {
        let request = self
            .request(Method::POST, "rpc/increment_entry_counter")
            .json(&IncrementArgs { entry_id: id, counter });
        self.fetch(request).await
    }

    async fn list_comments(&self, entry_id: &str) -> DomainResult<Vec<Comment>> {
        let request = self.request(Method::GET, COMMENTS).query(&[
            ("select", "*".to_string()),
            ("entry_id", format!("eq.{entry_id}")),
            ("order", "created_at.asc".to_string()),
        ]);
        self.fetch(request).await
    }

    async fn insert_comment(&self, comment: Comment) -> DomainResult<Comment> {
        let request = self
            .request(Method::POST, COMMENTS)
            .header("Prefer", "return=representation")
            .json(&[&comment]);
        let rows: Vec<Comment> = self.fetch(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DomainError::Transient("comment insert returned no row".into()))
    }

    async fn list_categories(&self) -> DomainResult<Vec<Category>> {
        let request = self
            .request(Method::GET, CATEGORIES)
            .query(&[("select", "*"), ("order", "name.asc")]);
        self.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{FeedFilters, PageRange, SortDirection, SortSpec};

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_feed_params() {
        let filters = FeedFilters {
            search: "hello".into(),
            category: Some("travel".into()),
            sort: SortSpec::new(SortKey::Likes, SortDirection::Desc),
        };
        let params = entry_query_params(&EntryQuery::public_feed(&filters, PageRange::new(20, 10)));

        assert_eq!(param(&params, "is_public"), Some("eq.true"));
        assert_eq!(param(&params, "category_id"), Some("eq.travel"));
        assert_eq!(param(&params, "or"), Some("(content.ilike.\"*hello*\",user_id.ilike.\"*hello*\")"));
        assert_eq!(param(&params, "order"), Some("likes.desc,created_at.desc,id.asc"));
        assert_eq!(param(&params, "offset"), Some("20"));
        assert_eq!(param(&params, "limit"), Some("10"));
    }

    #[test]
    fn test_date_order_has_no_duplicate_column() {
        let query = EntryQuery::all().with_sort(SortSpec::new(SortKey::Date, SortDirection::Asc));
        let params = entry_query_params(&query);
        assert_eq!(param(&params, "order"), Some("created_at.asc,id.asc"));
        assert_eq!(param(&params, "limit"), None);
        assert_eq!(param(&params, "is_public"), None);
    }

    #[test]
    fn test_search_value_is_quoted() {
        let params = entry_query_params(&EntryQuery::all().with_search("a,b\"c"));
        assert_eq!(param(&params, "or"), Some("(content.ilike.\"*a,b\\\"c*\",user_id.ilike.\"*a,b\\\"c*\")"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, ""), DomainError::AuthRequired(_)));
        assert!(matches!(status_error(StatusCode::NOT_FOUND, ""), DomainError::NotFound(..)));
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "busy").is_retryable());
        assert!(!status_error(StatusCode::BAD_REQUEST, "column does not exist").is_retryable());
    }

    #[test]
    fn test_rest_url_is_normalised() {
        let key = SecretString::from("anon".to_string());
        let store = PostgrestEntryStore::new("https://demo.example.co/", &key, None, Duration::from_secs(5)).unwrap();
        assert_eq!(store.rest_url, "https://demo.example.co/rest/v1");
    }
}
