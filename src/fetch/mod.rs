//! Remote listing access.
//!
//! A [`PageSource`] turns a cursor into a decoded page; a [`Paginator`]
//! walks a source from a starting cursor until the next pointer runs out.

pub mod http;
pub mod paginator;

pub use http::{ApiSource, HttpClient, HttpSettings, ListingSource};
pub use paginator::{fetch_all, Paginator};

use crate::error::FetchError;
use crate::models::Page;
use crate::models::Cursor;

/// Something that can resolve a cursor into a page of records.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// Record type carried by the pages.
    type Record;

    /// Human-readable identifier used in logs and errors.
    fn label(&self) -> &str;

    /// Fetch and decode the page behind `cursor`. `page` is the 1-based
    /// position in the current walk, for error context.
    async fn fetch(&self, cursor: &Cursor, page: usize) -> Result<Page<Self::Record>, FetchError>;
}

/// URL of the locales listing.
pub fn locales_url(base_url: &str) -> Cursor {
    Cursor::new(format!("{}/api/v2/locales", base_url.trim_end_matches('/')))
}

/// URL of a single project's localizations.
pub fn project_url(base_url: &str, project: &str) -> Cursor {
    Cursor::new(format!(
        "{}/api/v2/projects/{}",
        base_url.trim_end_matches('/'),
        project.trim_matches('/')
    ))
}

/// URL of a repository directory listing.
pub fn contents_url(api_url: &str, owner: &str, repo: &str, path: &str) -> Cursor {
    let path = path.trim_matches('/');
    let mut url = format!(
        "{}/repos/{}/{}/contents",
        api_url.trim_end_matches('/'),
        owner,
        repo
    );
    if !path.is_empty() {
        url.push('/');
        url.push_str(&path.replace(' ', "%20"));
    }
    Cursor::new(url)
}
