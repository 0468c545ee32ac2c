//! Resolution of the REST and push-channel addresses.
//!
//! The push base is picked from, in order:
//! 1. `push.base_url`
//! 2. `api.base_url` with its scheme rewritten to the channel scheme
//! 3. the origin of `app.page_url` with its scheme rewritten to the channel scheme
//!
//! The REST base is `api.base_url`, falling back to the origin of `app.page_url`.

use url::Url;

use crate::error::{FeedError, Result};

use super::Settings;

/// Path of the notification push channel, relative to the push base
pub const PUSH_CHANNEL_PATH: &str = "/ws/notifications";

/// Resolved service addresses for one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base: Url,
    push_base: Url,
}

impl Endpoints {
    pub fn resolve(settings: &Settings) -> Result<Self> {
        let api = parse_optional(settings.api.base_url.as_deref())?;
        let push = parse_optional(settings.push.base_url.as_deref())?;
        let page = parse_optional(settings.app.page_url.as_deref())?
            .map(|page| origin_of(&page))
            .transpose()?;

        let api_base = api
            .clone()
            .or_else(|| page.clone())
            .ok_or_else(|| FeedError::Endpoint("no API base address configured".into()))?;

        let push_base = match (push, api, page) {
            (Some(explicit), _, _) => explicit,
            (None, Some(api), _) => to_channel_scheme(api)?,
            (None, None, Some(page)) => to_channel_scheme(page)?,
            (None, None, None) => {
                return Err(FeedError::Endpoint(
                    "no push channel base address configured".into(),
                ))
            }
        };

        Ok(Self {
            api_base,
            push_base,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn push_base(&self) -> &Url {
        &self.push_base
    }

    /// Build a REST URL by appending `path` to the API base
    pub fn api_url(&self, path: &str) -> Result<Url> {
        join(&self.api_base, path)
    }

    /// Push channel URL carrying the bearer credential as `token`
    pub fn push_url(&self, token: &str) -> Result<Url> {
        let mut url = join(&self.push_base, PUSH_CHANNEL_PATH)?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }
}

fn parse_optional(raw: Option<&str>) -> Result<Option<Url>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(Url::parse(s)?)),
        None => Ok(None),
    }
}

/// Scheme, host and port only; path, query and fragment are dropped
fn origin_of(url: &Url) -> Result<Url> {
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(FeedError::Endpoint(format!("'{}' has no usable origin", url)));
    }
    Ok(Url::parse(&origin.ascii_serialization())?)
}

fn to_channel_scheme(mut url: Url) -> Result<Url> {
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(url),
        other => {
            return Err(FeedError::Endpoint(format!(
                "cannot derive a push address from scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| FeedError::Endpoint(format!("cannot switch {} to {}", url, scheme)))?;
    Ok(url)
}

fn join(base: &Url, path: &str) -> Result<Url> {
    let mut joined = base.clone();
    joined.set_query(None);
    joined.set_fragment(None);
    let combined = format!(
        "{}/{}",
        joined.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    joined.set_path(&combined);
    Ok(joined)
}
