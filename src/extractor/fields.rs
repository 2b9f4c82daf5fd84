//! Per-field extraction. Every function here looks at one post container and
//! reports either the value or why it could not be found; none of them abort
//! their siblings.

use super::tree::{Marker, PostNode};
use crate::types::UNKNOWN_HANDLE;
use thiserror::Error;
use url::Url;

const HASHTAG_PATH_MARKER: &str = "/hashtag/";
const STATUS_PATH_MARKER: &str = "/status/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing {0:?} container")]
    MissingContainer(Marker),

    #[error("missing `{attr}` attribute on {marker:?}")]
    MissingAttribute { marker: Marker, attr: &'static str },

    #[error("no canonical status link for handle {0}")]
    NoCanonicalLink(String),
}

pub type Field<T> = Result<T, FieldError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBody {
    pub text: String,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub display_name: String,
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalLink {
    pub id: String,
    pub url: String,
}

pub fn text_body<'a, N: PostNode<'a>>(post: N) -> Field<TextBody> {
    let body = post
        .find_first(Marker::TextBody)
        .ok_or(FieldError::MissingContainer(Marker::TextBody))?;

    let text = body.text_segments().join("\n");
    let hashtags = body
        .find_all(Marker::Link)
        .into_iter()
        .filter(|a| a.attr("href").is_some_and(|h| h.contains(HASHTAG_PATH_MARKER)))
        .map(|a| a.text_segments().concat())
        .collect();

    Ok(TextBody { text, hashtags })
}

/// Display name is the first visible segment; the handle is the first segment
/// starting with `@`, or [`UNKNOWN_HANDLE`] when none does.
pub fn author_name<'a, N: PostNode<'a>>(post: N) -> Field<AuthorName> {
    let block = post
        .find_first(Marker::AuthorName)
        .ok_or(FieldError::MissingContainer(Marker::AuthorName))?;

    let segments: Vec<&str> = block
        .text_segments()
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let Some(display_name) = segments.first() else {
        return Err(FieldError::MissingContainer(Marker::AuthorName));
    };
    let handle = segments
        .iter()
        .find(|s| s.starts_with('@'))
        .copied()
        .unwrap_or(UNKNOWN_HANDLE);

    Ok(AuthorName {
        display_name: display_name.to_string(),
        handle: handle.to_string(),
    })
}

pub fn avatar_url<'a, N: PostNode<'a>>(post: N) -> Field<String> {
    let img = post
        .find_first(Marker::Avatar)
        .ok_or(FieldError::MissingContainer(Marker::Avatar))?
        .find_first(Marker::Image)
        .ok_or(FieldError::MissingContainer(Marker::Image))?;
    img.attr("src")
        .map(str::to_string)
        .ok_or(FieldError::MissingAttribute {
            marker: Marker::Image,
            attr: "src",
        })
}

pub fn timestamp<'a, N: PostNode<'a>>(post: N) -> Field<String> {
    post.find_first(Marker::Time)
        .ok_or(FieldError::MissingContainer(Marker::Time))?
        .attr("datetime")
        .map(str::to_string)
        .ok_or(FieldError::MissingAttribute {
            marker: Marker::Time,
            attr: "datetime",
        })
}

/// First link that points at a status page of `handle`.
///
/// Matching is a plain substring test on the href, so a sentinel handle
/// (`unknown`) only matches links that happen to contain it.
pub fn canonical_link<'a, N: PostNode<'a>>(
    post: N,
    handle: &str,
    base_url: &Url,
) -> Field<CanonicalLink> {
    let bare_handle = handle.replace('@', "");

    post.find_all(Marker::Link)
        .into_iter()
        .filter_map(|a| a.attr("href"))
        .filter(|href| href.contains(STATUS_PATH_MARKER) && href.contains(&bare_handle))
        .find_map(|href| {
            let id = href.split('/').rev().find(|seg| !seg.is_empty())?;
            let url = base_url
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string());
            Some(CanonicalLink {
                id: id.to_string(),
                url,
            })
        })
        .ok_or(FieldError::NoCanonicalLink(handle.to_string()))
}
