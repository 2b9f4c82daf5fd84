//! Record extraction: one snapshot in, zero or more normalized posts out.

pub mod fields;
pub mod tree;

use crate::types::{Author, Metrics, PostRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use fields::{AuthorName, CanonicalLink, Field, TextBody};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

pub use fields::FieldError;
pub use tree::{Marker, NodeTree, PostNode, Snapshot};

/// Prefix of ids minted when no canonical status link is present.
pub const FALLBACK_ID_PREFIX: &str = "local-";

/// Raw per-field results for one post container.
#[derive(Debug, Clone)]
pub struct PostFields {
    pub text: Field<TextBody>,
    pub author: Field<AuthorName>,
    pub avatar_url: Field<String>,
    pub created_at: Field<String>,
    pub canonical: Field<CanonicalLink>,
}

impl PostFields {
    pub fn collect<'a, N: PostNode<'a>>(post: N, base_url: &Url) -> Self {
        let author = fields::author_name(post);
        let handle = author
            .as_ref()
            .map(|a| a.handle.as_str())
            .unwrap_or(crate::types::UNKNOWN_HANDLE);
        let canonical = fields::canonical_link(post, handle, base_url);

        Self {
            text: fields::text_body(post),
            author,
            avatar_url: fields::avatar_url(post),
            created_at: fields::timestamp(post),
            canonical,
        }
    }

    /// A container is worth a record when either the body or the author block
    /// was found.
    pub fn is_viable(&self) -> bool {
        self.text.is_ok() || self.author.is_ok()
    }

    /// Assemble the record, defaulting every failed field. Returns `None` when
    /// the container is not viable.
    pub fn into_record(self, now: DateTime<Utc>) -> Option<PostRecord> {
        if !self.is_viable() {
            return None;
        }

        let TextBody { text, hashtags } = self.text.unwrap_or(TextBody {
            text: String::new(),
            hashtags: Vec::new(),
        });
        let mut author = Author::default();
        if let Ok(name) = self.author {
            author.display_name = name.display_name;
            author.handle = name.handle;
        }
        author.avatar_url = self.avatar_url.unwrap_or_default();

        let source_time = self.created_at.ok();
        let (id, url) = match self.canonical {
            Ok(link) => (link.id, link.url),
            Err(_) => (
                fallback_id(&text, &author.handle, source_time.as_deref()),
                String::new(),
            ),
        };
        let created_at =
            source_time.unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));

        Some(PostRecord {
            id,
            text,
            hashtags,
            created_at,
            author,
            metrics: Metrics::default(),
            url,
        })
    }
}

/// Deterministic id for posts without a canonical link, so the same item seen
/// on two passes collapses to one entry. Only source data feeds the hash.
pub fn fallback_id(text: &str, handle: &str, source_time: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);
    hasher.update(handle.as_bytes());
    hasher.update([0u8]);
    hasher.update(source_time.unwrap_or_default().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", FALLBACK_ID_PREFIX, &digest[..16])
}

/// Extract every viable post from `tree`, using the current time for missing
/// timestamps.
pub fn extract<T: NodeTree>(tree: &T, base_url: &Url) -> Vec<PostRecord> {
    extract_at(tree, base_url, Utc::now())
}

pub fn extract_at<T: NodeTree>(tree: &T, base_url: &Url, now: DateTime<Utc>) -> Vec<PostRecord> {
    let containers = tree.find_all(Marker::PostContainer);
    let total = containers.len();

    let records: Vec<PostRecord> = containers
        .into_iter()
        .enumerate()
        .filter_map(|(idx, post)| {
            let fields = PostFields::collect(post, base_url);
            if !fields.is_viable() {
                debug!(
                    "skipping post container #{}: text={:?} author={:?}",
                    idx,
                    fields.text.as_ref().err(),
                    fields.author.as_ref().err()
                );
            }
            fields.into_record(now)
        })
        .collect();

    debug!("extracted {} records from {} containers", records.len(), total);
    records
}
