//! Queryable view over one rendered page state.
//!
//! The extractor only talks to [`NodeTree`] / [`PostNode`]; [`Snapshot`] is the
//! `scraper`-backed implementation used at runtime and in tests.

use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Structural markers the extractor queries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// One discrete feed item.
    PostContainer,
    /// Body text of a post.
    TextBody,
    /// Display-name / handle block.
    AuthorName,
    /// Avatar wrapper.
    Avatar,
    Image,
    /// Machine-readable timestamp.
    Time,
    Link,
}

impl Marker {
    const ALL: [Marker; 7] = [
        Marker::PostContainer,
        Marker::TextBody,
        Marker::AuthorName,
        Marker::Avatar,
        Marker::Image,
        Marker::Time,
        Marker::Link,
    ];

    /// CSS selector source for this marker.
    pub fn css(self) -> &'static str {
        match self {
            Marker::PostContainer => r#"article[data-testid="tweet"]"#,
            Marker::TextBody => r#"div[data-testid="tweetText"]"#,
            Marker::AuthorName => r#"div[data-testid="User-Name"]"#,
            Marker::Avatar => r#"div[data-testid="Tweet-User-Avatar"]"#,
            Marker::Image => "img",
            Marker::Time => "time",
            Marker::Link => "a",
        }
    }

    pub fn selector(self) -> &'static Selector {
        static SELECTORS: OnceLock<Vec<Selector>> = OnceLock::new();
        let all = SELECTORS.get_or_init(|| {
            Marker::ALL
                .iter()
                .map(|m| Selector::parse(m.css()).expect("valid marker selector"))
                .collect()
        });
        &all[self as usize]
    }
}

/// A node inside a snapshot that supports typed queries.
pub trait PostNode<'a>: Copy + 'a {
    /// First descendant matching `marker`.
    fn find_first(self, marker: Marker) -> Option<Self>;
    /// All descendants matching `marker`, in document order.
    fn find_all(self, marker: Marker) -> Vec<Self>;
    fn attr(self, name: &str) -> Option<&'a str>;
    /// Descendant text nodes, in document order, untrimmed.
    fn text_segments(self) -> Vec<&'a str>;
}

/// A whole rendered page that can enumerate top-level markers.
pub trait NodeTree {
    type Node<'a>: PostNode<'a>
    where
        Self: 'a;

    fn find_all(&self, marker: Marker) -> Vec<Self::Node<'_>>;
}

impl<'a> PostNode<'a> for ElementRef<'a> {
    fn find_first(self, marker: Marker) -> Option<Self> {
        self.select(marker.selector()).next()
    }

    fn find_all(self, marker: Marker) -> Vec<Self> {
        self.select(marker.selector()).collect()
    }

    fn attr(self, name: &str) -> Option<&'a str> {
        self.value().attr(name)
    }

    fn text_segments(self) -> Vec<&'a str> {
        self.text().collect()
    }
}

/// Parsed HTML captured from the live page.
pub struct Snapshot {
    html: Html,
}

impl Snapshot {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot").finish_non_exhaustive()
    }
}

impl NodeTree for Snapshot {
    type Node<'a> = ElementRef<'a>;

    fn find_all(&self, marker: Marker) -> Vec<ElementRef<'_>> {
        self.html.select(marker.selector()).collect()
    }
}
