//! Okta entities used by the built-in resource kinds.

pub mod application;
pub mod group;
pub mod linked_object;
pub mod policy;
pub mod scope;

pub use application::{AppCommon, Application, BookmarkApplication, BookmarkSettings, GenericApplication};
pub use group::GroupMember;
pub use linked_object::{LinkedObject, LinkedObjectDetails};
pub use policy::Policy;
pub use scope::OAuthScope;

/// Last path segment of a `_links.<name>.href` value.
pub(crate) fn link_target(links: Option<&serde_json::Value>, name: &str) -> Option<String> {
    links?
        .get(name)?
        .get("href")?
        .as_str()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
