//! Built-in resource kinds.
//!
//! Each submodule exposes `NAME` and a `descriptor()` constructor.

pub mod app_bookmark;
pub mod app_signon_policy;
pub mod auth_server_scope;
pub mod group_memberships;
pub mod link_definition;
pub mod profile_enrollment_apps;

use tfokta_core::OktaResult;

use crate::descriptor::ResourceDescriptor;

/// Every built-in descriptor.
pub fn all() -> Vec<ResourceDescriptor> {
    vec![
        app_bookmark::descriptor(),
        app_signon_policy::descriptor(),
        auth_server_scope::descriptor(),
        group_memberships::descriptor(),
        link_definition::descriptor(),
        profile_enrollment_apps::descriptor(),
    ]
}

/// Treat an absent sub-object as already handled.
pub(crate) fn ignore_not_found(result: OktaResult<()>) -> OktaResult<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
