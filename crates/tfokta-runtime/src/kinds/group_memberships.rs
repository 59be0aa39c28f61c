//! `okta_group_memberships`: a set of users in one group.
//!
//! The instance id is the group id. Unless `track_all_users` is set, only
//! the users named in configuration are reported, so members added outside
//! of the provider never show up as drift. An instance without a `users`
//! attribute, as produced by import, reports every member.

use std::collections::HashSet;
use std::time::Duration;

use tracing::info;

use tfokta_client::ApiRequest;
use tfokta_core::{CallContext, OktaResult, RetryClass};

use crate::bundle::ClientBundle;
use crate::descriptor::{hook, ConsistencyWindow, Created, HookInput, ResourceDescriptor};
use crate::instance::Attributes;
use crate::kinds::ignore_not_found;
use crate::model::GroupMember;
use crate::setdiff::set_diff;

pub const NAME: &str = "okta_group_memberships";

pub const GROUP_ID: &str = "group_id";
pub const USERS: &str = "users";
pub const TRACK_ALL_USERS: &str = "track_all_users";

const PAGE_SIZE: &str = "200";

/// Window in which freshly added members may be missing from the listing.
const VISIBILITY_WINDOW: Duration = Duration::from_secs(60);

fn member_path(group_id: &str, user_id: &str) -> String {
    format!("/api/v1/groups/{group_id}/users/{user_id}")
}

async fn add_users(bundle: &ClientBundle, ctx: &CallContext, group_id: &str, users: &[String]) -> OktaResult<()> {
    for user in users {
        let request = ApiRequest::put(member_path(group_id, user)).retry_class(RetryClass::IdempotentWithConflict);
        bundle.client().execute_empty(ctx, &request).await?;
    }
    Ok(())
}

async fn remove_users(bundle: &ClientBundle, ctx: &CallContext, group_id: &str, users: &[String]) -> OktaResult<()> {
    for user in users {
        ignore_not_found(bundle.client().delete(ctx, &member_path(group_id, user)).await)?;
    }
    Ok(())
}

/// Users reported as observed, in configuration order first.
fn observed_users(desired: &[String], members: &[GroupMember], track_all: bool) -> Vec<String> {
    let present: HashSet<&str> = members.iter().map(|m| m.id.as_str()).collect();
    let mut users: Vec<String> = desired
        .iter()
        .filter(|u| present.contains(u.as_str()))
        .cloned()
        .collect();
    if track_all {
        let wanted: HashSet<&str> = desired.iter().map(String::as_str).collect();
        users.extend(
            members
                .iter()
                .filter(|m| !wanted.contains(m.id.as_str()))
                .map(|m| m.id.clone()),
        );
    }
    users
}

fn attributes(group_id: &str, users: Vec<String>, track_all: bool) -> Attributes {
    Attributes::new()
        .with(GROUP_ID, group_id)
        .with(USERS, users)
        .with(TRACK_ALL_USERS, track_all)
}

async fn create(input: HookInput) -> OktaResult<Created> {
    let desired = input.desired();
    let group_id = desired.require_str(GROUP_ID)?.to_string();
    let users = desired.get_strings(USERS);
    let track_all = desired.get_bool(TRACK_ALL_USERS).unwrap_or(false);

    add_users(&input.bundle, &input.ctx, &group_id, &users).await?;
    info!(group_id = %group_id, added = users.len(), "Added group members");
    Ok(Created {
        observed: attributes(&group_id, users, track_all),
        id: group_id,
    })
}

async fn read(input: HookInput) -> OktaResult<Attributes> {
    let group_id = input.id()?;
    let desired = input.desired().get_strings(USERS);
    let track_all = input.desired().get_bool(TRACK_ALL_USERS).unwrap_or(false);

    let report_all = track_all || !input.desired().has(USERS);

    let request = ApiRequest::get(format!("/api/v1/groups/{group_id}/users")).query("limit", PAGE_SIZE);
    let members: Vec<GroupMember> = input
        .bundle
        .client()
        .collect_all(&input.ctx, &request, |_: &[GroupMember]| false)
        .await?;

    Ok(attributes(group_id, observed_users(&desired, &members, report_all), track_all))
}

async fn update(input: HookInput) -> OktaResult<Attributes> {
    let group_id = input.id()?;
    let desired = input.desired().get_strings(USERS);
    let track_all = input.desired().get_bool(TRACK_ALL_USERS).unwrap_or(false);
    let current = input.observed().get_strings(USERS);

    let diff = set_diff(&current, &desired);
    if !diff.is_empty() {
        add_users(&input.bundle, &input.ctx, group_id, &diff.to_add).await?;
        remove_users(&input.bundle, &input.ctx, group_id, &diff.to_remove).await?;
        info!(
            group_id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            "Updated group members"
        );
    }
    Ok(attributes(group_id, desired, track_all))
}

async fn delete(input: HookInput) -> OktaResult<()> {
    let group_id = input.id()?;
    let mut users = input.observed().get_strings(USERS);
    if users.is_empty() {
        users = input.desired().get_strings(USERS);
    }
    remove_users(&input.bundle, &input.ctx, group_id, &users).await
}

fn all_visible(desired: &Attributes, observed: &Attributes) -> bool {
    let present: HashSet<String> = observed.get_strings(USERS).into_iter().collect();
    desired.get_strings(USERS).iter().all(|u| present.contains(u))
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(NAME, hook(create), hook(read), hook(delete))
        .update(hook(update))
        .consistency(ConsistencyWindow::until(VISIBILITY_WINDOW, all_visible))
}
