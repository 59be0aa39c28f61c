//! `okta_link_definition`: a linked object definition on the user schema.
//!
//! The API rejects concurrent writes to linked object definitions, so every
//! mutation holds the `linked-object-definitions` lock. Definitions cannot be
//! modified in place.

use tfokta_core::OktaResult;

use crate::descriptor::{hook, Created, HookInput, ResourceDescriptor};
use crate::instance::Attributes;
use crate::locks::LINKED_OBJECT_LOCK;
use crate::model::{LinkedObject, LinkedObjectDetails};

pub const NAME: &str = "okta_link_definition";

const BASE_PATH: &str = "/api/v1/meta/schemas/user/linkedObjects";

fn details(desired: &Attributes, side: &str) -> OktaResult<LinkedObjectDetails> {
    let mut details = LinkedObjectDetails::new(
        desired.require_str(&format!("{side}_name"))?,
        desired.require_str(&format!("{side}_title"))?,
    );
    details.description = desired
        .get_str(&format!("{side}_description"))
        .map(str::to_string);
    Ok(details)
}

fn link_attributes(link: &LinkedObject) -> Attributes {
    let mut attributes = Attributes::new();
    for (side, details) in [("primary", &link.primary), ("associated", &link.associated)] {
        attributes.set(format!("{side}_name"), details.name.as_str());
        attributes.set(format!("{side}_title"), details.title.as_str());
        attributes.set_opt(format!("{side}_description"), details.description.as_deref());
    }
    attributes
}

async fn create(input: HookInput) -> OktaResult<Created> {
    let body = LinkedObject {
        primary: details(input.desired(), "primary")?,
        associated: details(input.desired(), "associated")?,
    };
    let link: LinkedObject = input.bundle.client().post(&input.ctx, BASE_PATH, &body).await?;
    Ok(Created {
        id: link.primary.name.clone(),
        observed: link_attributes(&link),
    })
}

async fn read(input: HookInput) -> OktaResult<Attributes> {
    let path = format!("{BASE_PATH}/{}", input.id()?);
    let link: LinkedObject = input.bundle.client().get(&input.ctx, &path).await?;
    Ok(link_attributes(&link))
}

async fn delete(input: HookInput) -> OktaResult<()> {
    let path = format!("{BASE_PATH}/{}", input.id()?);
    input.bundle.client().delete(&input.ctx, &path).await
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(NAME, hook(create), hook(read), hook(delete)).lock(LINKED_OBJECT_LOCK)
}
