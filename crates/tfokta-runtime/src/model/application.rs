//! Applications, tagged by `signOnMode`.
//!
//! The list endpoint returns every application type in one array. Known
//! sign-on modes decode into their own variant; anything else is kept as raw
//! JSON in [`Application::Unknown`] so that listing never fails on a new type.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tfokta_core::LifecycleStatus;

use super::link_target;

const TAG: &str = "signOnMode";

pub const BOOKMARK: &str = "BOOKMARK";
pub const SAML_2_0: &str = "SAML_2_0";
pub const OPENID_CONNECT: &str = "OPENID_CONNECT";
pub const BASIC_AUTH: &str = "BASIC_AUTH";
pub const AUTO_LOGIN: &str = "AUTO_LOGIN";
pub const SECURE_PASSWORD_STORE: &str = "SECURE_PASSWORD_STORE";

/// Fields shared by every application type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, rename = "_links", skip_serializing)]
    pub links: Option<Value>,
}

impl AppCommon {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            label: label.into(),
            status: None,
            links: None,
        }
    }
}

/// `settings.app` of a bookmark application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkSettings {
    pub url: String,
    #[serde(default)]
    pub request_integration: bool,
}

/// Wrapper for the `settings.app` nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings<T> {
    pub app: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkApplication {
    #[serde(flatten)]
    pub common: AppCommon,
    pub settings: AppSettings<BookmarkSettings>,
}

impl BookmarkApplication {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            common: AppCommon::new("bookmark", label),
            settings: AppSettings {
                app: BookmarkSettings {
                    url: url.into(),
                    request_integration: false,
                },
            },
        }
    }
}

/// Application type whose specific fields are carried untyped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericApplication {
    #[serde(flatten)]
    pub common: AppCommon,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Application {
    Bookmark(BookmarkApplication),
    Saml(GenericApplication),
    OpenIdConnect(GenericApplication),
    BasicAuth(GenericApplication),
    AutoLogin(GenericApplication),
    SecurePasswordStore(GenericApplication),
    /// Unrecognised sign-on mode, raw body.
    Unknown(Value),
}

impl Application {
    pub fn sign_on_mode(&self) -> Option<&str> {
        match self {
            Application::Bookmark(_) => Some(BOOKMARK),
            Application::Saml(_) => Some(SAML_2_0),
            Application::OpenIdConnect(_) => Some(OPENID_CONNECT),
            Application::BasicAuth(_) => Some(BASIC_AUTH),
            Application::AutoLogin(_) => Some(AUTO_LOGIN),
            Application::SecurePasswordStore(_) => Some(SECURE_PASSWORD_STORE),
            Application::Unknown(raw) => raw.get(TAG).and_then(Value::as_str),
        }
    }

    pub fn common(&self) -> Option<&AppCommon> {
        match self {
            Application::Bookmark(app) => Some(&app.common),
            Application::Saml(app)
            | Application::OpenIdConnect(app)
            | Application::BasicAuth(app)
            | Application::AutoLogin(app)
            | Application::SecurePasswordStore(app) => Some(&app.common),
            Application::Unknown(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Application::Unknown(raw) => raw.get("id").and_then(Value::as_str),
            _ => self.common().and_then(|c| c.id.as_deref()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Application::Unknown(raw) => raw.get("label").and_then(Value::as_str),
            _ => self.common().map(|c| c.label.as_str()),
        }
    }

    pub fn lifecycle(&self) -> Option<LifecycleStatus> {
        let status = match self {
            Application::Unknown(raw) => raw.get("status").and_then(Value::as_str),
            _ => self.common().and_then(|c| c.status.as_deref()),
        };
        status.and_then(LifecycleStatus::parse)
    }

    /// Id of the access policy the application is bound to.
    pub fn access_policy_id(&self) -> Option<String> {
        let links = match self {
            Application::Unknown(raw) => raw.get("_links"),
            _ => self.common().and_then(|c| c.links.as_ref()),
        };
        link_target(links, "accessPolicy")
    }

    pub fn as_bookmark(&self) -> Option<&BookmarkApplication> {
        match self {
            Application::Bookmark(app) => Some(app),
            _ => None,
        }
    }
}

fn variant<T: DeserializeOwned, E: de::Error>(mut value: Value) -> Result<T, E> {
    if let Value::Object(map) = &mut value {
        map.remove(TAG);
    }
    serde_json::from_value(value).map_err(<E as de::Error>::custom)
}

impl<'de> Deserialize<'de> for Application {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let mode = value.get(TAG).and_then(Value::as_str).map(str::to_string);

        match mode.as_deref() {
            Some(BOOKMARK) => variant(value).map(Application::Bookmark),
            Some(SAML_2_0) => variant(value).map(Application::Saml),
            Some(OPENID_CONNECT) => variant(value).map(Application::OpenIdConnect),
            Some(BASIC_AUTH) => variant(value).map(Application::BasicAuth),
            Some(AUTO_LOGIN) => variant(value).map(Application::AutoLogin),
            Some(SECURE_PASSWORD_STORE) => variant(value).map(Application::SecurePasswordStore),
            _ => Ok(Application::Unknown(value)),
        }
    }
}

impl Serialize for Application {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            Application::Bookmark(app) => serde_json::to_value(app),
            Application::Saml(app)
            | Application::OpenIdConnect(app)
            | Application::BasicAuth(app)
            | Application::AutoLogin(app)
            | Application::SecurePasswordStore(app) => serde_json::to_value(app),
            Application::Unknown(raw) => return raw.serialize(serializer),
        };
        let mut body = body.map_err(<S::Error as ser::Error>::custom)?;
        if let (Value::Object(map), Some(mode)) = (&mut body, self.sign_on_mode()) {
            map.insert(TAG.to_string(), Value::String(mode.to_string()));
        }
        body.serialize(serializer)
    }
}
