//! OAuth identity reconciliation
//!
//! Turns a raw provider profile into the canonical user-creation record. Each
//! provider has its own profile shape; dispatch is by provider tag.

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

use crate::common::ApiError;
use crate::users::models::CreateUserRequest;

const PLACEHOLDER_PASSWORD_LEN: usize = 32;
/// Reserved for provider accounts that arrive without an email
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "oauth.invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    /// Unknown tags are rejected, never defaulted.
    pub fn parse(tag: &str) -> Result<Self, ApiError> {
        match tag {
            "google" => Ok(OAuthProvider::Google),
            "facebook" => Ok(OAuthProvider::Facebook),
            other => {
                warn!(provider = %other, "Rejected OAuth login for unsupported provider");
                Err(ApiError::Unauthorized(format!(
                    "Unsupported provider: {}",
                    other
                )))
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Facebook => "facebook",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{ "value": ... }` entries of passport-style `emails` / `photos` lists
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProfileValue {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GoogleProfile {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub emails: Vec<ProfileValue>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub photos: Vec<ProfileValue>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FacebookPictureData {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FacebookPicture {
    #[serde(default)]
    pub data: Option<FacebookPictureData>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FacebookProfile {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub emails: Vec<ProfileValue>,
    #[serde(default)]
    pub picture: Option<FacebookPicture>,
    #[serde(default)]
    pub photos: Vec<ProfileValue>,
}

#[derive(Debug, Clone)]
pub enum ProviderProfile {
    Google(GoogleProfile),
    Facebook(FacebookProfile),
}

/// Result of mapping: who the provider says this is, and how to create them locally
#[derive(Debug, Clone)]
pub struct MappedIdentity {
    pub provider: OAuthProvider,
    pub subject_id: String,
    pub user: CreateUserRequest,
}

impl ProviderProfile {
    /// Accepts either the provider's raw JSON or a passport-style wrapper that
    /// keeps the raw JSON under `_json`.
    pub fn from_raw(provider: OAuthProvider, raw: &Value) -> Result<Self, ApiError> {
        if !raw.is_object() {
            return Err(ApiError::Unauthorized(
                "Profile data is missing or incomplete".to_string(),
            ));
        }

        let source = raw.get("_json").filter(|v| v.is_object()).unwrap_or(raw);
        let outer_id = raw.get("id").and_then(value_to_string);
        let malformed = |e: serde_json::Error| {
            debug!(error = %e, provider = %provider, "OAuth profile did not match provider shape");
            ApiError::Unauthorized("Profile data is missing or incomplete".to_string())
        };

        let profile = match provider {
            OAuthProvider::Google => {
                let mut p: GoogleProfile =
                    serde_json::from_value(source.clone()).map_err(malformed)?;
                p.id = p.id.or(outer_id);
                ProviderProfile::Google(p)
            }
            OAuthProvider::Facebook => {
                let mut p: FacebookProfile =
                    serde_json::from_value(source.clone()).map_err(malformed)?;
                p.id = p.id.or(outer_id);
                ProviderProfile::Facebook(p)
            }
        };

        Ok(profile)
    }

    pub fn provider(&self) -> OAuthProvider {
        match self {
            ProviderProfile::Google(_) => OAuthProvider::Google,
            ProviderProfile::Facebook(_) => OAuthProvider::Facebook,
        }
    }

    /// Provider-assigned subject id, or the verified email when the profile
    /// carries no id
    pub fn subject_id(&self) -> Option<String> {
        match self {
            ProviderProfile::Google(p) => non_empty(&p.id)
                .or_else(|| non_empty(&p.sub))
                .or_else(|| non_empty(&p.email))
                .or_else(|| first_value(&p.emails)),
            ProviderProfile::Facebook(p) => non_empty(&p.id)
                .or_else(|| non_empty(&p.email))
                .or_else(|| first_value(&p.emails)),
        }
    }
}

/// Map a parsed provider profile into a user-creation record.
///
/// Missing usernames and emails fall back to values derived from the provider
/// subject id, so two incomplete profiles never collapse into one account.
pub fn map_profile(profile: &ProviderProfile) -> Result<MappedIdentity, ApiError> {
    let provider = profile.provider();
    let subject_id = profile.subject_id().ok_or_else(|| {
        warn!(provider = %provider, "OAuth profile has no subject id");
        ApiError::Unauthorized("Profile data is missing or incomplete".to_string())
    })?;

    let user = match profile {
        ProviderProfile::Google(p) => {
            let composed = join_names(&p.given_name, &p.family_name);
            CreateUserRequest {
                username: non_empty(&p.name)
                    .or_else(|| non_empty(&p.display_name))
                    .or(composed)
                    .unwrap_or_else(|| fallback_username(provider, &subject_id)),
                email: non_empty(&p.email)
                    .or_else(|| first_value(&p.emails))
                    .unwrap_or_else(|| fallback_email(provider, &subject_id)),
                password: generate_placeholder_password(),
                firstname: non_empty(&p.given_name),
                lastname: non_empty(&p.family_name),
                photo: non_empty(&p.picture).or_else(|| first_value(&p.photos)),
            }
        }
        ProviderProfile::Facebook(p) => CreateUserRequest {
            username: non_empty(&p.name)
                .or_else(|| non_empty(&p.display_name))
                .unwrap_or_else(|| fallback_username(provider, &subject_id)),
            email: non_empty(&p.email)
                .or_else(|| first_value(&p.emails))
                .unwrap_or_else(|| fallback_email(provider, &subject_id)),
            password: generate_placeholder_password(),
            firstname: non_empty(&p.first_name),
            lastname: non_empty(&p.last_name),
            photo: p
                .picture
                .as_ref()
                .and_then(|pic| pic.data.as_ref())
                .and_then(|data| non_empty(&data.url))
                .or_else(|| first_value(&p.photos)),
        },
    };

    Ok(MappedIdentity {
        provider,
        subject_id,
        user,
    })
}

/// Username used when the mapped one already belongs to a different account
pub fn disambiguated_username(username: &str, provider: OAuthProvider, subject_id: &str) -> String {
    format!("{}_{}_{}", username, provider, subject_id)
}

fn fallback_username(provider: OAuthProvider, subject_id: &str) -> String {
    format!("{}_{}", provider, subject_id)
}

fn fallback_email(provider: OAuthProvider, subject_id: &str) -> String {
    format!("{}-{}@{}", provider, subject_id, PLACEHOLDER_EMAIL_DOMAIN)
}

/// OAuth accounts sign in through their provider; this password is never shown
/// to anyone and only exists to keep the password column populated.
fn generate_placeholder_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PLACEHOLDER_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_value(values: &[ProfileValue]) -> Option<String> {
    values.iter().find_map(|v| non_empty(&v.value))
}

fn join_names(first: &Option<String>, last: &Option<String>) -> Option<String> {
    let joined = [non_empty(first), non_empty(last)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}
