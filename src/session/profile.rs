//! Profile projection from identity-token claims
//!
//! Claim fallbacks are ordered candidate lists: the first claim holding a
//! non-empty value wins, otherwise the documented default (if any) applies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::identity::{AuthError, IdentityClient, TokenKind};
use super::page::{Page, UserDisplay};

/// Claims consulted, in order, for the display name
pub const DISPLAY_NAME_CLAIMS: &[&str] = &["name", "email"];

/// Claims consulted, in order, for the organization
pub const ORGANIZATION_CLAIMS: &[&str] = &["org", "organization"];

/// Organization shown when the token carries no organization claim
pub const DEFAULT_ORGANIZATION: &str = "Cofense";

pub const SUBJECT_CLAIM: &str = "sub";
pub const EMAIL_CLAIM: &str = "email";
pub const COMPANY_ID_CLAIM: &str = "company_id";
pub const GROUPS_CLAIM: &str = "groups";

const MAX_INITIALS: usize = 2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("No ID token found")]
    MissingIdentityToken,

    #[error("ID token has no usable '{0}' claim")]
    MissingClaim(&'static str),

    #[error(transparent)]
    Identity(#[from] AuthError),
}

/// Read-only claim set carried by an identity token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims(Map<String, Value>);

impl IdentityClaims {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Claim rendered as text; numbers are stringified, blanks count as absent
    pub fn text(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// First candidate claim with a usable text value
    pub fn first_text(&self, candidates: &[&str]) -> Option<String> {
        candidates.iter().find_map(|name| self.text(name))
    }

    /// String entries of an array claim; absent or non-array yields empty
    pub fn strings(&self, name: &str) -> Vec<String> {
        match self.0.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }
}

/// Display-oriented user record for the current page load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub display_name: String,
    pub email: String,
    pub subject_id: String,
    pub organization: String,
    pub company_id: Option<String>,
    pub groups: Vec<String>,
}

impl UserProfile {
    pub fn from_claims(claims: &IdentityClaims) -> Result<Self, ProfileError> {
        let display_name = claims
            .first_text(DISPLAY_NAME_CLAIMS)
            .ok_or(ProfileError::MissingClaim("name"))?;
        let subject_id = claims
            .text(SUBJECT_CLAIM)
            .ok_or(ProfileError::MissingClaim(SUBJECT_CLAIM))?;

        Ok(Self {
            display_name,
            email: claims.text(EMAIL_CLAIM).unwrap_or_default(),
            subject_id,
            organization: claims
                .first_text(ORGANIZATION_CLAIMS)
                .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
            company_id: claims.text(COMPANY_ID_CLAIM),
            groups: claims.strings(GROUPS_CLAIM),
        })
    }

    pub fn initials(&self) -> String {
        initials(&self.display_name)
    }

    pub fn display(&self) -> UserDisplay {
        UserDisplay {
            name: self.display_name.clone(),
            organization: self.organization.clone(),
            initials: self.initials(),
        }
    }
}

/// First letter of each space-separated name segment, uppercased, at most two
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|segment| segment.chars().next())
        .collect::<String>()
        .to_uppercase()
        .chars()
        .take(MAX_INITIALS)
        .collect()
}

/// Build the profile from the stored identity token
pub async fn load_profile<C: IdentityClient>(client: &C) -> Result<UserProfile, ProfileError> {
    let claims = client
        .get_token(TokenKind::Id)
        .await?
        .and_then(|token| token.claims)
        .filter(|claims| !claims.is_empty())
        .ok_or(ProfileError::MissingIdentityToken)?;

    UserProfile::from_claims(&claims)
}

/// Push the profile's display fields onto the page
pub fn render_profile<P: Page>(page: &mut P, profile: &UserProfile) {
    page.display_user(&profile.display());
}
