use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::duration::{DurationUnit, RentalTerm};

/// Identifier wrapper for submitted rental requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RentalRequestId(pub String);

impl fmt::Display for RentalRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl RentalRequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Identifier wrapper for provisioned rentals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveRentalId(pub String);

impl fmt::Display for ActiveRentalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ActiveRentalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Short public key a live site is served under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(pub String);

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Slug {
    pub const LEN: usize = 8;

    pub fn generate() -> Self {
        let mut raw = Uuid::new_v4().simple().to_string();
        raw.truncate(Self::LEN);
        Self(raw)
    }

    pub fn public_path(&self) -> String {
        format!("/rental/{}", self.0)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_theme() -> String {
    "blue".to_string()
}

/// Content rendered on the tenant's microsite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logo: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            description: String::new(),
            services: Vec::new(),
            logo: String::new(),
            theme: default_theme(),
            social_links: BTreeMap::new(),
        }
    }
}

/// Intake payload posted by a prospective tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalSubmission {
    pub business_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub duration: String,
    pub business_data: BusinessProfile,
}

/// Review state of a rental request. Only `Pending` may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Active,
    Rejected,
}

impl RentalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RentalStatus::Pending => "pending",
            RentalStatus::Active => "active",
            RentalStatus::Rejected => "rejected",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Audit record of a tenant application; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    pub id: RentalRequestId,
    pub business_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub duration: String,
    pub duration_type: DurationUnit,
    pub duration_value: u32,
    pub price: String,
    pub status: RentalStatus,
    pub request_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub unique_slug: Slug,
    pub business_data: BusinessProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalRequest {
    pub fn pending(
        submission: RentalSubmission,
        id: RentalRequestId,
        slug: Slug,
        now: DateTime<Utc>,
    ) -> Self {
        let term = RentalTerm::parse(&submission.duration);
        Self {
            id,
            business_name: submission.business_name,
            contact_email: submission.contact_email,
            contact_phone: submission.contact_phone,
            duration: submission.duration,
            duration_type: term.unit,
            duration_value: term.count,
            price: term.price.to_string(),
            status: RentalStatus::Pending,
            request_date: now,
            approval_date: None,
            expiration_date: None,
            unique_slug: slug,
            business_data: submission.business_data,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RentalStatus::Pending
    }

    pub fn expiration_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        super::duration::expires_at(self.duration_type, self.duration_value, now)
    }
}

/// A provisioned, publicly addressable site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRental {
    pub id: ActiveRentalId,
    pub rental_request_id: RentalRequestId,
    pub slug: Slug,
    pub business_name: String,
    pub business_data: BusinessProfile,
    pub expiration_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl ActiveRental {
    pub fn provision(
        request: &RentalRequest,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActiveRentalId::generate(),
            rental_request_id: request.id.clone(),
            slug: request.unique_slug.clone(),
            business_name: request.business_name.clone(),
            business_data: request.business_data.clone(),
            expiration_date: expires_at,
            is_active: true,
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expiration_date
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now
    }

    pub fn public_view(&self) -> PublicRental {
        PublicRental {
            business_name: self.business_name.clone(),
            business_data: self.business_data.clone(),
            expiration_date: self.expiration_date,
            is_active: self.is_active,
        }
    }
}

/// What anonymous visitors see; internal identifiers stay private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRental {
    pub business_name: String,
    pub business_data: BusinessProfile,
    pub expiration_date: DateTime<Utc>,
    pub is_active: bool,
}

/// Administrator verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ApprovalDecision {
    pub approved: bool,
}

/// Result of deciding a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved {
        request: RentalRequest,
        rental: ActiveRental,
    },
    Rejected {
        request: RentalRequest,
    },
}

impl ApprovalOutcome {
    pub fn request(&self) -> &RentalRequest {
        match self {
            ApprovalOutcome::Approved { request, .. } | ApprovalOutcome::Rejected { request } => {
                request
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_defaults_fill_missing_fields() {
        let profile: BusinessProfile =
            serde_json::from_value(json!({ "description": null, "services": ["Cortes"] }))
                .expect("profile parses");
        assert_eq!(profile.description, "");
        assert_eq!(profile.services, vec!["Cortes".to_string()]);
        assert_eq!(profile.theme, "blue");
        assert!(profile.social_links.is_empty());
    }

    #[test]
    fn request_serializes_with_camel_case_fields() {
        let submission = RentalSubmission {
            business_name: "Acme".to_string(),
            contact_email: "a@x.com".to_string(),
            contact_phone: "555".to_string(),
            duration: "3 meses".to_string(),
            business_data: BusinessProfile::default(),
        };
        let now = Utc::now();
        let request = RentalRequest::pending(
            submission,
            RentalRequestId("req-1".to_string()),
            Slug("abcd1234".to_string()),
            now,
        );

        let value = serde_json::to_value(&request).expect("serializes");
        assert_eq!(value["id"], "req-1");
        assert_eq!(value["businessName"], "Acme");
        assert_eq!(value["durationType"], "month");
        assert_eq!(value["durationValue"], 3);
        assert_eq!(value["price"], "$1000");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["uniqueSlug"], "abcd1234");
        assert!(value["approvalDate"].is_null());
    }

    #[test]
    fn generated_slugs_are_eight_characters() {
        let slug = Slug::generate();
        assert_eq!(slug.0.len(), Slug::LEN);
        assert_eq!(slug.public_path(), format!("/rental/{}", slug.0));
    }
}
