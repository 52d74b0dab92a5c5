//! Core types shared across Vouch components.

use serde::{Deserialize, Serialize};

/// Phase of a verified-submission flow.
///
/// Motion is strictly forward except for the single explicit
/// "wrong email, go back" transition from `Verifying` to `Identity`.
/// `Closed` is terminal; a closed session is removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Collecting name and email
    Identity,
    /// Code dispatched, waiting for the 6 digits
    Verifying,
    /// Email proven, collecting the testimonial body
    Content,
    /// Flow finished or cancelled
    Closed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Display name used in phase-mismatch errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Verifying => "verifying",
            Self::Content => "content",
            Self::Closed => "closed",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::Identity
    }
}

/// Captured submitter identity. Both fields are required non-empty;
/// the email is syntactically unchecked (the Code Store is the authority).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// Star rating (1-5)
///
/// Defaults to 5 when the submitter never touches the selector. That bias
/// is carried over from the product as-is; see DESIGN.md before changing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: Rating = Rating(1);
    pub const MAX: Rating = Rating(5);

    /// Create a new Rating, clamping to valid range [1, 5]
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 5))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self::MAX
    }
}

impl From<u8> for Rating {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

/// A finished, verified testimonial ready to be persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestimonialDraft {
    pub name: String,
    pub email: String,

    /// Free-text body (the only hard-required content field)
    pub content: String,

    pub rating: Rating,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The canonical stored representation returned by the Submission Store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testimonial {
    /// Server-assigned identifier
    pub id: String,

    pub name: String,
    pub email: String,
    pub content: String,
    pub rating: Rating,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Creation timestamp (Unix epoch seconds)
    pub created_at: i64,
}

impl Testimonial {
    /// Build the stored record from a draft plus server-assigned fields
    pub fn from_draft(id: String, draft: TestimonialDraft) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            content: draft.content,
            rating: draft.rating,
            role: draft.role,
            company: draft.company,
            phone: draft.phone,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}
