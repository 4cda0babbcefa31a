use std::collections::BTreeMap;

use serde::Serialize;

use crate::{SourceId, ValidationError};

/// Candidate business returned by a discovery source.
///
/// A record can only be built from a source id, so `sources` is never empty.
/// Fields filled after construction (merge, enrichment, email resolution)
/// always record the contributing source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessRecord {
    name: String,
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    sources: Vec<SourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_tier: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    payloads: BTreeMap<SourceId, serde_json::Value>,
}

/// Contact fields that can be filled after discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Phone,
    Website,
    Email,
}

impl BusinessRecord {
    pub fn new(
        source: SourceId,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ValidationError::EmptyBusinessName);
        }

        Ok(Self {
            name,
            address: address.into().trim().to_owned(),
            phone: None,
            website: None,
            email: None,
            sources: vec![source],
            rating: None,
            price_tier: None,
            category: None,
            payloads: BTreeMap::new(),
        })
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = non_blank(phone.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = non_blank(website.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_blank(email.into());
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Result<Self, ValidationError> {
        if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
            return Err(ValidationError::InvalidRating {
                value: rating.to_string(),
            });
        }
        self.rating = Some(rating);
        Ok(self)
    }

    pub fn with_price_tier(mut self, tier: u8) -> Self {
        self.price_tier = Some(tier);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = non_blank(category.into());
        self
    }

    /// Attaches the raw response of the originating source.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        let origin = self.sources[0].clone();
        self.payloads.insert(origin, payload);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    pub fn price_tier(&self) -> Option<u8> {
        self.price_tier
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn payloads(&self) -> &BTreeMap<SourceId, serde_json::Value> {
        &self.payloads
    }

    pub fn contact(&self, field: ContactField) -> Option<&str> {
        match field {
            ContactField::Phone => self.phone(),
            ContactField::Website => self.website(),
            ContactField::Email => self.email(),
        }
    }

    pub fn missing_contact(&self) -> bool {
        self.phone.is_none() || self.website.is_none() || self.email.is_none()
    }

    /// Key used for duplicate detection: trimmed, case-insensitive name.
    pub fn dedupe_key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn add_source(&mut self, source: SourceId) {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    /// Fills an empty contact field. Returns `false` when the field was already
    /// set or `value` is blank; the record is untouched in that case.
    pub fn fill_contact(&mut self, field: ContactField, value: &str, source: &SourceId) -> bool {
        let slot = match field {
            ContactField::Phone => &mut self.phone,
            ContactField::Website => &mut self.website,
            ContactField::Email => &mut self.email,
        };
        if slot.is_some() {
            return false;
        }
        let Some(value) = non_blank(value.to_owned()) else {
            return false;
        };

        *slot = Some(value);
        self.add_source(source.clone());
        true
    }

    /// Folds a duplicate into this record: provenance, raw payloads and any
    /// contact field this record lacks. Returns the fields that were filled.
    pub fn absorb(&mut self, duplicate: BusinessRecord) -> Vec<ContactField> {
        let contributor = duplicate.sources[0].clone();
        let mut filled = Vec::new();
        for field in [ContactField::Phone, ContactField::Website, ContactField::Email] {
            if let Some(value) = duplicate.contact(field) {
                if self.fill_contact(field, value, &contributor) {
                    filled.push(field);
                }
            }
        }

        for source in duplicate.sources {
            self.add_source(source);
        }
        for (source, payload) in duplicate.payloads {
            self.payloads.entry(source).or_insert(payload);
        }

        filled
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
