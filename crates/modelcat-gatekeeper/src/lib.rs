//! Modelcat Gatekeeper
//!
//! Checks the loosely typed field map returned by the upstream extraction
//! service against the field contract of the target entity kind.
//!
//! The Gatekeeper provides:
//! - Field contracts per entity kind (required/optional, type tag)
//! - The JSON schema handed upstream as the structured-output contract
//! - Presence and type validation with field-level rejection reasons
//! - Model name normalisation and lenient numeric coercion
//!
//! Validation is pure and synchronous. A rejected response is never retried.
//!
//! # Examples
//!
//! ```
//! use modelcat_domain::{Confidence, EntityKind};
//! use modelcat_gatekeeper::{ResponseValidator, ValidationConfig};
//! use serde_json::json;
//!
//! let validator = ResponseValidator::new(ValidationConfig::default());
//! let fields = json!({
//!     "model_name": "GPT 4",
//!     "description": "Multimodal model",
//!     "organization": null
//! });
//!
//! let entity = validator
//!     .validate(EntityKind::Model, fields.as_object().unwrap())
//!     .unwrap();
//! assert_eq!(entity.confidence, Confidence::Partial);
//! ```

#![warn(missing_docs)]

mod config;
mod contract;
mod error;
mod normalize;
mod validator;

pub use config::ValidationConfig;
pub use contract::{contract, schema_for, FieldSpec, FieldType};
pub use error::GatekeeperError;
pub use normalize::{normalize_model_name, parse_date};
pub use validator::{RejectionReason, ResponseValidator};
