//! Core protocol types for OData batch payloads.
//!
//! This crate provides the pieces of the batch protocol that carry no I/O and
//! no writer state of their own. They are shared by the batch writer in
//! `odata-batch` and by anything else that needs to reason about batch
//! sequencing.
//!
//! ## Modules
//!
//! - `error`: Error taxonomy and in-stream error payloads
//! - `state`: Writer states and the transition table
//! - `quotas`: Batch and changeset size quotas
//! - `content_id`: Changeset-scoped Content-ID registry
//! - `uri`: Operation request URI resolution
//! - `method`: HTTP method validation for embedded requests

mod content_id;
mod error;
mod method;
mod quotas;
mod state;
mod uri;

pub use content_id::*;
pub use error::*;
pub use method::*;
pub use quotas::*;
pub use state::*;
pub use uri::*;
