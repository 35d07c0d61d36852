//! Model types shared by the reqkit HTTP layer.
//!
//! - [`ParamValue`]: the closed value universe of the request parameter store,
//!   with the coercion rules used by typed accessors.
//! - [`identify`] / [`scan`]: promotion of raw textual field values into
//!   composite values.
//! - [`Envelope`]: the fixed five-field JSON response wrapper.
//! - [`RequestError`] / [`FileError`]: error taxonomy for ingestion and access.

pub mod envelope;
pub mod error;
pub mod identify;
pub mod value;

pub use envelope::{Envelope, EnvelopeStatus};
pub use error::{BodyKind, Cardinality, FileError, RequestError};
pub use identify::{identify, scan};
pub use value::{ParamMap, ParamStore, ParamValue};
