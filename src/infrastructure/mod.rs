// Infrastructure: identifiers, security primitives, request extractors and
// clients for the external media, SMS and billing services.
pub mod billing;
pub mod id_generator;
pub mod media;
pub mod middleware;
pub mod security;
pub mod sms;

pub use billing::BillingProvider;
pub use id_generator::IdGenerator;
pub use media::{MediaStore, UploadFile};
pub use sms::OtpVerifier;
