//! External collaborator contracts consumed by the core.
//!
//! Each module holds one service trait plus an in-memory stand-in for
//! tests. Concrete HTTP clients live outside this workspace; the traits
//! are the whole contract the core depends on.

pub mod email;
pub mod error;
pub mod payment;
pub mod shipping;
pub mod tax;

pub use email::{InMemoryMailer, Mailer, SentMail};
pub use error::ServiceError;
pub use payment::{Capture, CaptureLineItem, CaptureRequest, InMemoryPaymentGateway, PaymentGateway};
pub use shipping::{
    InMemoryShippingService, ParcelSpec, QuoteTemplate, Shipment, ShippingLabel, ShippingRate,
    ShippingService,
};
pub use tax::{InMemoryTaxService, TaxRateLine, TaxRates, TaxService};
