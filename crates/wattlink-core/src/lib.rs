pub mod billing;
pub mod envelope;
pub mod ids;
pub mod reading;

pub use billing::{BillingRates, ReadingSummary};
pub use envelope::{EnvelopeError, InboundKind, InboundMessage, OutboundMessage};
pub use ids::{ConnectionId, DeviceId};
pub use reading::{NewReading, Reading};
