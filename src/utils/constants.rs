pub const SIGNATURE_HEADER: &str = "X-Licence-Signature";

/// Purchase events buffered between the poller/webhook and the worker.
pub const BILLING_CHANNEL_CAPACITY: usize = 256;

pub const CHANNEL_PREFIX: &str = "licence";
