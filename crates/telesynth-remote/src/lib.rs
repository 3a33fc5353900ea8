//! Telesynth Remote - Collaborators that talk to metrics backends
//!
//! - [`Publisher`]: destination for sample batches ([`HttpPublisher`],
//!   [`LogPublisher`], [`RecordingPublisher`])
//! - [`RangeQuery`]: source of historical series ([`HttpRangeQuery`],
//!   [`FixedRangeQuery`])
//! - [`push_to_all`]: per-destination fan-out with isolated failures

#![deny(unsafe_code)]

pub mod publisher;
pub mod query;

pub use publisher::{
    encode_json_lines, push_to_all, Delivery, HttpPublisher, LogPublisher, Publisher,
    RecordingPublisher,
};
pub use query::{FixedRangeQuery, HttpRangeQuery, RangeQuery};
