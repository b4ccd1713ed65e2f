//! Records returned from training steps.
//!
//! A [`Record`] is a small key-value container filled by a
//! [`PolicyValueModel`](crate::PolicyValueModel) when it applies an update and by the agent
//! around it. It is the only way training information leaves the core; writing it to
//! files or dashboards is left to the caller.
//!
//! ```rust
//! use lis_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("loss", 0.5);
//! record.insert("grad_norm", RecordValue::Scalar(12.0));
//! assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
//! ```
mod base;
pub use base::{Record, RecordValue};
