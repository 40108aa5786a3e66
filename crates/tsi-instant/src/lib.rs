//! TSI Instant - timezone-independent points in time
//!
//! The unit every round-trip check preserves:
//! - [`Instant`]: absolute tick count (milliseconds since the Unix epoch)
//! - [`AmbientTimezone`]: injectable zone used only for local rendering
//! - [`Clock`]: source of "now", swappable for a fixed instant in tests
//!
//! # Example
//!
//! ```rust,ignore
//! use tsi_instant::{AmbientTimezone, Instant};
//!
//! let tz = AmbientTimezone::parse("Europe/London")?;
//! let t0 = Instant::from_millis(1_757_422_142_605);
//!
//! let _guard = tz.scoped(chrono_tz::America::Los_Angeles);
//! println!("{}", t0.render_local(&tz)); // rendering changes, t0 does not
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clock;
pub mod error;
pub mod instant;
pub mod timezone;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::TimezoneError;
pub use instant::Instant;
pub use timezone::{AmbientTimezone, TimezoneGuard, TimezonePlan};

/// Re-export so downstream crates name zones without a direct dependency
pub use chrono_tz::Tz;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
