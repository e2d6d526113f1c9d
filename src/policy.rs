//! Time-to-live policy deciding when cached clearance credentials stop being trusted.

// self
use crate::_prelude::*;

/// Default credential lifetime (30 minutes).
pub const DEFAULT_TTL: Duration = Duration::minutes(30);

/// Returns `true` when credentials acquired at `acquired_at` must no longer be used at `now`.
///
/// A missing acquisition instant means no credentials were ever acquired (or they were
/// invalidated) and is always expired. Otherwise the entry expires once its age strictly
/// exceeds `ttl`.
pub fn is_expired(acquired_at: Option<OffsetDateTime>, now: OffsetDateTime, ttl: Duration) -> bool {
	match acquired_at {
		None => true,
		Some(at) => now - at > ttl,
	}
}

/// Remaining lifetime clamped at zero; zero when nothing was acquired.
pub fn ttl_remaining(
	acquired_at: Option<OffsetDateTime>,
	now: OffsetDateTime,
	ttl: Duration,
) -> Duration {
	match acquired_at {
		None => Duration::ZERO,
		Some(at) => {
			let remaining = ttl - (now - at);

			if remaining.is_negative() { Duration::ZERO } else { remaining }
		},
	}
}
