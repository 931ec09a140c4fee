use time::{Duration, OffsetDateTime};

/// A non-positive or absent TTL means the item never expires.
pub fn expires_at_from_ttl(
	ttl_seconds: Option<i64>,
	now: OffsetDateTime,
) -> Option<OffsetDateTime> {
	ttl_seconds.filter(|ttl| *ttl > 0).map(|ttl| now + Duration::seconds(ttl))
}

pub fn is_expired(expires_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
	expires_at.map(|at| at <= now).unwrap_or(false)
}
