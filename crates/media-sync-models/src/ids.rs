/// Stable remote identifier. Authoritative for every entity kind.
pub type TraktId = i64;

/// Secondary metadata identifier, carried for cross-referencing only.
pub type TmdbId = i64;

/// Placeholder for an identifier that could not be resolved.
pub const UNKNOWN_ID: i64 = -1;
