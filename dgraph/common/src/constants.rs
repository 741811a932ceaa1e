/// Default timeout forwarded with every query, in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 600;

pub const POINT_TYPENAME: &str = "Point";

pub const TYPENAME_KEY: &str = "__typename";
