//! API request handlers

mod clusters;
mod health;
mod instances;
mod tenants;

pub use clusters::*;
pub use health::*;
pub use instances::*;
pub use tenants::*;

use crate::error::{ApiError, ApiResult};
use cmp_types::IdParseError;
use std::str::FromStr;

/// Parse a path identifier, prefixed (`cluster:<uuid>`) or bare
fn parse_id<T>(raw: &str) -> ApiResult<T>
where
    T: FromStr<Err = IdParseError>,
{
    raw.parse()
        .map_err(|e: IdParseError| ApiError::BadRequest(e.to_string()))
}
