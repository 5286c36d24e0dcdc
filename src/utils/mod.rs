pub mod async_helpers;
pub(crate) mod duration_millis;
