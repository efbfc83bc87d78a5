pub mod category;
pub mod config;
pub mod mission;
pub mod profile;
pub mod project;
pub mod task;

pub use category::*;
pub use config::*;
pub use mission::*;
pub use profile::*;
pub use project::*;
pub use task::*;

use serde::{Deserialize, Deserializer};

/// Store rows carry `null` for unset columns; read those as the default.
/// Pair with `#[serde(default)]` so a missing key works too.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
