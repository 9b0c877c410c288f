//! 外部接入：HTTP（需 feature `web`）

#[cfg(feature = "web")]
pub mod http;
