pub(crate) mod config;
pub(crate) mod device;
pub(crate) mod host;
pub(crate) mod index;
