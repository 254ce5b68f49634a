pub mod config;
pub mod duplicate;
pub mod events;
pub mod fingerprint;
pub mod hash;
pub mod perceptual;
pub mod scanner;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_support;
