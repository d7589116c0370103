//! Core tuning options
//!
//! All knobs have defaults matching the reference behaviour; hosts may load
//! overrides from TOML:
//!
//! ```toml
//! hash_packed_max = 8
//! inline_cache_limit = 4
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating options
#[derive(Debug, Error)]
pub enum OptionsError {
    /// The TOML source did not parse
    #[error("invalid options: {0}")]
    Parse(#[from] toml::de::Error),

    /// A limit that must be positive was zero
    #[error("option `{0}` must be greater than zero")]
    Zero(&'static str),

    /// Load factor outside `(0, 1]`
    #[error("bucket_load_factor must be in (0, 1], got {0}")]
    LoadFactor(f64),
}

/// Tuning options for containers, hashing and specialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreOptions {
    /// Maximum pairs held by a packed hash before it moves to buckets
    pub hash_packed_max: usize,

    /// Smallest physical capacity an array grows to
    pub array_min_capacity: usize,

    /// Entries a call-site cache holds before going megamorphic
    pub inline_cache_limit: usize,

    /// Narrow bignum results that fit in a fixnum
    pub demote_bignums: bool,

    /// Bucketed hashes re-grow once `len / buckets` exceeds this
    pub bucket_load_factor: f64,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            hash_packed_max: 8,
            array_min_capacity: 16,
            inline_cache_limit: 4,
            demote_bignums: true,
            bucket_load_factor: 0.75,
        }
    }
}

impl CoreOptions {
    /// Parse and validate options from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, OptionsError> {
        let options: CoreOptions = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Check every limit is usable
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.hash_packed_max == 0 {
            return Err(OptionsError::Zero("hash_packed_max"));
        }
        if self.array_min_capacity == 0 {
            return Err(OptionsError::Zero("array_min_capacity"));
        }
        if self.inline_cache_limit == 0 {
            return Err(OptionsError::Zero("inline_cache_limit"));
        }
        if !(self.bucket_load_factor > 0.0 && self.bucket_load_factor <= 1.0) {
            return Err(OptionsError::LoadFactor(self.bucket_load_factor));
        }
        Ok(())
    }

    /// Set the packed hash limit
    pub fn with_hash_packed_max(mut self, max: usize) -> Self {
        self.hash_packed_max = max;
        self
    }

    /// Set the smallest capacity allocated when an array grows
    pub fn with_array_min_capacity(mut self, capacity: usize) -> Self {
        self.array_min_capacity = capacity;
        self
    }

    /// Set the inline cache bound
    pub fn with_inline_cache_limit(mut self, limit: usize) -> Self {
        self.inline_cache_limit = limit;
        self
    }

    /// Enable or disable bignum demotion
    pub fn with_demotion(mut self, demote: bool) -> Self {
        self.demote_bignums = demote;
        self
    }
}
