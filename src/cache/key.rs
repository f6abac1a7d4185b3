// file: src/cache/key.rs
// description: cache keys built from a function name and its arguments
// reference: https://docs.rs/url

use crate::error::{DatastoreError, Result};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Argument names mapped to their rendered values. Keys iterate sorted.
pub type CacheArgs = BTreeMap<String, String>;

/// `func|k1=v1&k2=v2` with the arguments sorted by name and form encoded.
pub fn generate_cache_key(func: &str, args: &CacheArgs) -> String {
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(args.iter())
        .finish();
    format!("{}|{}", func, encoded)
}

pub fn parse_cache_key(key: &str) -> Result<(String, CacheArgs)> {
    let (func, encoded) = key
        .split_once('|')
        .ok_or_else(|| DatastoreError::Cache(format!("Malformed cache key: {}", key)))?;
    let args = form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect();
    Ok((func.to_string(), args))
}

/// The subset of `all_args` named in `key_args`, or every argument when
/// no names are given.
pub fn select_key_args(all_args: &CacheArgs, key_args: Option<&[&str]>) -> CacheArgs {
    all_args
        .iter()
        .filter(|(name, _)| key_args.is_none_or(|keys| keys.contains(&name.as_str())))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
