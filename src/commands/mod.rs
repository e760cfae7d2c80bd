mod healthcheck;
mod init;
mod inspect;
mod search;

pub use healthcheck::{run_healthcheck, HealthcheckOptions, DEFAULT_QUERIES};
pub use init::init_config;
pub use inspect::inspect_store;
pub use search::search_index;

use anyhow::{Context, Result};
use serde_json::Value;

/// Parse a `--where` JSON predicate
pub fn parse_where(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|s| serde_json::from_str(s).with_context(|| format!("Invalid --where JSON: {}", s)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_where() {
        assert_eq!(parse_where(None).unwrap(), None);
        let value = parse_where(Some(r#"{"lang": "ro"}"#)).unwrap().unwrap();
        assert_eq!(value["lang"], "ro");
        assert!(parse_where(Some("{lang: ro}")).is_err());
    }
}
