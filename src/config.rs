use crate::error::{CreditError, Result};
use crate::field_update::UpdateSemantics;
use crate::schedule::RoundingPolicy;
use crate::store::StorageBackend;
use lazy_static::lazy_static;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub db_pool_size: usize,
    pub bind_addr: String,
    pub rounding_policy: RoundingPolicy,
    pub update_semantics: UpdateSemantics,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageBackend::default(),
            database_url: None,
            db_pool_size: 5,
            bind_addr: "0.0.0.0:5000".to_string(),
            rounding_policy: RoundingPolicy::default(),
            update_semantics: UpdateSemantics::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a variable lookup. Unset and empty variables
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let var = |key: &str| lookup(key).filter(|val| !val.is_empty());
        let defaults = Config::default();

        let storage = parse_var(&var, "STORAGE")?.unwrap_or(defaults.storage);
        let database_url = var("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(CreditError::Config(
                "DATABASE_URL must be set for postgres storage".to_string(),
            ));
        }
        let db_pool_size = parse_var(&var, "DB_POOL_SIZE")?.unwrap_or(defaults.db_pool_size);
        let bind_addr = match parse_var::<u16>(&var, "PORT")? {
            Some(port) => format!("0.0.0.0:{}", port),
            None => defaults.bind_addr,
        };
        let rounding_policy =
            parse_var(&var, "ROUNDING_POLICY")?.unwrap_or(defaults.rounding_policy);
        let update_semantics =
            parse_var(&var, "UPDATE_SEMANTICS")?.unwrap_or(defaults.update_semantics);

        Ok(Config {
            storage,
            database_url,
            db_pool_size,
            bind_addr,
            rounding_policy,
            update_semantics,
        })
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    var(key)
        .map(|val| {
            val.parse::<T>()
                .map_err(|_| CreditError::Config(format!("invalid {}: {:?}", key, val)))
        })
        .transpose()
}

lazy_static! {
    pub static ref CONFIG: Config = Config::from_env().expect("Invalid configuration");
}
