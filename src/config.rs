use std::collections::BTreeMap;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{candidates::CandidateDirectory, role::Role};
use crate::store::{ensure_indexes_exist, MongoVoterStore, Store};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_auth_ttl")]
    pub(crate) auth_ttl: u32,
    #[serde(default)]
    pub(crate) candidates: Option<BTreeMap<String, Vec<String>>>,
    // secrets
    pub(crate) jwt_secret: String,
}

fn default_auth_ttl() -> u32 {
    24 * 60 * 60
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// The configured candidate slate, or the built-in one if none is set.
    pub fn candidate_directory(&self) -> Result<CandidateDirectory> {
        let Some(slates) = &self.candidates else {
            return Ok(CandidateDirectory::default());
        };
        let mut by_role = BTreeMap::new();
        for (name, slate) in slates {
            let role = name
                .parse::<Role>()
                .map_err(|_| Error::InvalidDirectory(format!("unknown role '{name}'")))?;
            by_role.insert(role, slate.clone());
        }
        CandidateDirectory::new(by_role)
    }
}

/// A fairing that loads the application config and candidate slate, and
/// puts both in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Load the slate.
        let directory = match config.candidate_directory() {
            Ok(directory) => directory,
            Err(e) => {
                error!("{e}");
                return Err(rocket);
            }
        };
        for role in Role::ALL {
            info!("Candidates for {role}: {:?}", directory.slate(role));
        }

        // Manage the state.
        rocket = rocket.manage(config).manage(directory);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the voter indexes exist, and places a [`Store`] into managed
/// state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(Store::new(MongoVoterStore::from_db(&db)));
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
pub(crate) fn get_database_name() -> String {
    "ballot".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        /// The raw configuration form of a directory.
        pub fn slates(directory: &CandidateDirectory) -> BTreeMap<String, Vec<String>> {
            directory
                .to_map()
                .into_iter()
                .map(|(role, slate)| (role.to_string(), slate))
                .collect()
        }

        pub fn example() -> Self {
            Self {
                auth_ttl: 60,
                candidates: Some(Self::slates(&CandidateDirectory::example())),
                jwt_secret: "test-secret".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn configured_slate_overrides_default() {
        let config = Config::example();
        assert_eq!(CandidateDirectory::example(), config.candidate_directory().unwrap());

        let config = Config {
            candidates: None,
            ..Config::example()
        };
        assert_eq!(CandidateDirectory::default(), config.candidate_directory().unwrap());
    }

    #[test]
    fn extract_from_figment() {
        let figment = Figment::new()
            .merge(Serialized::default("jwt_secret", "secret"))
            .merge(Serialized::default(
                "candidates",
                Config::slates(&CandidateDirectory::example()),
            ));
        let config = figment.extract::<Config>().unwrap();
        assert_eq!(Duration::days(1), config.auth_ttl());
        assert_eq!(b"secret", config.jwt_secret());
        assert_eq!(CandidateDirectory::example(), config.candidate_directory().unwrap());
    }

    #[test]
    fn reject_broken_slate() {
        let mut slates = Config::slates(&CandidateDirectory::example());
        slates.insert("president".into(), vec![]);
        let config = Config {
            candidates: Some(slates),
            ..Config::example()
        };
        assert!(config.candidate_directory().is_err());

        let mut slates = Config::slates(&CandidateDirectory::example());
        slates.insert("mayor".into(), vec!["Zed".into()]);
        let config = Config {
            candidates: Some(slates),
            ..Config::example()
        };
        assert!(matches!(
            config.candidate_directory(),
            Err(Error::InvalidDirectory(_))
        ));
    }
}
