#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{figment::Figment, Build, Rocket};

pub mod api;
pub mod ballot;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod tally;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;
use store::Store;

/// Every route is mounted under this path.
pub const BASE: &str = "/api/vote";

/// Build the server from `Rocket.toml` and the environment, storing voters
/// in MongoDB.
pub fn build() -> Rocket<Build> {
    with_routes(rocket::build()).attach(DatabaseFairing)
}

/// Build the server from the given configuration, storing voters in `store`.
pub fn rocket_for_store(figment: Figment, store: Store) -> Rocket<Build> {
    with_routes(rocket::custom(figment)).manage(store)
}

fn with_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount(BASE, api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
}

/// Test server configuration: the example slate and a fixed JWT secret.
#[cfg(test)]
fn test_figment() -> Figment {
    use model::candidates::CandidateDirectory;

    let example = Config::example();
    Figment::from(rocket::Config::debug_default())
        .merge(("log_level", "off"))
        .merge(("jwt_secret", example.jwt_secret.clone()))
        .merge(("auth_ttl", example.auth_ttl))
        .merge(("candidates", Config::slates(&CandidateDirectory::example())))
}

/// A test server over the given store.
#[cfg(test)]
fn test_rocket(store: Store) -> Rocket<Build> {
    rocket_for_store(test_figment(), store)
}

/// A freshly named test database at the configured `db_uri`, with the voter
/// indexes in place.
#[cfg(test)]
async fn test_database() -> mongodb::Database {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    let client = mongodb::Client::with_uri_str(&db_uri).await.unwrap();
    let db = client.database(&config::get_database_name());
    store::ensure_indexes_exist(&db).await.unwrap();
    db
}
