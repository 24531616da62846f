//! Storage helpers for BSON dates.

use chrono::{DateTime, Utc};
use mongodb::bson;

/// The current time, truncated to the millisecond precision of a BSON date,
/// so a timestamp reads back exactly as it was written.
pub fn now() -> DateTime<Utc> {
    bson::DateTime::now().to_chrono()
}

/// Like [`bson::serde_helpers::chrono_datetime_as_bson_datetime`], but for an
/// optional datetime. `None` is stored as null.
pub mod optional_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<bson::DateTime>::deserialize(deserializer)?;
        Ok(value.map(bson::DateTime::to_chrono))
    }
}
