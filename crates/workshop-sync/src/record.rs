//! Core record types for workshop-sync.
//!
//! A [`Record`] is one submitted form: a flat map of field names to string
//! values, tagged by the [`Collection`] it was captured into.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Form field values keyed by field name.
pub type Fields = BTreeMap<String, String>;

/// The kind of equipment a collection tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    /// Engines, keyed by serial number.
    Engine,
    /// Generators, keyed by generator code.
    Generator,
}

impl Equipment {
    /// The field every record of this equipment kind must carry.
    #[must_use]
    pub fn key_field(self) -> &'static str {
        match self {
            Self::Engine => "serial",
            Self::Generator => "code",
        }
    }

    /// Plural path segment used by the remote service.
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Engine => "engines",
            Self::Generator => "generators",
        }
    }
}

impl fmt::Display for Equipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// A named bucket of same-kind pending records.
///
/// The set is fixed: eight engine event kinds and three generator event kinds.
/// The serialized name doubles as the local table name and the `store` tag on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Engine received into the workshop.
    EngSupply,
    /// Engine issued out to a site.
    EngIssue,
    /// Engine rehabilitation.
    EngRehab,
    /// Engine inspection.
    EngCheck,
    /// Rehab/check paperwork uploaded.
    EngUpload,
    /// Lathe work.
    EngLathe,
    /// Pumps and nozzles.
    EngPump,
    /// Electrical work (starter, alternator).
    EngElectrical,
    /// Generator received into the workshop.
    GenSupply,
    /// Generator issued out to a site.
    GenIssue,
    /// Generator inspection and upload.
    GenInspect,
}

impl Collection {
    /// Every collection, in drain order.
    pub const ALL: [Collection; 11] = [
        Self::EngSupply,
        Self::EngIssue,
        Self::EngRehab,
        Self::EngCheck,
        Self::EngUpload,
        Self::EngLathe,
        Self::EngPump,
        Self::EngElectrical,
        Self::GenSupply,
        Self::GenIssue,
        Self::GenInspect,
    ];

    /// The collection's stable name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EngSupply => "eng_supply",
            Self::EngIssue => "eng_issue",
            Self::EngRehab => "eng_rehab",
            Self::EngCheck => "eng_check",
            Self::EngUpload => "eng_upload",
            Self::EngLathe => "eng_lathe",
            Self::EngPump => "eng_pump",
            Self::EngElectrical => "eng_electrical",
            Self::GenSupply => "gen_supply",
            Self::GenIssue => "gen_issue",
            Self::GenInspect => "gen_inspect",
        }
    }

    /// Which equipment kind this collection belongs to.
    #[must_use]
    pub fn equipment(self) -> Equipment {
        match self {
            Self::GenSupply | Self::GenIssue | Self::GenInspect => Equipment::Generator,
            _ => Equipment::Engine,
        }
    }

    /// The primary key field for records in this collection.
    #[must_use]
    pub fn key_field(self) -> &'static str {
        self.equipment().key_field()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCollection {
                name: s.to_string(),
            })
    }
}

/// One user-submitted data entry.
///
/// `id` is assigned by the local store when the record is queued. On the wire
/// the record is a flat JSON object: its fields plus `_id` and `createdAt`
/// (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Local identifier, unique within the store.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// When the record was captured.
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// The submitted form values.
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Create an unsaved record stamped with the current time.
    #[must_use]
    pub fn new(fields: Fields) -> Self {
        Self {
            id: None,
            created_at: Utc::now(),
            fields,
        }
    }

    /// Look up a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// The record's primary key for the given collection, if present and non-blank.
    #[must_use]
    pub fn primary_key(&self, collection: Collection) -> Option<&str> {
        self.get(collection.key_field())
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_collection_count_and_split() {
        let engines = Collection::ALL
            .iter()
            .filter(|c| c.equipment() == Equipment::Engine)
            .count();
        let generators = Collection::ALL
            .iter()
            .filter(|c| c.equipment() == Equipment::Generator)
            .count();
        assert_eq!(engines, 8);
        assert_eq!(generators, 3);
    }

    #[test]
    fn test_collection_key_fields() {
        assert_eq!(Collection::EngSupply.key_field(), "serial");
        assert_eq!(Collection::EngElectrical.key_field(), "serial");
        assert_eq!(Collection::GenSupply.key_field(), "code");
        assert_eq!(Collection::GenInspect.key_field(), "code");
    }

    #[test]
    fn test_collection_from_str() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
        let err = "queue".parse::<Collection>().unwrap_err();
        assert!(matches!(err, Error::UnknownCollection { .. }));
    }

    #[test]
    fn test_collection_serde_matches_name() {
        let json = serde_json::to_string(&Collection::EngElectrical).unwrap();
        assert_eq!(json, "\"eng_electrical\"");
        assert_eq!(Collection::GenIssue.to_string(), "gen_issue");
    }

    #[test]
    fn test_equipment_path_segment() {
        assert_eq!(Equipment::Engine.path_segment(), "engines");
        assert_eq!(Equipment::Generator.to_string(), "generators");
    }

    #[test]
    fn test_record_primary_key() {
        let record = Record::new(fields(&[("code", " G-100 "), ("gType", "diesel")]));
        assert_eq!(record.primary_key(Collection::GenSupply), Some("G-100"));
        assert_eq!(record.primary_key(Collection::EngSupply), None);

        let blank = Record::new(fields(&[("serial", "   ")]));
        assert_eq!(blank.primary_key(Collection::EngIssue), None);
    }

    #[test]
    fn test_record_wire_shape() {
        let mut record = Record::new(fields(&[("serial", "111"), ("model", "F4L912")]));
        record.id = Some(7);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["_id"], 7);
        assert_eq!(value["serial"], "111");
        assert_eq!(value["model"], "F4L912");
        assert_eq!(value["createdAt"], record.created_at.timestamp_millis());
    }

    #[test]
    fn test_unsaved_record_omits_id() {
        let record = Record::new(fields(&[("serial", "222")]));
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("_id").is_none());
    }
}
