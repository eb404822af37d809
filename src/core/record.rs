//! Normalized exception records and their persisted row shape
//!
//! A [`FirewallExceptionRecord`] is the canonical in-memory form of one
//! declared firewall exception: created once by the compiler, immutable
//! afterwards, and written to the installer database as one row of the
//! firewall exception table. The decompiler rebuilds a transient record from
//! each stored row before projecting it back into the authoring vocabulary.
//!
//! # Row layout
//!
//! Column order is a persistence contract (compiler emission order equals
//! decompiler read order):
//!
//! | # | Column | Type |
//! |---|-----------------|--------|
//! | 0 | Id | string |
//! | 1 | Name | string |
//! | 2 | RemoteAddresses | string |
//! | 3 | Port | string |
//! | 4 | Protocol | int |
//! | 5 | Program | string |
//! | 6 | Attributes | int |
//! | 7 | Profile | int |
//! | 8 | Component_ | string |
//! | 9 | Description | string |
//! | 10 | Direction | int |
//! | 11 | Service | string |
//! | 12 | InterfaceTypes | string |
//!
//! Columns 11 and 12 shipped after the original row shape; rows that predate
//! them are shorter, and [`FirewallExceptionRecord::from_row`] treats the
//! missing columns as absent rather than failing.

use serde::{Deserialize, Serialize};

use crate::core::codec::{Direction, ExceptionFlags, Profile, Protocol};
use crate::core::error::{Error, Result};

/// Name of the firewall exception table in the installer database.
pub const EXCEPTION_TABLE: &str = "FirewallException";

/// Columns the decompiler requires; Service and InterfaceTypes are trailing
/// optional additions.
pub const REQUIRED_COLUMNS: usize = 11;

/// One typed field of a persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Str(String),
    Int(i32),
}

impl Field {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(s) => Some(s),
            Field::Int(_) => None,
        }
    }

    /// Integer view of the field. String fields holding decimal digits
    /// coerce, matching how installer databases surface integer columns.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Field::Int(i) => Some(*i),
            Field::Str(s) => s.parse().ok(),
        }
    }
}

/// One row of an extension table; absent trailing columns simply shorten the
/// field vector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Row {
    pub fields: Vec<Option<Field>>,
}

impl Row {
    pub fn string(&self, column: usize) -> Option<&str> {
        self.fields.get(column)?.as_ref()?.as_str()
    }

    pub fn integer(&self, column: usize) -> Option<i32> {
        self.fields.get(column)?.as_ref()?.as_int()
    }

    pub fn is_column_empty(&self, column: usize) -> bool {
        matches!(self.fields.get(column), None | Some(None))
    }
}

/// An extension table: a name and its rows in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }
}

/// The canonical normalized form of one firewall exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallExceptionRecord {
    /// Stable identifier, unique within the compilation unit.
    pub id: String,
    /// Display name of the exception rule.
    pub name: String,
    /// Comma-joined remote address tokens; `*` means any, `LocalSubnet` is
    /// reserved. Never empty on a valid record.
    pub remote_addresses: String,
    /// Port number or range token.
    pub port: Option<String>,
    pub protocol: Option<Protocol>,
    /// Executable path, or a `[#fileId]` back-reference to a file entry.
    pub program: Option<String>,
    pub attributes: Option<ExceptionFlags>,
    pub profile: Option<Profile>,
    /// Identifier of the owning component.
    pub component_ref: String,
    pub description: Option<String>,
    pub direction: Option<Direction>,
    /// Windows service the exception applies to.
    pub service: Option<String>,
    /// Comma-joined interface-type tokens, or `All`.
    pub interface_types: Option<String>,
}

impl FirewallExceptionRecord {
    /// Serializes the record into its persisted row shape.
    pub fn to_row(&self) -> Row {
        let string = |value: &Option<String>| value.clone().map(Field::Str);

        Row {
            fields: vec![
                Some(Field::Str(self.id.clone())),
                Some(Field::Str(self.name.clone())),
                Some(Field::Str(self.remote_addresses.clone())),
                string(&self.port),
                self.protocol.map(|p| Field::Int(p.packed())),
                string(&self.program),
                self.attributes.map(|a| Field::Int(a.packed())),
                self.profile.map(|p| Field::Int(p.packed())),
                Some(Field::Str(self.component_ref.clone())),
                string(&self.description),
                self.direction.map(|d| Field::Int(d.packed())),
                string(&self.service),
                string(&self.interface_types),
            ],
        }
    }

    /// Rebuilds a record from a stored row.
    ///
    /// Packed enum values outside the known set decode to `None` so the
    /// decompiler emits no attribute for them; rows shorter than the current
    /// 13 columns are accepted down to [`REQUIRED_COLUMNS`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowTooShort`] or [`Error::MissingColumn`] when the
    /// row cannot possibly describe an exception.
    pub fn from_row(row: &Row) -> Result<Self> {
        if row.fields.len() < REQUIRED_COLUMNS {
            return Err(Error::RowTooShort {
                expected: REQUIRED_COLUMNS,
                found: row.fields.len(),
            });
        }

        let key = row.string(0).unwrap_or("?").to_string();
        let required = |column: usize, name: &'static str| -> Result<String> {
            row.string(column)
                .map(str::to_string)
                .ok_or_else(|| Error::MissingColumn {
                    key: key.clone(),
                    column,
                    name,
                })
        };

        Ok(Self {
            id: required(0, "Id")?,
            name: required(1, "Name")?,
            remote_addresses: required(2, "RemoteAddresses")?,
            port: row.string(3).map(str::to_string),
            protocol: row.integer(4).and_then(Protocol::from_packed),
            program: row.string(5).map(str::to_string),
            attributes: row.integer(6).map(ExceptionFlags::from_packed),
            profile: row.integer(7).and_then(Profile::from_packed),
            component_ref: required(8, "Component_")?,
            description: row.string(9).map(str::to_string),
            direction: row.integer(10).and_then(Direction::from_packed),
            service: row.string(11).map(str::to_string),
            interface_types: row.string(12).map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FirewallExceptionRecord {
        FirewallExceptionRecord {
            id: "fexSample".to_string(),
            name: "Sample".to_string(),
            remote_addresses: "*".to_string(),
            port: Some("8080".to_string()),
            protocol: Some(Protocol::Tcp),
            program: None,
            attributes: Some(ExceptionFlags::default()),
            profile: Some(Profile::All),
            component_ref: "MainComponent".to_string(),
            description: None,
            direction: Some(Direction::In),
            service: None,
            interface_types: None,
        }
    }

    #[test]
    fn test_row_round_trip_preserves_all_fields() {
        let record = sample_record();
        let row = record.to_row();
        assert_eq!(row.fields.len(), 13);

        let rebuilt = FirewallExceptionRecord::from_row(&row).unwrap();
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn test_from_row_tolerates_missing_trailing_columns() {
        let mut row = sample_record().to_row();
        row.fields.truncate(REQUIRED_COLUMNS);

        let record = FirewallExceptionRecord::from_row(&row).unwrap();
        assert_eq!(record.service, None);
        assert_eq!(record.interface_types, None);
    }

    #[test]
    fn test_from_row_rejects_pre_schema_rows() {
        let mut row = sample_record().to_row();
        row.fields.truncate(5);

        let err = FirewallExceptionRecord::from_row(&row).unwrap_err();
        assert!(matches!(err, Error::RowTooShort { found: 5, .. }));
    }

    #[test]
    fn test_from_row_requires_component_ref() {
        let mut row = sample_record().to_row();
        row.fields[8] = None;

        let err = FirewallExceptionRecord::from_row(&row).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingColumn {
                column: 8,
                name: "Component_",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_packed_enums_decode_to_absent() {
        let mut row = sample_record().to_row();
        row.fields[4] = Some(Field::Int(255));
        row.fields[7] = Some(Field::Int(8));
        row.fields[10] = Some(Field::Int(9));

        let record = FirewallExceptionRecord::from_row(&row).unwrap();
        assert_eq!(record.protocol, None);
        assert_eq!(record.profile, None);
        assert_eq!(record.direction, None);
    }

    #[test]
    fn test_integer_columns_coerce_from_strings() {
        let mut row = sample_record().to_row();
        row.fields[4] = Some(Field::Str("17".to_string()));

        let record = FirewallExceptionRecord::from_row(&row).unwrap();
        assert_eq!(record.protocol, Some(Protocol::Udp));
    }

    #[test]
    fn test_row_serializes_to_json() {
        let row = sample_record().to_row();
        let json = serde_json::to_string(&row).unwrap();
        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
