//! The fixed column table shared by sorting, per-column filtering and export.
//! Used by: query::request, query::builder, store::sqlite, export.

use std::fmt;

pub const VIEW: &str = "DeviceDataView";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Timestamp,
    Text,
    Real,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ValueKind,
}

impl Column {
    const fn new(name: &'static str, label: &'static str, kind: ValueKind) -> Self {
        Self { name, label, kind }
    }

    /// SQL expression rendering this column as matchable text.
    ///
    /// Text columns go through `fold` so that matching ignores case and
    /// diacritics; numbers are cast, timestamps get the canonical
    /// `YYYY-MM-DD HH:MM:SS.fff` form.
    pub fn text_expr(&self) -> String {
        match self.kind {
            ValueKind::Integer | ValueKind::Real => format!("CAST({} AS TEXT)", self.name),
            ValueKind::Timestamp => format!("strftime('%Y-%m-%d %H:%M:%f', {})", self.name),
            ValueKind::Text => format!("fold({})", self.name),
        }
    }

    /// Whether the global search term is matched against this column.
    pub fn globally_searchable(&self) -> bool {
        self.kind != ValueKind::Real
    }
}

pub const ID: usize = 0;
pub const MODIFIED_ON: usize = 1;
pub const NAME: usize = 2;
pub const REGION: usize = 3;
pub const LOCALITY: usize = 4;
pub const FREQUENCY: usize = 5;
pub const TYPE: usize = 6;
pub const PROPERTY: usize = 7;
pub const NEW_VALUE_REAL: usize = 11;

pub static COLUMNS: [Column; 12] = [
    Column::new("Id", "Id", ValueKind::Integer),
    Column::new("ModifiedOn", "Modified On", ValueKind::Timestamp),
    Column::new("Name", "Device", ValueKind::Text),
    Column::new("DeviceRegion", "Region", ValueKind::Text),
    Column::new("DeviceLocality", "Locality", ValueKind::Text),
    Column::new("Frequency", "Frequency", ValueKind::Text),
    Column::new("DeviceType", "Type", ValueKind::Text),
    Column::new("DeviceProperty", "Property", ValueKind::Text),
    Column::new("OldValue", "Old Value", ValueKind::Text),
    Column::new("NewValue", "New Value", ValueKind::Text),
    Column::new("OldValueReal", "Old Value (Real)", ValueKind::Real),
    Column::new("NewValueReal", "New Value (Real)", ValueKind::Real),
];

pub fn column(index: usize) -> Option<&'static Column> {
    COLUMNS.get(index)
}

/// Fields accepting a set of exact values from the UI's multiselects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterField {
    Region,
    Locality,
    Device,
    Frequency,
    Type,
    Property,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        FilterField::Region,
        FilterField::Locality,
        FilterField::Device,
        FilterField::Frequency,
        FilterField::Type,
        FilterField::Property,
    ];

    /// Query-string key.
    pub fn key(self) -> &'static str {
        match self {
            FilterField::Region => "region",
            FilterField::Locality => "locality",
            FilterField::Device => "device",
            FilterField::Frequency => "frequency",
            FilterField::Type => "type",
            FilterField::Property => "property",
        }
    }

    pub fn column(self) -> &'static Column {
        let index = match self {
            FilterField::Region => REGION,
            FilterField::Locality => LOCALITY,
            FilterField::Device => NAME,
            FilterField::Frequency => FREQUENCY,
            FilterField::Type => TYPE,
            FilterField::Property => PROPERTY,
        };
        &COLUMNS[index]
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
