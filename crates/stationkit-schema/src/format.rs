use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// Schema formats a station can enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaFormat {
    Json,
    Graphql,
    Protobuf,
}

impl SchemaFormat {
    /// Every known format, in registry order.
    pub const ALL: [SchemaFormat; 3] = [
        SchemaFormat::Json,
        SchemaFormat::Graphql,
        SchemaFormat::Protobuf,
    ];

    /// Wire tag used by the broker.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaFormat::Json => "json",
            SchemaFormat::Graphql => "graphql",
            SchemaFormat::Protobuf => "protobuf",
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaFormat {
    type Err = SchemaError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SchemaFormat::Json),
            "graphql" => Ok(SchemaFormat::Graphql),
            "protobuf" => Ok(SchemaFormat::Protobuf),
            _ => Err(SchemaError::UnknownFormat(tag.to_string())),
        }
    }
}
