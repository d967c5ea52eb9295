use std::fmt;
use std::io;

use stationkit_client::ClientError;
use stationkit_schema::SchemaError;
use stationkit_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const UNSUPPORTED: i32 = 69;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match err {
        TransportError::Timeout { .. } => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn schema_error_code(err: &SchemaError) -> i32 {
    match err {
        SchemaError::ValidationFailed { .. }
        | SchemaError::ParseFailed { .. }
        | SchemaError::SchemaTooLarge { .. } => DATA_INVALID,
        SchemaError::UnknownFormat(_) => USAGE,
        SchemaError::Unimplemented(_) => UNSUPPORTED,
        SchemaError::DuplicateFormat(_) | SchemaError::UnregisteredFormat(_) => INTERNAL,
    }
}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    CliError::new(schema_error_code(&err), format!("{context}: {err}"))
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Schema(err) => schema_error(context, err),
        ClientError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ClientError::InvalidName { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        ClientError::Broker(_) | ClientError::ProducerDestroyed(_) | ClientError::Closed => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}
