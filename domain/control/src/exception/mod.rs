use thiserror::Error;

pub type ControlResult<T> = Result<T, ControlException>;

#[derive(Error, Debug)]
pub enum ControlException {
    #[error("Invalid argument {field}: {value:?}, {reason}.")]
    InvalidArgument {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Malformed composite key: {key:?}.")]
    MalformedKey { key: String },

    #[error("Control internal error: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl ControlException {
    pub fn invalid_argument(field: &'static str, value: &str, reason: &'static str) -> Self {
        Self::InvalidArgument {
            field,
            value: value.to_owned(),
            reason,
        }
    }
}

impl From<anyhow::Error> for ControlException {
    fn from(e: anyhow::Error) -> Self {
        ControlException::InternalError { source: e }
    }
}
