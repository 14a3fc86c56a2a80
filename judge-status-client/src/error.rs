#[derive(Debug)]
pub enum Error {
    IOError(std::io::Error),
    TOMLParseError(toml::de::Error),
    BadLogLevel(String),
    TrackingError(judge_status::Error),
    SessionError(String),
    LogInitError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IOError(e) => {
                write!(f, "input/output error: {}", e)
            }
            Self::TOMLParseError(e) => {
                write!(f, "error parsing TOML: {}", e)
            }
            Self::BadLogLevel(e) => {
                write!(f, "invalid log level {}", e)
            }
            Self::TrackingError(e) => {
                write!(f, "tracking error: {}", e)
            }
            Self::SessionError(e) => {
                write!(f, "session ended with error: {}", e)
            }
            Self::LogInitError(e) => {
                write!(f, "cannot initialize logging: {}", e)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<judge_status::Error> for Error {
    fn from(e: judge_status::Error) -> Self {
        Self::TrackingError(e)
    }
}
