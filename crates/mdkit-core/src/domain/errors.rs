use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SimResult<T> = Result<T, SimError>;
pub type ParserResult<T> = SimResult<T>;

/// Failure taxonomy for one simulation-and-analysis request.
///
/// Parse degradation (dropped frames, skipped velocity blocks, one missing
/// physical quantity) is absorbed locally with a warning and never surfaces
/// through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimErrorCategory {
    InputValidationError,
    IoSystemError,
    ExecutionError,
    DiscoveryError,
    ParseError,
    InternalError,
}

impl SimErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ExecutionError => 4,
            Self::DiscoveryError => 5,
            Self::ParseError => 6,
            Self::InternalError => 7,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ExecutionError => "ExecutionError",
            Self::DiscoveryError => "DiscoveryError",
            Self::ParseError => "ParseError",
            Self::InternalError => "InternalError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimError {
    category: SimErrorCategory,
    code: &'static str,
    message: String,
}

impl SimError {
    pub fn new(category: SimErrorCategory, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn input_validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::InputValidationError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::IoSystemError, code, message)
    }

    pub fn execution(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::ExecutionError, code, message)
    }

    pub fn discovery(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::DiscoveryError, code, message)
    }

    pub fn parse(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::ParseError, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::InternalError, code, message)
    }

    pub const fn category(&self) -> SimErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code, self.message)
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.category.label(), self.code, self.message)
    }
}

impl Error for SimError {}
