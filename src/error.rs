/// Errors raised by the payment engine and the bag validator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The bag file lacks one or more required columns.
    #[error("The bag file is missing the following columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// The bag file is not readable as CSV.
    #[error("The bag file is malformed at line {line}: {message}")]
    MalformedRow { line: usize, message: String },
    /// A required cell is empty.
    #[error("The bag file contains an empty cell in column '{column}' (line {line}).")]
    EmptyCell { column: String, line: usize },
    /// A cell could not be parsed as the column's type.
    #[error("Column '{column}' has incorrect data type on line {line}: '{value}' (expected {expected}).")]
    InvalidType {
        column: &'static str,
        line: usize,
        value: String,
        expected: &'static str,
    },
    /// A position cannot be analysed (zero quantity, zero expenditure, bad tax rate).
    #[error("Invalid position {isin}: {reason}")]
    InvalidPosition { isin: String, reason: String },
    /// A bond is quoted in a currency without a known exchange rate.
    #[error("No exchange rate for currency '{currency}' (bond {isin}).")]
    UnknownCurrency { isin: String, currency: String },
}

impl EngineError {
    /// Whether the error describes bad user input (as opposed to bad source data).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::MissingColumns(_)
                | EngineError::MalformedRow { .. }
                | EngineError::EmptyCell { .. }
                | EngineError::InvalidType { .. }
                | EngineError::InvalidPosition { .. }
        )
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let exit_code = if err.is_validation() { 2 } else { 3 };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
