use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("SQL parsing error: {0}")]
    Sql(#[from] sqlparser::parser::ParserError),

    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
