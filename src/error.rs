#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("Error parsing productions, line: {line}, cause: {cause:?}.")]
    ParseProductionError {
        line: usize,
        cause: ParseProductionError,
    },
    #[error("Grammar may be not augmented")]
    GrammarNotAugmented,
    #[error(
        "Shift-reduce conflict in state {state} on {terminal:?}: shift to {shift} or reduce by production {reduce}."
    )]
    ShiftReduceConflict {
        state: usize,
        terminal: String,
        shift: usize,
        reduce: usize,
    },
    #[error(
        "Reduce-reduce conflict in state {state} on {terminal:?}: productions {first} and {second}."
    )]
    ReduceReduceConflict {
        state: usize,
        terminal: String,
        first: usize,
        second: usize,
    },
    #[error("More than one accepting state: {first} and {second}.")]
    AcceptConflict { first: usize, second: usize },
    #[error("Syntax error in state {state}, unexpected token: {token:?}.")]
    SyntaxError {
        /// 出错处的 token 值, 输入提前耗尽时为 [`None`].
        token: Option<String>,
        state: usize,
    },
    #[error("No goto from state {state} on {non_terminal}, this should not present.")]
    MissingGoto { state: usize, non_terminal: String },
    #[error("Parse stack corrupted, this should not present.")]
    CorruptStack,
    #[error("Expected {expected} reductions, found {found}.")]
    ReductionCountMismatch { expected: usize, found: usize },
    #[error("Unrecognized token at: {text:?}.")]
    UnrecognizedToken { text: String },
    #[error("Invalid token pattern {pattern:?}: {message}.")]
    InvalidTokenPattern { pattern: String, message: String },
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum ParseProductionError {
    #[error("No arrow in production line")]
    NoArrow,
    #[error("Start symbol not found")]
    StartSymbolNotFound,
}

impl Error {
    pub(crate) fn parse_production_error(line: usize, cause: ParseProductionError) -> Self {
        Self::ParseProductionError { line, cause }
    }
}
