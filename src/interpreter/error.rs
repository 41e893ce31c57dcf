use thiserror::Error;

/// User-visible evaluation failures. Control-flow signals travel on the same
/// channel as `Signal` variants and are converted to the `Stray*` errors here
/// only when they escape their intended scope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("cannot find value for '{name}'")]
    UndefinedName { name: String },
    #[error("can't assign to non-identifier: {found}")]
    InvalidAssignmentTarget { found: String },
    #[error("'{op}' can only be used between bools, not: {found}")]
    LogicOperandType { op: &'static str, found: String },
    #[error("tried to compare with an uninitialized identifier: {name}")]
    UninitializedComparison { name: String },
    #[error("only numbers can be compared: {left} {op} {right}")]
    ComparisonOperandType {
        op: &'static str,
        left: String,
        right: String,
    },
    #[error(
        "'+' can only be used between [string, string], [number, number], [list, list], not: [{left}, {right}]"
    )]
    AdditionOperandType { left: String, right: String },
    #[error("'{op}' only supported between numbers, not: [{left}, {right}]")]
    ArithmeticOperandType {
        op: &'static str,
        left: String,
        right: String,
    },
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("expected {expected} after '{op}', got {found}")]
    UnaryOperandType {
        op: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("if expression condition should evaluate to true or false, not: {found}")]
    IfConditionType { found: String },
    #[error("condition expression of for loop should be of type bool, not: {found}")]
    ForConditionType { found: String },
    #[error("cannot iterate over {found}")]
    NotIterable { found: String },
    #[error("{found} is not callable")]
    NotCallable { found: String },
    #[error("function called with incorrect number of arguments: wanted {expected}, got {found}")]
    FunctionArity { expected: usize, found: usize },
    #[error("string access out of bounds: {index}")]
    StringIndexOutOfBounds { index: i64 },
    #[error("string access expects 1 argument of type number, not: {found}")]
    StringAccessType { found: String },
    #[error("list access out of bounds: {index}")]
    ListIndexOutOfBounds { index: i64 },
    #[error("list access expects 1 argument of type number, not: {found}")]
    ListAccessType { found: String },
    #[error("dict key must be a string or number, not: {found}")]
    DictKeyType { found: String },
    #[error("{found} cannot be indexed")]
    NotIndexable { found: String },
    #[error("{found} has no member '{name}'")]
    UnknownMember { found: String, name: String },
    #[error("{method}() expects {expected} argument(s), got {found}")]
    ListMethodArity {
        method: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("list member '{method}' must be called")]
    ListMethodNotCalled { method: &'static str },
    #[error("cannot {method}() from an empty list")]
    PopFromEmptyList { method: &'static str },
    #[error("reference slot no longer exists")]
    StaleReference,
    #[error("assert failed: {left} == {right}")]
    AssertFailed { left: String, right: String },
    #[error("{function}() expects {expected} arguments, got {found}")]
    NativeArity {
        function: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{function}() expects {expected}, got {found}")]
    NativeArgumentType {
        function: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("num() could not parse '{literal}' as a number")]
    NumberParse { literal: String },
    #[error("{line}:{column} return expression used outside of a function")]
    StrayReturn { line: usize, column: usize },
    #[error("{line}:{column} break expression used outside of a for loop")]
    StrayBreak { line: usize, column: usize },
    #[error("{line}:{column} continue expression used outside of a for loop")]
    StrayContinue { line: usize, column: usize },
    #[error("I/O error: {message}")]
    Io { message: String },
}
