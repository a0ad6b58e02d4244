//! Wire schema for the driver protocol.
//!
//! Hand-maintained mirror of the server's protobuf definition. Field tags
//! and enum discriminants must stay in sync with the server; do not renumber.

/// A value carried inside responses and inside literal query terms.
///
/// Exactly one of the `r_*` fields is populated, selected by `type`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Datum {
    #[prost(enumeration = "DatumType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(bool, optional, tag = "2")]
    pub r_bool: Option<bool>,
    #[prost(double, optional, tag = "3")]
    pub r_num: Option<f64>,
    #[prost(string, optional, tag = "4")]
    pub r_str: Option<String>,
    #[prost(message, repeated, tag = "5")]
    pub r_array: Vec<Datum>,
    #[prost(message, repeated, tag = "6")]
    pub r_object: Vec<DatumPair>,
}

/// One key/value entry of an `R_OBJECT` datum.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DatumPair {
    #[prost(string, optional, tag = "1")]
    pub key: Option<String>,
    #[prost(message, optional, tag = "2")]
    pub val: Option<Datum>,
}

/// A node of the query expression tree.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Term {
    #[prost(enumeration = "TermType", optional, tag = "1")]
    pub r#type: Option<i32>,
    /// Populated only for `DATUM` terms.
    #[prost(message, optional, tag = "2")]
    pub datum: Option<Datum>,
    #[prost(message, repeated, tag = "3")]
    pub args: Vec<Term>,
    #[prost(message, repeated, tag = "4")]
    pub optargs: Vec<TermPair>,
}

/// One named optional argument of a term.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TermPair {
    #[prost(string, optional, tag = "1")]
    pub key: Option<String>,
    #[prost(message, optional, tag = "2")]
    pub val: Option<Term>,
}

/// An outbound request.
///
/// `query` is present for `START` and absent for `CONTINUE`/`STOP`;
/// continuations are correlated by `token` alone.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(enumeration = "QueryType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(message, optional, tag = "2")]
    pub query: Option<Term>,
    #[prost(uint64, optional, tag = "3")]
    pub token: Option<u64>,
    #[prost(message, repeated, tag = "6")]
    pub global_optargs: Vec<QueryPair>,
}

/// One global optional argument of a query (e.g. the default database).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryPair {
    #[prost(string, optional, tag = "1")]
    pub key: Option<String>,
    #[prost(message, optional, tag = "2")]
    pub val: Option<Term>,
}

/// An inbound reply, correlated to its request by `token`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(enumeration = "ResponseType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(uint64, optional, tag = "2")]
    pub token: Option<u64>,
    #[prost(message, repeated, tag = "3")]
    pub response: Vec<Datum>,
    #[prost(message, optional, tag = "4")]
    pub backtrace: Option<Backtrace>,
}

/// Path from the query root to the term an error refers to.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Backtrace {
    #[prost(message, repeated, tag = "1")]
    pub frames: Vec<Frame>,
}

/// One step of a backtrace: a positional argument or a named optarg.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Frame {
    #[prost(enumeration = "FrameType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(int64, optional, tag = "2")]
    pub pos: Option<i64>,
    #[prost(string, optional, tag = "3")]
    pub opt: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum QueryType {
    /// Start a new query under a fresh token.
    Start = 1,
    /// Request the next batch of an open sequence.
    Continue = 2,
    /// Abandon an open sequence early.
    Stop = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ResponseType {
    /// A single value; `response` holds exactly one datum.
    SuccessAtom = 1,
    /// The final (or only) batch of a sequence.
    SuccessSequence = 2,
    /// A batch with more to follow; continue with the same token.
    SuccessPartial = 3,
    ClientError = 16,
    CompileError = 17,
    RuntimeError = 18,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DatumType {
    RNull = 1,
    RBool = 2,
    RNum = 3,
    RStr = 4,
    RArray = 5,
    RObject = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TermType {
    Datum = 1,
    MakeArray = 2,
    MakeObj = 3,
    Db = 14,
    Table = 15,
    Get = 16,
    Pluck = 33,
    Filter = 39,
    Count = 43,
    Update = 53,
    Delete = 54,
    Replace = 55,
    Insert = 56,
    DbCreate = 57,
    DbDrop = 58,
    DbList = 59,
    TableCreate = 60,
    TableDrop = 61,
    TableList = 62,
    Skip = 70,
    Limit = 71,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FrameType {
    Pos = 1,
    Opt = 2,
}
