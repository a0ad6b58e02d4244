//! Fluent query builder.
//!
//! Queries are assembled client-side as expression trees and serialized
//! into the wire schema when run:
//!
//! ```
//! use reefdb_client::query;
//! use serde_json::json;
//!
//! let all = query::db("blog").table("posts");
//! let one = query::table("posts").get("first-post");
//! let add = query::table("posts").insert(json!({ "title": "Hello" }));
//! ```
//!
//! A bare [`table`] resolves against the connection's default database.

use serde_json::Value;

use crate::convert::value_to_datum;
use crate::proto::{Term, TermType};

/// Reference a database.
pub fn db(name: &str) -> Db {
    Db {
        term: node(TermType::Db, vec![string(name)]),
    }
}

/// Reference a table in the connection's default database.
pub fn table(name: &str) -> Expr {
    Expr {
        term: node(TermType::Table, vec![string(name)]),
    }
}

/// A literal value as a query expression.
pub fn expr(value: Value) -> Expr {
    Expr {
        term: datum(&value),
    }
}

/// Create a database.
pub fn db_create(name: &str) -> Expr {
    Expr {
        term: node(TermType::DbCreate, vec![string(name)]),
    }
}

/// Drop a database.
pub fn db_drop(name: &str) -> Expr {
    Expr {
        term: node(TermType::DbDrop, vec![string(name)]),
    }
}

/// List database names.
pub fn db_list() -> Expr {
    Expr {
        term: node(TermType::DbList, Vec::new()),
    }
}

/// A database reference; the entry point for table-level operations.
#[derive(Debug, Clone)]
pub struct Db {
    term: Term,
}

impl Db {
    /// Reference a table in this database.
    pub fn table(self, name: &str) -> Expr {
        Expr {
            term: node(TermType::Table, vec![self.term, string(name)]),
        }
    }

    /// Create a table.
    pub fn table_create(self, name: &str) -> Expr {
        Expr {
            term: node(TermType::TableCreate, vec![self.term, string(name)]),
        }
    }

    /// Drop a table.
    pub fn table_drop(self, name: &str) -> Expr {
        Expr {
            term: node(TermType::TableDrop, vec![self.term, string(name)]),
        }
    }

    /// List table names.
    pub fn table_list(self) -> Expr {
        Expr {
            term: node(TermType::TableList, vec![self.term]),
        }
    }

    /// The underlying term tree.
    pub fn into_term(self) -> Term {
        self.term
    }
}

/// A composable query expression.
///
/// Methods consume the receiver and return the extended expression, so
/// chains read in evaluation order.
#[derive(Debug, Clone)]
pub struct Expr {
    term: Term,
}

impl Expr {
    /// Look up a single document by primary key.
    pub fn get(self, key: impl Into<Value>) -> Expr {
        self.wrap(TermType::Get, vec![datum(&key.into())])
    }

    /// Keep the elements whose fields match `predicate` exactly.
    pub fn filter(self, predicate: Value) -> Expr {
        self.wrap(TermType::Filter, vec![datum(&predicate)])
    }

    /// Insert a document (or an array of documents).
    pub fn insert(self, document: Value) -> Expr {
        self.wrap(TermType::Insert, vec![datum(&document)])
    }

    /// Merge `patch` into the selected document(s).
    pub fn update(self, patch: Value) -> Expr {
        self.wrap(TermType::Update, vec![datum(&patch)])
    }

    /// Replace the selected document(s) entirely.
    pub fn replace(self, document: Value) -> Expr {
        self.wrap(TermType::Replace, vec![datum(&document)])
    }

    /// Delete the selected document(s).
    pub fn delete(self) -> Expr {
        self.wrap(TermType::Delete, Vec::new())
    }

    /// Truncate the sequence to its first `n` elements.
    pub fn limit(self, n: u64) -> Expr {
        self.wrap(TermType::Limit, vec![datum(&Value::from(n))])
    }

    /// Drop the first `n` elements of the sequence.
    pub fn skip(self, n: u64) -> Expr {
        self.wrap(TermType::Skip, vec![datum(&Value::from(n))])
    }

    /// Count the elements of the sequence.
    pub fn count(self) -> Expr {
        self.wrap(TermType::Count, Vec::new())
    }

    /// Project each element down to the named fields.
    pub fn pluck(self, fields: &[&str]) -> Expr {
        let names = fields.iter().map(|f| string(f)).collect();
        self.wrap(TermType::Pluck, names)
    }

    /// The underlying term tree.
    pub fn into_term(self) -> Term {
        self.term
    }

    fn wrap(self, kind: TermType, mut args: Vec<Term>) -> Expr {
        let mut all = Vec::with_capacity(1 + args.len());
        all.push(self.term);
        all.append(&mut args);
        Expr {
            term: node(kind, all),
        }
    }
}

impl From<Expr> for Term {
    fn from(expr: Expr) -> Term {
        expr.term
    }
}

fn node(kind: TermType, args: Vec<Term>) -> Term {
    Term {
        r#type: Some(kind as i32),
        datum: None,
        args,
        optargs: Vec::new(),
    }
}

fn datum(value: &Value) -> Term {
    Term {
        r#type: Some(TermType::Datum as i32),
        datum: Some(value_to_datum(value)),
        args: Vec::new(),
        optargs: Vec::new(),
    }
}

fn string(s: &str) -> Term {
    datum(&Value::String(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::DatumType;
    use serde_json::json;

    #[test]
    fn test_table_in_db() {
        let term = db("blog").table("posts").into_term();
        assert_eq!(term.r#type(), TermType::Table);
        assert_eq!(term.args.len(), 2);
        assert_eq!(term.args[0].r#type(), TermType::Db);
        let name = term.args[1].datum.as_ref().unwrap();
        assert_eq!(name.r_str.as_deref(), Some("posts"));
    }

    #[test]
    fn test_bare_table_has_no_db_arg() {
        let term = table("posts").into_term();
        assert_eq!(term.r#type(), TermType::Table);
        assert_eq!(term.args.len(), 1);
    }

    #[test]
    fn test_get_chains_onto_table() {
        let term = table("posts").get("first-post").into_term();
        assert_eq!(term.r#type(), TermType::Get);
        assert_eq!(term.args[0].r#type(), TermType::Table);
        let key = term.args[1].datum.as_ref().unwrap();
        assert_eq!(key.r#type(), DatumType::RStr);
    }

    #[test]
    fn test_insert_embeds_document_as_datum() {
        let term = table("posts")
            .insert(json!({ "title": "Hello" }))
            .into_term();
        assert_eq!(term.r#type(), TermType::Insert);
        let doc = term.args[1].datum.as_ref().unwrap();
        assert_eq!(doc.r#type(), DatumType::RObject);
        assert_eq!(doc.r_object[0].key.as_deref(), Some("title"));
    }

    #[test]
    fn test_sequence_operators_nest() {
        let term = table("posts").skip(10).limit(5).count().into_term();
        assert_eq!(term.r#type(), TermType::Count);
        assert_eq!(term.args[0].r#type(), TermType::Limit);
        assert_eq!(term.args[0].args[0].r#type(), TermType::Skip);
    }

    #[test]
    fn test_pluck_lists_fields() {
        let term = table("posts").pluck(&["title", "views"]).into_term();
        assert_eq!(term.r#type(), TermType::Pluck);
        assert_eq!(term.args.len(), 3);
    }
}
