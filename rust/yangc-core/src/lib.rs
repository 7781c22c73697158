//! yangc core value types.
//!
//! Interned qualified names, revision dates, and source identifiers shared by
//! the compiler and its consumers.

pub mod qname;
pub mod source;

pub use qname::{QName, QNameError, QNameModule, Revision, XmlNamespace};
pub use source::{SourceIdentifier, StatementSourceRef};
