//! JSON codecs for table and query documents

mod errors;
mod query;
mod table;

pub use errors::{DocumentError, DocumentResult};
pub use query::decode_query;
pub use table::{decode_table, encode_table};
