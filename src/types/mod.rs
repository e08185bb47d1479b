mod schema;
mod value;

pub use schema::{resolve_column, Attribute, ForeignKeyConstraint};
pub use value::{DataType, Date, Row, Value};
