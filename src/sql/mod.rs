pub mod ast;
pub mod executor;
pub mod expression;
pub mod integrity;
pub mod relation;

pub use executor::{Executor, ResultSet};
pub use expression::{Comparator, Expression, Operand, Predicate, TriBool};
pub use relation::Relation;
