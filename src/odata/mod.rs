// OData system query options evaluated over JSON projections of entities

pub mod error;
pub mod filter_order;
pub mod filter_where;
pub mod query;
pub mod types;

pub use error::QueryError;
pub use filter_order::FilterOrder;
pub use filter_where::FilterWhere;
pub use query::apply_query;
pub use types::{CompareOp, FilterNode, Literal, ODataQuery, Operand, OrderInfo, Page, SortDirection, StringFunction};
