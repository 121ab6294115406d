mod envelope;
mod row;
mod sql_value;
mod values;

pub use self::envelope::{
    ActionResult, ConnectionInfo, ConnectionState, DisconnectOutcome, HandleRef, Outcome,
};
pub use self::row::{QueryResult, RawQueryResult, Row};
pub use self::sql_value::{SqlValue, DATETIME_FORMAT};
pub use self::values::{Value, ValueMap, Values};
