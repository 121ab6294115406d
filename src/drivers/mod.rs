mod tokio_postgres;

pub use self::in_memory_test::{
    DriverEvent, InMemoryTestAdapter, InMemoryTestConnection, InMemoryTestResponseBuilder,
};
pub use self::tokio_postgres::{PostgresAdapter, PostgresConnection};
