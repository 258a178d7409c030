pub mod postgres;
pub use postgres::{Database, DbTransaction};
pub mod procedure;
pub use procedure::{
    procedures, DatabaseError, ExpectedReturn, ParamValue, ProcedureCall, ProcedureExecutor,
    ProcedureOutput, Row,
};
mod row;
