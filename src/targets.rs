//! Log targets, one per component, for filtering with `RUST_LOG`
//! (e.g. `RUST_LOG=driver=debug,backend=warn`).

pub const FORMULA: &str = "formula";
pub const ORACLE: &str = "oracle";
pub const SCHEDULE: &str = "schedule";
pub const BACKEND: &str = "backend";
pub const DRIVER: &str = "driver";
