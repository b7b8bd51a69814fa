//! Shared schema fixture for facade and resolution tests.

use crate::schema::{Decl, Schema};

/// A small application schema exercising every declaration shape: scalars,
/// an interpolated string, a choice, and a nested section.
pub fn test_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .declare(Decl::new("HOST", "localhost").help("Host name"))
        .unwrap();
    schema
        .declare(Decl::new("PORT", 1257).help("Listen port"))
        .unwrap();
    schema.declare(Decl::new("DEBUG", false)).unwrap();
    schema
        .declare(Decl::new("GREETING", "hello {HOST}"))
        .unwrap();
    schema
        .declare(Decl::new("MODE", "fast").choices(&["fast", "slow"]))
        .unwrap();
    let db = schema.section("DATABASE").unwrap();
    db.declare(Decl::new("URL", "sqlite://:memory:")).unwrap();
    db.declare(Decl::new("POOL_SIZE", 4).help("Connections to hold open"))
        .unwrap();
    schema
}
