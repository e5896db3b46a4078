//! Database access functions, one sub-module per area. They speak SeaORM
//! entities and `DbErr`; callers decide on transactions and error mapping.

pub mod companion_service;
pub mod interaction_service;
pub mod tag_service;
pub mod user_service;
