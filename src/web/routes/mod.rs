pub mod admin_companion_routes;
pub mod auth_routes;
pub mod catalog_routes;
pub mod me_routes;
pub mod oauth_routes;
pub mod tag_routes;
