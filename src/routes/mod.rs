/// Router Module Index
///
/// Routes are grouped by resource, not by access level. Who may call what is
/// decided centrally by the access-control layer (`auth::policy`), so these
/// routers carry no middleware of their own.

/// Restaurant collection, search and single-restaurant routes.
pub mod restaurants;

/// Dish routes, nested under their restaurant.
pub mod dishes;

/// Health probe and caller identity.
pub mod system;
