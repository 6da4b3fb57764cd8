/// Router Module Index
///
/// Splits the routing table by how each group is protected. Access control
/// is attached where the groups are merged in `create_router`.

/// Health check and the account flow (register, login, logout, me).
/// `me` authenticates inside its handler.
pub mod public;

/// The movie JSON API. Screened by the edge gate, then fully verified and
/// policy-checked per handler.
pub mod movies;

/// The browser pages. The catalog page sits behind the edge gate.
pub mod pages;
