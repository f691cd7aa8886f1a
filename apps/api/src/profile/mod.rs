// Profile service: one canonical record per user, created on first sight.
// Collections never hold two items with the same identity key; colliding
// imports merge into the existing item instead of duplicating.

pub mod handlers;
pub mod merge;
pub mod store;
