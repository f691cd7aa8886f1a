// Resume service: base/tailored kinds, the four creation paths, full-document
// updates, and the sorted/paginated dashboard listing. Plan limits are
// enforced at creation time, inside the store.

pub mod handlers;
pub mod listing;
pub mod store;
