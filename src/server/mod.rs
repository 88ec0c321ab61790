pub mod router;
pub mod routes;

pub use router::{AdminState, admin_router};
