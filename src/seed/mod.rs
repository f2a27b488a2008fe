pub mod data;

pub use data::{initial_models, load_seed_data, DEFAULT_COMMITTEE_ID, SUPERADMIN_ID};
