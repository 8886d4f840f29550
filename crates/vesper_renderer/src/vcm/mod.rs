//! Vertex connection and merging.

pub mod hash_grid;
pub mod integrator;
pub mod path_state;
pub mod schedule;
pub mod seeder;

pub use hash_grid::HashGrid;
pub use integrator::VcmIntegrator;
pub use path_state::{checked_path_index, PathState, INDEX_BITS, MAX_PATH_INDEX};
pub use schedule::{search_radius, VcmIterationConstants};
pub use seeder::{light_path_state, PathSeeder};
