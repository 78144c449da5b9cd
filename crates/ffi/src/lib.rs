//! C ABI for the stable-fluids solver
//!
//! Lifecycle for a host engine:
//! 1. `fluid_sim_new` with parameters from `fluid_sim_default_params`
//! 2. Each frame: `fluid_sim_apply_force` / `fluid_sim_apply_density`, then `fluid_sim_step`
//! 3. Read back with `fluid_sim_copy_density` / `fluid_sim_copy_velocity`
//! 4. `fluid_sim_destroy`
//!
//! Every fallible call returns a `FluidSimErrorCode`; details of the last failure
//! on the calling thread are available from `fluid_sim_get_last_error`.

mod error;
mod field_queries;
mod helpers;
mod instance;
mod simulation;

pub use error::{fluid_sim_get_last_error, fluid_sim_get_last_error_code, FluidSimErrorCode};
pub use field_queries::{
    fluid_sim_copy_density, fluid_sim_copy_velocity, fluid_sim_get_grid_size, fluid_sim_get_stats,
    FluidSimStats,
};
pub use instance::{
    fluid_sim_default_params, fluid_sim_destroy, fluid_sim_new, FluidSimBackend,
    FluidSimInstance, FluidSimParams,
};
pub use simulation::{
    fluid_sim_apply_density, fluid_sim_apply_force, fluid_sim_clear, fluid_sim_set_params,
    fluid_sim_step,
};
