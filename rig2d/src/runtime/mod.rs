mod constraint;
mod ik;
mod mesh;
mod skeleton;
mod snapshot;

pub use constraint::*;
pub use ik::*;
pub use mesh::*;
pub use skeleton::*;
pub use snapshot::*;




#[cfg(test)]
mod mesh_tests;


#[cfg(all(test, feature = "json"))]
mod json_snapshot_tests;
