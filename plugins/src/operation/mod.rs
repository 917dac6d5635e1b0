mod deploy;
mod reconcile;

pub use deploy::DeployOperation;
pub use reconcile::TestOperation;
