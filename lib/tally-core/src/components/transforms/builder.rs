use tally_error::GenericError;

use super::SynchronousTransform;

/// A synchronous transform builder.
///
/// Builders hold the configuration for a transform and create independent instances of it. Instances built from the
/// same builder share no state.
pub trait SynchronousTransformBuilder {
    /// Builds an instance of the synchronous transform.
    ///
    /// ## Errors
    ///
    /// If the synchronous transform cannot be built for any reason, an error is returned.
    fn build(&self) -> Result<Box<dyn SynchronousTransform + Send>, GenericError>;
}
