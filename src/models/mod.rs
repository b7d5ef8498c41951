pub mod operation_context;
pub mod stack_configuration;
pub mod stack_key;
pub mod token;

// Re-export core models for easy access
pub use operation_context::{DistributionContext, ExecutionMetadata, StackOperationContext};
pub use stack_configuration::{
    DesiredState, OnFailure, ParameterValue, Parameters, StackConfiguration,
};
pub use stack_key::StackKey;
pub use token::{is_same_execution, ClientRequestToken, ExecutionArn};
