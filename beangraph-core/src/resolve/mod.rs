//! Resolution of injection points, interceptor chains and decorator chains.

pub mod beans;
pub mod decorators;
pub mod interceptors;

pub use beans::{AlternativePriorities, BeanResolver, DeclaredPriorities, PriorityOverrides};
pub use decorators::DecoratorResolver;
pub use interceptors::InterceptorResolver;
