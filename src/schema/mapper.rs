//! Parameter-mapping chain
//!
//! Middlewares run in registration order: the first registered is the
//! outermost and sees the result of every middleware registered after it.

use crate::core::annotations::ParameterAnnotations;
use crate::core::error::SchemaError;
use crate::core::parameter::{
    ArgumentDescriptor, BaseParameterHandler, MappedParameter, ParameterHandler,
    ParameterMiddleware,
};
use std::sync::Arc;

/// Threads argument descriptors through the registered middlewares
#[derive(Clone, Default)]
pub struct ParameterMapper {
    middlewares: Vec<Arc<dyn ParameterMiddleware>>,
    base: BaseParameterHandler,
}

impl ParameterMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn ParameterMiddleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn push(&mut self, middleware: Arc<dyn ParameterMiddleware>) {
        self.middlewares.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn map(
        &self,
        argument: &ArgumentDescriptor,
        annotations: &ParameterAnnotations,
    ) -> Result<MappedParameter, SchemaError> {
        Next {
            middlewares: &self.middlewares,
            base: &self.base,
        }
        .map_parameter(argument, annotations)
    }
}

/// The remainder of the chain, handed to each middleware as `next`
struct Next<'a> {
    middlewares: &'a [Arc<dyn ParameterMiddleware>],
    base: &'a dyn ParameterHandler,
}

impl ParameterHandler for Next<'_> {
    fn map_parameter(
        &self,
        argument: &ArgumentDescriptor,
        annotations: &ParameterAnnotations,
    ) -> Result<MappedParameter, SchemaError> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    middlewares: rest,
                    base: self.base,
                };
                current.map_parameter(argument, annotations, &next)
            }
            None => self.base.map_parameter(argument, annotations),
        }
    }
}
