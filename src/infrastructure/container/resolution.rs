//! Per-thread resolution stack
//!
//! Every factory invocation pushes a frame for (registry, identity). A factory
//! that asks the same registry for the identity it is building would otherwise
//! block forever on the singleton init lock, so it is rejected here first.

use std::any::TypeId;
use std::cell::RefCell;

use uuid::Uuid;

use crate::errors::ContainerError;

struct Frame {
    registry: Uuid,
    type_id: TypeId,
    service: &'static str,
}

thread_local! {
    static STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Pops its frame when dropped.
pub(crate) struct ResolutionGuard {
    _private: (),
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub(crate) fn enter(
    registry: Uuid,
    type_id: TypeId,
    service: &'static str,
    max_depth: usize,
) -> Result<ResolutionGuard, ContainerError> {
    STACK.with(|stack| {
        let mut stack = stack.borrow_mut();

        if let Some(start) = stack
            .iter()
            .position(|frame| frame.registry == registry && frame.type_id == type_id)
        {
            let mut chain: Vec<&'static str> = stack[start..].iter().map(|f| f.service).collect();
            chain.push(service);
            return Err(ContainerError::CircularDependency { chain });
        }

        if stack.len() >= max_depth {
            return Err(ContainerError::ResolutionDepthExceeded {
                service,
                limit: max_depth,
            });
        }

        stack.push(Frame {
            registry,
            type_id,
            service,
        });
        Ok(ResolutionGuard { _private: () })
    })
}

#[cfg(test)]
fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}
