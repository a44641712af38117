// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Processor and selector capabilities
//!
//! A processor is the body of a neuron; a selector picks which cast group a
//! neuron fans out to. Both are cloned whenever a blueprint builds a brain,
//! so two brains never share a processor instance.

use std::fmt;
use std::sync::Arc;

use crate::context::{BrainContext, BrainContextReader};
use crate::error::ProcessorResult;
use crate::DEFAULT_CAST_GROUP;

/// Body of a neuron
pub trait Processor: Send {
    fn process(&mut self, ctx: &BrainContext<'_>) -> ProcessorResult;

    /// Independent copy for another brain
    fn clone_box(&self) -> Box<dyn Processor>;
}

impl Clone for Box<dyn Processor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Picks the cast group a neuron fans out to after it ran
pub trait Selector: Send + Sync {
    fn select(&self, ctx: &BrainContextReader<'_>) -> String;

    fn clone_box(&self) -> Box<dyn Selector>;
}

impl Clone for Box<dyn Selector> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

type ProcessFn = dyn Fn(&BrainContext<'_>) -> ProcessorResult + Send + Sync;

/// Processor backed by a closure
///
/// Clones share the closure, which is immutable (`Fn`); keep per-brain state
/// in memory rather than in captured cells.
#[derive(Clone)]
pub struct FnProcessor {
    process_fn: Arc<ProcessFn>,
}

impl FnProcessor {
    pub fn new<F>(process_fn: F) -> Self
    where
        F: Fn(&BrainContext<'_>) -> ProcessorResult + Send + Sync + 'static,
    {
        Self {
            process_fn: Arc::new(process_fn),
        }
    }
}

impl fmt::Debug for FnProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnProcessor")
    }
}

impl Processor for FnProcessor {
    fn process(&mut self, ctx: &BrainContext<'_>) -> ProcessorResult {
        (self.process_fn)(ctx)
    }

    fn clone_box(&self) -> Box<dyn Processor> {
        Box::new(self.clone())
    }
}

/// Processor that does nothing and always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProcessor;

impl Processor for EmptyProcessor {
    fn process(&mut self, _ctx: &BrainContext<'_>) -> ProcessorResult {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Processor> {
        Box::new(*self)
    }
}

type SelectFn = dyn Fn(&BrainContextReader<'_>) -> String + Send + Sync;

/// Selector backed by a closure
#[derive(Clone)]
pub struct FnSelector {
    select_fn: Arc<SelectFn>,
}

impl FnSelector {
    pub fn new<F>(select_fn: F) -> Self
    where
        F: Fn(&BrainContextReader<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            select_fn: Arc::new(select_fn),
        }
    }
}

impl fmt::Debug for FnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSelector")
    }
}

impl Selector for FnSelector {
    fn select(&self, ctx: &BrainContextReader<'_>) -> String {
        (self.select_fn)(ctx)
    }

    fn clone_box(&self) -> Box<dyn Selector> {
        Box::new(self.clone())
    }
}

/// Always selects the default cast group
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSelector;

impl Selector for DefaultSelector {
    fn select(&self, _ctx: &BrainContextReader<'_>) -> String {
        DEFAULT_CAST_GROUP.to_string()
    }

    fn clone_box(&self) -> Box<dyn Selector> {
        Box::new(*self)
    }
}
