//! Filter chain
//!
//! Per-request pipeline: the matched filters in configuration order followed
//! by one terminal step that invokes the servlet. The chain keeps an index
//! into its own step list; each `do_filter` call runs the next step.

use crate::error::ServletError;
use crate::logger;
use crate::servlet::{Filter, HttpRequest, HttpResponse, Servlet};
use std::sync::Arc;

#[derive(Clone)]
enum ChainStep {
    Filter(Arc<dyn Filter>),
    Servlet(Arc<dyn Servlet>),
}

/// Lifecycle of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Built, nothing invoked yet
    Pending,
    Running,
    /// Execution finished, normally or not
    Terminated,
}

pub struct FilterChain {
    steps: Vec<ChainStep>,
    position: usize,
    state: ChainState,
    servlet_invoked: bool,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn Filter>>, servlet: Arc<dyn Servlet>) -> Self {
        let mut steps: Vec<ChainStep> = filters.into_iter().map(ChainStep::Filter).collect();
        steps.push(ChainStep::Servlet(servlet));
        Self {
            steps,
            position: 0,
            state: ChainState::Pending,
            servlet_invoked: false,
        }
    }

    pub const fn state(&self) -> ChainState {
        self.state
    }

    /// Whether the terminal step ran
    pub const fn servlet_invoked(&self) -> bool {
        self.servlet_invoked
    }

    /// Number of filters ahead of the servlet
    pub fn filter_count(&self) -> usize {
        self.steps.len() - 1
    }

    /// Run the whole chain from the first step
    pub fn execute(&mut self, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), ServletError> {
        let result = self.do_filter(request, response);
        self.state = ChainState::Terminated;
        result
    }

    /// Invoke the next step
    ///
    /// Once every step has run, further calls do nothing.
    pub fn do_filter(&mut self, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), ServletError> {
        if self.state == ChainState::Terminated {
            logger::log_debug("do_filter called on a terminated chain");
            return Ok(());
        }
        let Some(step) = self.steps.get(self.position).cloned() else {
            return Ok(());
        };
        self.position += 1;
        self.state = ChainState::Running;

        match step {
            ChainStep::Filter(filter) => filter.do_filter(request, response, self),
            ChainStep::Servlet(servlet) => {
                self.servlet_invoked = true;
                servlet.service(request, response)
            }
        }
    }
}
