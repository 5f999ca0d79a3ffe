//! Component registry
//!
//! Maps class identifiers used in configuration to constructors. The
//! instance cache asks the registry for a fresh, uninitialized component the
//! first time a (class, context) key is requested.

use crate::error::ServletError;
use crate::servlet::{Filter, Servlet};
use std::collections::HashMap;

type ServletFactory = Box<dyn Fn() -> Box<dyn Servlet> + Send + Sync>;
type FilterFactory = Box<dyn Fn() -> Box<dyn Filter> + Send + Sync>;

#[derive(Default)]
pub struct ComponentRegistry {
    servlets: HashMap<String, ServletFactory>,
    filters: HashMap<String, FilterFactory>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a servlet constructor; a later registration replaces an earlier one
    pub fn register_servlet<S, F>(&mut self, class: &str, factory: F)
    where
        S: Servlet + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.servlets
            .insert(class.to_string(), Box::new(move || Box::new(factory())));
    }

    pub fn register_filter<T, F>(&mut self, class: &str, factory: F)
    where
        T: Filter + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.filters
            .insert(class.to_string(), Box::new(move || Box::new(factory())));
    }

    pub fn has_servlet(&self, class: &str) -> bool {
        self.servlets.contains_key(class)
    }

    pub fn has_filter(&self, class: &str) -> bool {
        self.filters.contains_key(class)
    }

    pub fn create_servlet(&self, class: &str) -> Result<Box<dyn Servlet>, ServletError> {
        self.servlets
            .get(class)
            .map(|factory| factory())
            .ok_or_else(|| ServletError::UnknownComponent(class.to_string()))
    }

    pub fn create_filter(&self, class: &str) -> Result<Box<dyn Filter>, ServletError> {
        self.filters
            .get(class)
            .map(|factory| factory())
            .ok_or_else(|| ServletError::UnknownComponent(class.to_string()))
    }
}
