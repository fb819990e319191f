//! Catalog Query Handlers

use crate::application::ports::AlignerRegistry;
use crate::application::queries::{ListAligners, ListVoices};

/// ListVoices Handler
pub struct ListVoicesHandler {
    voices: Vec<String>,
}

impl ListVoicesHandler {
    pub fn new(voices: Vec<String>) -> Self {
        Self { voices }
    }

    pub fn handle(&self, _query: ListVoices) -> Vec<String> {
        self.voices.clone()
    }
}

/// ListAligners Handler
pub struct ListAlignersHandler {
    registry: AlignerRegistry,
}

impl ListAlignersHandler {
    pub fn new(registry: AlignerRegistry) -> Self {
        Self { registry }
    }

    pub fn handle(&self, _query: ListAligners) -> Vec<String> {
        self.registry.names()
    }
}
