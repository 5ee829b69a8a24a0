//! Capability registry: the fixed intent-to-handler table.

use std::collections::BTreeMap;
use std::sync::Arc;

use doc_agent_core::{
    traits::SkillHandler,
    types::{HandlerContract, Intent},
    Error, Result,
};

/// Collects handlers before the table is frozen.
#[derive(Default)]
pub struct CapabilityRegistryBuilder {
    handlers: BTreeMap<Intent, Arc<dyn SkillHandler>>,
}

impl CapabilityRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `intent`.
    ///
    /// Fails when the intent is already bound or the handler's contract
    /// names another intent.
    pub fn register(&mut self, intent: Intent, handler: Arc<dyn SkillHandler>) -> Result<()> {
        let declared = handler.contract().intent;
        if declared != intent {
            return Err(Error::config(format!(
                "handler '{}' declares {} but was registered for {}",
                handler.contract().name,
                declared,
                intent
            )));
        }
        if self.handlers.contains_key(&intent) {
            return Err(Error::config(format!("intent {} is already registered", intent)));
        }
        tracing::debug!(intent = %intent, handler = %handler.contract().name, "Registered handler");
        self.handlers.insert(intent, handler);
        Ok(())
    }

    /// Builder-style `register` keyed by the handler's own contract.
    pub fn with(mut self, handler: Arc<dyn SkillHandler>) -> Result<Self> {
        let intent = handler.contract().intent;
        self.register(intent, handler)?;
        Ok(self)
    }

    /// Freeze the table. A GeneralQa handler is mandatory since every
    /// substitution and degradation lands there.
    pub fn build(self) -> Result<CapabilityRegistry> {
        let fallback = self
            .handlers
            .get(&Intent::GeneralQa)
            .cloned()
            .ok_or_else(|| Error::config("a general_qa handler must be registered"))?;
        Ok(CapabilityRegistry {
            handlers: self.handlers,
            fallback,
        })
    }
}

/// Immutable intent-to-handler table.
pub struct CapabilityRegistry {
    handlers: BTreeMap<Intent, Arc<dyn SkillHandler>>,
    fallback: Arc<dyn SkillHandler>,
}

impl CapabilityRegistry {
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::new()
    }

    pub fn resolve(&self, intent: Intent) -> Result<Arc<dyn SkillHandler>> {
        self.handlers
            .get(&intent)
            .cloned()
            .ok_or_else(|| Error::HandlerNotFound(intent.to_string()))
    }

    /// The GeneralQa handler.
    pub fn fallback(&self) -> Arc<dyn SkillHandler> {
        self.fallback.clone()
    }

    /// Contracts of every handler, in intent order.
    pub fn contracts(&self) -> Vec<HandlerContract> {
        self.handlers.values().map(|h| h.contract().clone()).collect()
    }

    pub fn intents(&self) -> impl Iterator<Item = Intent> + '_ {
        self.handlers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
