// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Wires a backend into a factory, a command queue and a render worker.
*/

use std::sync::Arc;

use crate::bindings::resource_tracking::Registry;
use crate::images::command_queue::{CommandQueue, Shared};
use crate::images::factory::DataFactory;
use crate::images::pending::PendingChanges;
use crate::images::render_worker;
use crate::imp::{Context, ContextOwner, Device};
use crate::multibuffer::{DEFAULT_SLOT_COUNT, MAX_SLOT_COUNT, MIN_SLOT_COUNT};

/**
Engine settings.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Command buffers, and physical copies of each dynamic resource.
    pub slot_count: usize,
    /// Sample count for render textures.
    pub draw_samples: u32,
    /// Name of the render worker thread.
    pub worker_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            slot_count: DEFAULT_SLOT_COUNT,
            draw_samples: 1,
            worker_name: "render worker".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn slot_count(mut self, slot_count: usize) -> Self {
        self.slot_count = slot_count;
        self
    }
    pub fn draw_samples(mut self, draw_samples: u32) -> Self {
        self.draw_samples = draw_samples;
        self
    }
    pub fn worker_name(mut self, worker_name: impl Into<String>) -> Self {
        self.worker_name = worker_name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SLOT_COUNT..=MAX_SLOT_COUNT).contains(&self.slot_count) {
            return Err(ConfigError::SlotCount(self.slot_count));
        }
        if !self.draw_samples.is_power_of_two() {
            return Err(ConfigError::DrawSamples(self.draw_samples));
        }
        if self.worker_name.contains('\0') {
            return Err(ConfigError::WorkerName);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("slot count {0} is outside 2..=32")]
    SlotCount(usize),
    #[error("draw sample count {0} is not a power of two")]
    DrawSamples(u32),
    #[error("worker name contains a NUL byte")]
    WorkerName,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CreateError {
    #[error("Invalid configuration {0}")]
    Config(#[from] ConfigError),
    #[error("Can't spawn render worker {0}")]
    Spawn(#[from] std::io::Error),
}

/**
A running engine.

Owns the command queue, and through it the render worker.  Dropping the engine stops the worker.
*/
#[derive(Debug)]
pub struct Engine {
    factory: DataFactory,
    queue: CommandQueue,
    context_version: String,
}

impl Engine {
    /**
    Starts the render worker on `context` and returns once the context is initialized.
    */
    pub fn new(
        device: Arc<dyn Device>,
        context: impl Context + 'static,
        owner: impl ContextOwner + 'static,
        config: EngineConfig,
    ) -> Result<Self, CreateError> {
        config.validate()?;
        let registry = Arc::new(Registry::new());
        let pending = Arc::new(PendingChanges::new());
        let shared = Arc::new(Shared::new(config.slot_count));
        let (worker, context_version) = render_worker::spawn(
            &config.worker_name,
            shared.clone(),
            pending.clone(),
            Box::new(context),
            Box::new(owner),
        )?;
        logwise::info_sync!(
            "engine started on {platform} with {slots} slots",
            platform = logwise::privacy::LogIt(&device.platform()),
            slots = config.slot_count
        );
        let factory = DataFactory::new(
            device.clone(),
            registry.clone(),
            pending,
            config.slot_count,
            config.draw_samples,
        );
        let queue = CommandQueue::new(shared, registry, device, worker);
        Ok(Engine {
            factory,
            queue,
            context_version,
        })
    }

    /// An engine on the no-op backend.
    pub fn headless(config: EngineConfig) -> Result<Self, CreateError> {
        let (device, context, owner) = crate::imp::nop::backend();
        Self::new(device, context, owner, config)
    }

    /// A new handle on the engine's factory.
    pub fn factory(&self) -> DataFactory {
        self.factory.clone()
    }

    pub fn queue(&mut self) -> &mut CommandQueue {
        &mut self.queue
    }

    /// The version string the context reported at startup.
    pub fn context_version(&self) -> &str {
        &self.context_version
    }

    /// Splits the engine, so the factory can move to another thread.
    pub fn into_parts(self) -> (DataFactory, CommandQueue) {
        (self.factory, self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
        assert_eq!(
            EngineConfig::default().slot_count(1).validate(),
            Err(ConfigError::SlotCount(1))
        );
        assert_eq!(
            EngineConfig::default().slot_count(33).validate(),
            Err(ConfigError::SlotCount(33))
        );
        assert_eq!(
            EngineConfig::default().draw_samples(0).validate(),
            Err(ConfigError::DrawSamples(0))
        );
        assert_eq!(
            EngineConfig::default().draw_samples(3).validate(),
            Err(ConfigError::DrawSamples(3))
        );
        assert_eq!(
            EngineConfig::default().worker_name("a\0b").validate(),
            Err(ConfigError::WorkerName)
        );
    }

    #[test]
    fn headless_starts_and_stops() {
        let mut engine = Engine::headless(EngineConfig::default()).unwrap();
        assert!(!engine.context_version().is_empty());
        assert_eq!(engine.factory().slot_count(), DEFAULT_SLOT_COUNT);
        engine.queue().execute();
        engine.queue().stop_renderer();
        engine.queue().stop_renderer();
    }

    #[test]
    fn bad_config_is_rejected() {
        let err = Engine::headless(EngineConfig::default().slot_count(0)).unwrap_err();
        assert!(matches!(err, CreateError::Config(ConfigError::SlotCount(0))));
    }
}
