use crate::config::PresenterConfig;
use crate::dispatch::Dispatcher;
use crate::errors::PresenterError;
use crate::host::{FrameClock, FrameHandler, SurfaceSource};
use crate::presenter::scheduler::{Scheduler, SchedulerParts};
use crate::presenter::SwapchainPresenter;
use crate::render::LeaseFactory;
use std::sync::Arc;
use tokio::runtime::Handle;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Builder for a [`SwapchainPresenter`].
///
/// Surface source, dispatcher, lease factory and frame handler are required.
/// Without an explicit runtime the builder uses the ambient tokio runtime.
#[derive(Default)]
pub struct PresenterBuilder {
    source: Option<Arc<dyn SurfaceSource>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    factory: Option<Arc<dyn LeaseFactory>>,
    handler: Option<Arc<dyn FrameHandler>>,
    frame_clock: Option<Arc<dyn FrameClock>>,
    config: Option<PresenterConfig>,
    runtime: Option<Handle>,
    event_capacity: Option<usize>,
}

impl PresenterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface_source(mut self, source: Arc<dyn SurfaceSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn lease_factory(mut self, factory: Arc<dyn LeaseFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn FrameHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Compositor frame clock, required for the compositor loop driver.
    pub fn frame_clock(mut self, clock: Arc<dyn FrameClock>) -> Self {
        self.frame_clock = Some(clock);
        self
    }

    pub fn config(mut self, config: PresenterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Runtime that runs frame execution and the timer loop.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Capacity of the event bus. Slow subscribers lag beyond this.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity.max(1));
        self
    }

    pub fn build(self) -> Result<SwapchainPresenter, PresenterError> {
        let source = self.source.ok_or(PresenterError::MissingSurfaceSource)?;
        let dispatcher = self.dispatcher.ok_or(PresenterError::MissingDispatcher)?;
        let factory = self.factory.ok_or(PresenterError::MissingLeaseFactory)?;
        let handler = self.handler.ok_or(PresenterError::MissingFrameHandler)?;

        let config = self.config.unwrap_or_default();
        config.validate()?;

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()?,
        };

        let scheduler = Scheduler::new(SchedulerParts {
            source,
            dispatcher,
            factory,
            handler,
            frame_clock: self.frame_clock,
            runtime,
            config,
            event_capacity: self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY),
        });

        log::debug!("Presenter[{}/{}]: created", scheduler.id, scheduler.label);
        Ok(SwapchainPresenter::from_scheduler(scheduler))
    }
}
