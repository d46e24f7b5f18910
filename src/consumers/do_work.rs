use tracing::info;

use crate::bus::PublishEndpoint;
use crate::consume::{ConsumeContext, Consumer};
use crate::contracts::{DoWork, SomeEvent1, SomeEvent2};
use crate::error::{ConfigError, ConsumeError};

/// Number of logged steps in one `DoWork` consumption.
pub const STEPS: u8 = 3;

/// Handles `DoWork` in three logged steps, publishing one event through the
/// consume context and one through the injected publish endpoint.
///
/// With the in-memory outbox enabled on its endpoint, `SomeEvent1` becomes
/// observable during the unit of work while `SomeEvent2` only appears once
/// the consumer has returned.
#[derive(Debug, Clone)]
pub struct DoWorkConsumer {
    publish_endpoint: PublishEndpoint,
    fail_after_step: Option<u8>,
}

impl DoWorkConsumer {
    pub fn new(publish_endpoint: PublishEndpoint) -> Self {
        Self {
            publish_endpoint,
            fail_after_step: None,
        }
    }

    /// Fail the consumption right after the given step (1 to 3) is logged.
    pub fn fail_after_step(mut self, step: u8) -> Result<Self, ConfigError> {
        if !(1..=STEPS).contains(&step) {
            return Err(ConfigError::Invalid(format!(
                "fail_after_step must be between 1 and {STEPS}, got {step}"
            )));
        }
        self.fail_after_step = Some(step);
        Ok(self)
    }

    fn checkpoint(&self, step: u8) -> Result<(), ConsumeError> {
        match self.fail_after_step {
            Some(fail) if fail == step => Err(ConsumeError::Step {
                step,
                reason: "injected failure".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl Consumer<DoWork> for DoWorkConsumer {
    fn consume(&self, ctx: &ConsumeContext<'_, DoWork>) -> Result<(), ConsumeError> {
        info!(message_id = %ctx.message_id(), ".... Do something 1");
        self.checkpoint(1)?;

        ctx.publish(&SomeEvent2)?;

        info!(message_id = %ctx.message_id(), ".... Do something 2");
        self.checkpoint(2)?;

        // Bypasses the endpoint's outbox: observable right away.
        self.publish_endpoint.publish(&SomeEvent1)?;

        info!(message_id = %ctx.message_id(), ".... Do something 3");
        self.checkpoint(3)?;

        Ok(())
    }
}
