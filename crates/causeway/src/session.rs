//! One cause stack per execution context.
//!
//! A [`Session`] is what a worker, connection or thread owns: its own
//! [`CauseStack`] rooted at the configured root cause, plus the registry
//! handle it was given. Sessions are never shared. To hand attribution to
//! another thread, send a [`Cause`] snapshot from [`Session::snapshot`].

use std::sync::Arc;

use causeway_stack::prelude::{Cause, CauseStack, StackError, ViolationPolicy};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::event::{Emit, EventSink};
use crate::registry::Registry;
use crate::statistic::{EntityStatistic, EntityType};
use crate::RegistryError;

/// A cause stack plus the handles its operations need.
#[derive(Debug)]
pub struct Session {
    stack: CauseStack,
    config: SessionConfig,
    entity_types: Arc<Registry<EntityType>>,
}

impl Session {
    /// Start a session rooted at `config.root_cause`.
    pub fn new(config: SessionConfig, entity_types: Arc<Registry<EntityType>>) -> Self {
        let stack = CauseStack::with_root(config.root_cause.clone(), config.stack.clone());
        debug!(root = %config.root_cause, "session started");
        Self {
            stack,
            config,
            entity_types,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stack(&self) -> &CauseStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut CauseStack {
        &mut self.stack
    }

    pub fn entity_types(&self) -> &Arc<Registry<EntityType>> {
        &self.entity_types
    }

    /// Immutable copy of the current cause, safe to send to other threads.
    pub fn snapshot(&self) -> Cause {
        self.stack.current_cause()
    }

    /// A statistic for `entity_type_id`, resolved through this session's
    /// registry.
    pub fn statistic(
        &self,
        category: &str,
        entity_type_id: &str,
    ) -> Result<EntityStatistic, RegistryError> {
        EntityStatistic::new(category, entity_type_id, self.entity_types.as_ref())
    }

    /// Raise `payload` to `sink` under the current cause.
    pub fn emit<P, S>(&mut self, sink: &mut S, payload: P) -> Result<Option<P>, StackError>
    where
        S: EventSink<P> + ?Sized,
    {
        self.stack.run(Emit::new(sink, payload))
    }

    /// End the session, checking that every frame was closed.
    ///
    /// Under [`ViolationPolicy::Recover`] leaked frames are logged and force
    /// closed instead of reported.
    pub fn end(mut self) -> Result<(), StackError> {
        if !self.config.stack.leak_check {
            return Ok(());
        }
        let Err(err) = self.stack.check_leaks() else {
            return Ok(());
        };
        match self.config.stack.policy {
            ViolationPolicy::Strict => Err(err),
            ViolationPolicy::Recover => {
                warn!(error = %err, "session ended with open frames");
                self.stack.unwind_frames();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_stack::prelude::StackConfig;

    fn registry() -> Arc<Registry<EntityType>> {
        let mut registry = Registry::new("entity_type");
        registry
            .register("zombie", EntityType::new("zombie", "Zombie"))
            .unwrap();
        registry.into_shared()
    }

    fn config(stack: StackConfig) -> SessionConfig {
        SessionConfig {
            stack,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn rooted_at_configured_cause() {
        let session = Session::new(SessionConfig::default(), registry());
        let root = session.snapshot();
        assert_eq!(root.len(), 1);
        assert_eq!(root.root().unwrap().downcast_ref::<String>().unwrap(), "server");
    }

    #[test]
    fn strict_end_reports_leaks() {
        let mut session = Session::new(config(StackConfig::strict()), registry());
        let _leaked = session.stack_mut().push_cause_frame();
        assert!(matches!(session.end(), Err(StackError::LeakedFrames { .. })));
    }

    #[test]
    fn recovering_end_unwinds_leaks() {
        let mut session = Session::new(config(StackConfig::recovering()), registry());
        let _leaked = session.stack_mut().push_cause_frame();
        assert!(session.end().is_ok());
    }

    #[test]
    fn clean_end() {
        let mut session = Session::new(config(StackConfig::strict()), registry());
        session.stack_mut().with_frame(|s| s.push_cause(1u8)).unwrap();
        assert!(session.end().is_ok());
    }

    #[test]
    fn statistic_uses_session_registry() {
        let session = Session::new(SessionConfig::default(), registry());
        assert_eq!(session.statistic("killed", "zombie").unwrap().key(), "killed:zombie");
        assert!(session.statistic("killed", "ghast").is_err());
    }
}
