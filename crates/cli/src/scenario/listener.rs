//! Listeners driven by a scenario's `ListenerSpec`.

use std::time::Duration;

use contracts::{Event, Listener, ListenerAction, ListenerFuture, ListenerResult, ListenerSpec};
use thiserror::Error;
use tracing::{info, warn};

/// Failure requested by a `fail` listener
#[derive(Debug, Error)]
#[error("listener '{listener}' failed on payload '{payload}' as scripted")]
pub struct ScriptedFailure {
    pub listener: String,
    pub payload: String,
}

/// Listener that suspends, logs, then performs its configured action
#[derive(Debug, Clone)]
pub struct ScriptedListener {
    dispatcher: String,
    spec: ListenerSpec,
}

impl ScriptedListener {
    pub fn new(dispatcher: impl Into<String>, spec: ListenerSpec) -> Self {
        Self {
            dispatcher: dispatcher.into(),
            spec,
        }
    }
}

impl Listener<String> for ScriptedListener {
    fn on_event(&self, event: Event<String>) -> ListenerFuture {
        let dispatcher = self.dispatcher.clone();
        let listener = self.spec.name.clone();
        let delay = Duration::from_millis(self.spec.delay_ms);
        let action = self.spec.action;

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            info!(
                dispatcher = %dispatcher,
                listener = %listener,
                payload = %event.value(),
                "Listener received event"
            );

            let result: ListenerResult = match action {
                ListenerAction::Log => Ok(()),
                ListenerAction::CancelEvent => {
                    if !event.cancel() && !event.is_cancellable() {
                        warn!(
                            dispatcher = %dispatcher,
                            listener = %listener,
                            "Event is not cancellable, propagation continues"
                        );
                    }
                    Ok(())
                }
                ListenerAction::Fail => Err(ScriptedFailure {
                    listener,
                    payload: event.value().clone(),
                }
                .into()),
            };
            result
        })
    }
}
