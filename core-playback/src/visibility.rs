//! # Visibility Coordination
//!
//! Reacts to host lifecycle signals:
//!
//! - **hidden**: every `Playing` instance is paused. Paused instances stay
//!   registered; the emergency reaper still bounds their lifetime.
//! - **visible**: nothing resumes automatically.
//! - **teardown**: every live instance is disposed.

use bridge_traits::{HostSignal, HostSignalStream};
use core_async::task::JoinHandle;
use core_runtime::events::{CoreEvent, DisposeReason, EventBus, HostEvent};
use tracing::{debug, info};

use crate::instance::InstanceState;
use crate::lifecycle::ResourceLifecycleManager;

#[derive(Clone)]
pub struct VisibilityCoordinator {
    lifecycle: ResourceLifecycleManager,
    events: EventBus,
}

impl VisibilityCoordinator {
    pub fn new(lifecycle: ResourceLifecycleManager, events: EventBus) -> Self {
        Self { lifecycle, events }
    }

    /// Apply a visibility change. Returns how many instances were paused.
    pub fn on_visibility_changed(&self, hidden: bool) -> usize {
        let paused = if hidden {
            self.lifecycle
                .live_instances()
                .iter()
                .filter(|instance| instance.state() == InstanceState::Playing)
                .filter(|instance| instance.pause())
                .count()
        } else {
            0
        };

        debug!(hidden, paused, "Visibility changed");
        self.events
            .emit(CoreEvent::Host(HostEvent::VisibilityChanged { hidden, paused }))
            .ok();
        paused
    }

    /// Dispose every live instance. Returns how many were released.
    pub fn teardown(&self) -> usize {
        let disposed = self.lifecycle.dispose_all(DisposeReason::Teardown);
        info!(disposed, "Host teardown released live media");
        self.events
            .emit(CoreEvent::Host(HostEvent::TornDown { disposed }))
            .ok();
        disposed
    }

    /// Forward signals from `stream` to `on_signal` until the stream closes
    /// or delivers teardown.
    pub fn watch<F>(mut stream: Box<dyn HostSignalStream>, mut on_signal: F) -> JoinHandle<()>
    where
        F: FnMut(HostSignal) + Send + 'static,
    {
        core_async::spawn(async move {
            while let Some(signal) = stream.next().await {
                on_signal(signal);
                if signal == HostSignal::Teardown {
                    break;
                }
            }
            debug!("Host lifecycle stream finished");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{InstanceId, MediaInstance};
    use crate::request::RequestId;
    use bridge_desktop::{ChannelHostLifecycle, SimulatedMediaHost};
    use bridge_traits::{HostLifecycle, MediaHost, MediaKind, SurfaceSpec};
    use core_async::time::{sleep, Duration};
    use parking_lot::Mutex;
    use std::sync::Arc;

    async fn playing_instance(
        host: &SimulatedMediaHost,
        manager: &ResourceLifecycleManager,
        events: &EventBus,
        id: u64,
    ) -> Arc<MediaInstance> {
        let surface = host
            .create_surface(SurfaceSpec::new(MediaKind::Visual, "clip"))
            .unwrap();
        let instance = Arc::new(MediaInstance::new(
            InstanceId::new(id),
            RequestId::new(id),
            MediaKind::Visual,
            "clip",
            surface,
            events.clone(),
        ));
        manager.register(&instance, Duration::from_secs(10));
        instance.transition(InstanceState::Loading).unwrap();
        instance.surface().load().unwrap();
        crate::readiness::wait_until_ready(&instance, Duration::from_secs(2))
            .await
            .unwrap();
        instance.transition(InstanceState::Ready).unwrap();
        instance.surface().play().await.unwrap();
        instance.transition(InstanceState::Playing).unwrap();
        instance
    }

    #[core_async::test(start_paused)]
    async fn test_hidden_pauses_playing_instances() {
        let events = EventBus::new(64);
        let host = SimulatedMediaHost::new();
        let manager = ResourceLifecycleManager::new(events.clone());
        let coordinator = VisibilityCoordinator::new(manager.clone(), events.clone());

        let a = playing_instance(&host, &manager, &events, 1).await;
        let b = playing_instance(&host, &manager, &events, 2).await;

        assert_eq!(coordinator.on_visibility_changed(true), 2);
        assert!(a.surface().is_paused());
        assert!(b.surface().is_paused());
        // Paused instances remain live and keep their state.
        assert_eq!(manager.live_count(), 2);
        assert_eq!(a.state(), InstanceState::Playing);

        // Already paused: nothing more to do.
        assert_eq!(coordinator.on_visibility_changed(true), 0);
    }

    #[core_async::test(start_paused)]
    async fn test_visible_does_not_resume() {
        let events = EventBus::new(64);
        let host = SimulatedMediaHost::new();
        let manager = ResourceLifecycleManager::new(events.clone());
        let coordinator = VisibilityCoordinator::new(manager.clone(), events.clone());
        let instance = playing_instance(&host, &manager, &events, 1).await;

        coordinator.on_visibility_changed(true);
        assert_eq!(coordinator.on_visibility_changed(false), 0);
        assert!(instance.surface().is_paused());
        assert_eq!(host.surfaces()[0].play_calls(), 1);
    }

    #[core_async::test(start_paused)]
    async fn test_paused_instance_is_still_reaped() {
        let events = EventBus::new(64);
        let host = SimulatedMediaHost::new();
        let manager = ResourceLifecycleManager::new(events.clone());
        let coordinator = VisibilityCoordinator::new(manager.clone(), events.clone());
        let instance = playing_instance(&host, &manager, &events, 1).await;

        coordinator.on_visibility_changed(true);
        manager.wait_until_idle().await;
        assert!(instance.is_disposed());
        assert!(instance.age() >= Duration::from_secs(10));
    }

    #[core_async::test(start_paused)]
    async fn test_teardown_disposes_everything() {
        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let host = SimulatedMediaHost::new();
        let manager = ResourceLifecycleManager::new(events.clone());
        let coordinator = VisibilityCoordinator::new(manager.clone(), events.clone());
        let _a = playing_instance(&host, &manager, &events, 1).await;
        let _b = playing_instance(&host, &manager, &events, 2).await;

        assert_eq!(coordinator.teardown(), 2);
        assert_eq!(manager.live_count(), 0);
        assert_eq!(host.attached_count(), 0);

        let mut torn_down = None;
        while let Ok(event) = rx.try_recv() {
            if let CoreEvent::Host(HostEvent::TornDown { disposed }) = event {
                torn_down = Some(disposed);
            }
        }
        assert_eq!(torn_down, Some(2));
    }

    #[core_async::test(start_paused)]
    async fn test_watch_forwards_until_teardown() {
        let lifecycle = ChannelHostLifecycle::new();
        let stream = lifecycle.subscribe().await.unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let handle = VisibilityCoordinator::watch(stream, move |signal| sink.lock().push(signal));

        lifecycle.set_hidden(true);
        sleep(Duration::from_millis(1)).await;
        lifecycle.set_hidden(false);
        sleep(Duration::from_millis(1)).await;
        lifecycle.teardown();
        handle.await.unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                HostSignal::Visibility { hidden: true },
                HostSignal::Visibility { hidden: false },
                HostSignal::Teardown,
            ]
        );
    }
}
