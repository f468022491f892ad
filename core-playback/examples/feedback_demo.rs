//! # Feedback Engine Walkthrough
//!
//! Drives the engine against the simulated desktop host: a synthetic event
//! before any user gesture, a burst of real clicks, a hidden window and a
//! final teardown.
//!
//! Run with: `cargo run --example feedback_demo --package core-playback`
//!
//! Set `FEEDBACK_RESTRICTED_AUTOPLAY=1` to watch audio get refused by the
//! simulated autoplay policy.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bridge_desktop::{
    detect_capabilities, ChannelHostLifecycle, SimulatedMediaHost, SurfaceScript,
};
use bridge_traits::LogLevel;
use core_playback::{FeedbackController, InteractionEvent, PlaybackConfig, Point};
use core_runtime::config::CoreConfig;
use core_runtime::events::CoreEvent;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use tracing::info;

#[core_async::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )
    .context("installing log subscriber")?;

    let capabilities = detect_capabilities();
    let audio_script = if capabilities.has_restricted_autoplay_policy {
        SurfaceScript::default()
            .with_clip_duration(Duration::from_millis(800))
            .policy_denied()
    } else {
        SurfaceScript::default().with_clip_duration(Duration::from_millis(800))
    };
    let host = Arc::new(SimulatedMediaHost::new().with_audio_script(audio_script));
    let lifecycle = Arc::new(ChannelHostLifecycle::new());

    let core = CoreConfig::builder()
        .media_host(host.clone())
        .capabilities(capabilities)
        .host_lifecycle(lifecycle.clone())
        .follow_host_lifecycle(true)
        .build()
        .context("building core configuration")?;
    let playback = PlaybackConfig {
        emergency_lifetime_ms: 3_000,
        ..PlaybackConfig::default()
    };
    let controller = FeedbackController::new(core, playback)?;
    controller.start().await?;

    let mut events = controller.subscribe();
    core_async::spawn(async move {
        while let Ok(event) = events.recv().await {
            if matches!(event, CoreEvent::Request(_) | CoreEvent::Host(_)) {
                info!(severity = ?event.severity(), "{}", event.description());
            }
        }
    });

    info!("Synthetic event before any gesture: visual only");
    let synthetic = InteractionEvent::click(Point::new(40.0, 40.0), controller.clock()).synthetic();
    if let Some(handle) = controller.handle_interaction(synthetic) {
        info!(outcome = ?handle.outcome().await, "Synthetic request settled");
    }

    info!("Burst of five clicks");
    let mut handles = Vec::new();
    for i in 0..5 {
        let click = InteractionEvent::click(Point::new(10.0 * i as f64, 20.0), controller.clock());
        handles.extend(controller.handle_interaction(click));
        core_async::sleep(Duration::from_millis(10)).await;
    }
    for handle in handles {
        let id = handle.id;
        info!(request_id = %id, outcome = ?handle.outcome().await, "Click settled");
    }
    info!(live = controller.live_count(), "Media still playing");

    info!("Window hidden");
    lifecycle.set_hidden(true);
    core_async::sleep(Duration::from_millis(50)).await;
    lifecycle.set_hidden(false);

    controller.wait_until_idle().await;
    info!(
        created = host.created_count(),
        attached = host.attached_count(),
        interactions = controller.interaction_count(),
        "Every surface released"
    );

    lifecycle.teardown();
    core_async::sleep(Duration::from_millis(10)).await;
    info!(torn_down = controller.is_torn_down(), "Demo finished");
    Ok(())
}
