//! Forwarding device events into a tracker

use std::io;

use anyhow::{Context, Result};
use evdev::{Device, InputEvent, LedType};
use futures::{Stream, StreamExt};
use pedal_feedback_tracker::KeySender;
use tokio::task::JoinHandle;

use crate::device::DeviceInfo;
use crate::keymap::KeyboardState;

/// Read events until the stream ends or the tracker goes away.
///
/// Returns `Ok(())` when the tracker has been disposed; a read error from the
/// device (for example when it is unplugged) is returned as an error.
pub async fn forward_events<S>(
    mut events: S,
    mut keyboard: KeyboardState,
    keys: KeySender,
    device_name: &str,
) -> Result<()>
where
    S: Stream<Item = io::Result<InputEvent>> + Unpin,
{
    while let Some(event) = events.next().await {
        let event = event.with_context(|| format!("Failed to read from '{}'", device_name))?;

        let Some(raw_key) = keyboard.process(&event) else {
            continue;
        };

        tracing::trace!("{}: key down {:?}", device_name, raw_key);

        if keys.send(raw_key).await.is_err() {
            tracing::debug!("Tracker disposed, stopping reader for '{}'", device_name);
            return Ok(());
        }
    }

    tracing::debug!("Event stream for '{}' ended", device_name);
    Ok(())
}

/// Whether the device's Caps Lock LED is lit. Devices without LEDs (most
/// foot switches) report off.
fn caps_lock_lit(device: &Device, info: &DeviceInfo) -> bool {
    match device.get_led_state() {
        Ok(leds) => leds.contains(LedType::LED_CAPSL),
        Err(e) => {
            tracing::debug!("Could not read LED state of '{}': {}", info.name, e);
            false
        }
    }
}

/// Spawn a task reading `device` and feeding its key-downs to `keys`.
pub fn spawn_device_source(
    device: Device,
    info: &DeviceInfo,
    keys: KeySender,
) -> Result<JoinHandle<Result<()>>> {
    let keyboard = KeyboardState::with_caps_lock(caps_lock_lit(&device, info));
    if keyboard.caps_lock() {
        tracing::info!("Caps Lock is on for '{}'", info.name);
    }

    let stream = device.into_event_stream().with_context(|| {
        format!(
            "Failed to create event stream for device '{}' at {}",
            info.name,
            info.path.display()
        )
    })?;

    let events = Box::pin(futures::stream::unfold(stream, |mut stream| async move {
        let event = stream.next_event().await;
        Some((event, stream))
    }));

    let name = info.name.clone();
    tracing::info!(
        "Reading key events from '{}' ({}) at {}",
        info.name,
        info.vendor_product(),
        info.path.display()
    );

    Ok(tokio::spawn(async move {
        forward_events(events, keyboard, keys, &name).await
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use evdev::{EventType, Key};
    use pedal_feedback_tracker::{ActiveHalf, TrackerOptions, TrackerService};

    use super::*;
    use crate::keymap::event_value::{PRESS, RELEASE};

    fn key(key: Key, value: i32) -> io::Result<InputEvent> {
        Ok(InputEvent::new(EventType::KEY, key.code(), value))
    }

    fn syn() -> io::Result<InputEvent> {
        Ok(InputEvent::new(EventType::SYNCHRONIZATION, 0, 0))
    }

    #[tokio::test]
    async fn test_forwards_key_downs() {
        let handle = TrackerService::spawn(TrackerOptions::default());
        let mut snapshots = handle.subscribe();

        let events = futures::stream::iter(vec![
            key(Key::KEY_LEFTSHIFT, PRESS),
            syn(),
            key(Key::KEY_A, PRESS),
            syn(),
            key(Key::KEY_A, RELEASE),
            key(Key::KEY_LEFTSHIFT, RELEASE),
            syn(),
            key(Key::KEY_L, PRESS),
            syn(),
        ]);

        forward_events(events, KeyboardState::new(), handle.key_sender(), "test pedal")
            .await
            .unwrap();

        let snapshot = tokio::time::timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|snapshot| snapshot.history.len() == 2),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();

        assert_eq!(snapshot.history[0].key, "l");
        assert_eq!(snapshot.history[0].half, ActiveHalf::Top);
        assert_eq!(snapshot.history[1].key, "a");
        assert_eq!(snapshot.history[1].half, ActiveHalf::Bottom);

        handle.dispose().await;
    }

    #[tokio::test]
    async fn test_initial_caps_lock_flips_halves() {
        let handle = TrackerService::spawn(TrackerOptions::default());
        let mut snapshots = handle.subscribe();

        let events = futures::stream::iter(vec![key(Key::KEY_A, PRESS), syn()]);
        forward_events(
            events,
            KeyboardState::with_caps_lock(true),
            handle.key_sender(),
            "test pedal",
        )
        .await
        .unwrap();

        let snapshot = tokio::time::timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|snapshot| snapshot.history.len() == 1),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();

        assert_eq!(snapshot.history[0].key, "a");
        assert_eq!(snapshot.history[0].half, ActiveHalf::Bottom);

        handle.dispose().await;
    }

    #[tokio::test]
    async fn test_stops_when_tracker_disposed() {
        let handle = TrackerService::spawn(TrackerOptions::default());
        let keys = handle.key_sender();
        handle.dispose().await;

        let events = futures::stream::iter(vec![key(Key::KEY_A, PRESS)]);
        assert!(forward_events(events, KeyboardState::new(), keys, "test pedal").await.is_ok());
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let handle = TrackerService::spawn(TrackerOptions::default());

        let events = futures::stream::iter(vec![
            key(Key::KEY_A, PRESS),
            Err(io::Error::new(io::ErrorKind::Other, "No such device")),
            key(Key::KEY_L, PRESS),
        ]);

        let err = forward_events(events, KeyboardState::new(), handle.key_sender(), "test pedal")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("test pedal"));

        handle.dispose().await;
    }
}
