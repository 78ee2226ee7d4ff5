use light_sensor_bridge::{Reading, SensorHost};
use light_sensor_bridge::channels::{LifecyclePolicy, MethodCall, MethodResponse};
use light_sensor_bridge::config::{Config, SimulationConfig};
use light_sensor_bridge::sensors::SimulatedLightSensor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn ticking_sensor(base_lux: f64) -> Arc<SimulatedLightSensor> {
    Arc::new(SimulatedLightSensor::new(&SimulationConfig {
        sensor_present: true,
        base_lux,
        jitter_lux: 0.0,
        period_ms: 100,
    }))
}

#[tokio::test(start_paused = true)]
async fn test_auto_start_stream_end_to_end() {
    let config = Config::default();
    let sensor = ticking_sensor(500.0);
    let host = SensorHost::new(&config, sensor.clone());
    let (tx, mut rx) = mpsc::channel(16);

    assert!(host.channels().listen("com.getup.alarm/light_sensor", Box::new(tx)));

    let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.lux(), 500.0);
    assert!(first.timestamp().is_some());

    assert!(host.channels().cancel("com.getup.alarm/light_sensor"));
    assert!(!host.bridge().is_listening());

    // Sink was detached and dropped, so the stream ends once drained.
    while let Ok(Some(_)) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {}
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(sensor.unregistrations(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_commands_drive_sensor() {
    let mut config = Config::default();
    config.lifecycle.policy = LifecyclePolicy::Explicit;
    let sensor = ticking_sensor(80.0);
    let host = SensorHost::new(&config, sensor.clone());
    let (tx, mut rx) = mpsc::channel::<Reading>(16);

    host.channels()
        .listen("com.getup.alarm/light_sensor", Box::new(tx));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());

    let reply = host
        .channels()
        .command()
        .handle_json(r#"{"method":"startLightSensor","arguments":null}"#)
        .unwrap();
    let reply: MethodResponse = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply, MethodResponse::success());

    tokio::time::sleep(Duration::from_millis(250)).await;
    let mut seen = 0;
    while let Ok(r) = rx.try_recv() {
        assert_eq!(r.lux(), 80.0);
        seen += 1;
    }
    assert!(seen >= 2, "expected readings after start, got {seen}");

    host.channels()
        .dispatch("com.getup.alarm/sensors", &MethodCall::new("stopLightSensor"));
    let delivered = host.bridge().delivered_count();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(host.bridge().delivered_count(), delivered);
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_missing_sensor_is_silent() {
    let mut config = Config::default();
    config.simulation.sensor_present = false;
    let sensor = Arc::new(SimulatedLightSensor::new(&config.simulation));
    let host = SensorHost::new(&config, sensor.clone());
    let (tx, mut rx) = mpsc::channel::<Reading>(16);

    host.channels()
        .listen("com.getup.alarm/light_sensor", Box::new(tx));
    let reply = host
        .channels()
        .dispatch("com.getup.alarm/sensors", &MethodCall::new("startLightSensor"));
    assert_eq!(reply, Some(MethodResponse::success()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(rx.try_recv().is_err());
    assert!(!host.bridge().is_listening());
    assert_eq!(sensor.registrations(), 0);
}
