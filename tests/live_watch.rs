mod support;

use std::net::TcpListener;
use std::time::Duration;

use gunwatch::capture::camera::CameraConfig;
use gunwatch::notify::StubSiren;
use gunwatch::watch::AlertPolicy;
use gunwatch::{CameraSource, DetectionClient, LiveWatch, WatchState};

use support::{failure_response, success_response, StubService};

fn stub_camera() -> CameraSource {
    let mut camera = CameraSource::new(CameraConfig {
        url: "stub://front_door".to_string(),
        width: 64,
        height: 48,
        sample_interval_ms: 1000,
    })
    .expect("stub camera");
    camera.connect().expect("stub camera connect");
    camera
}

#[test]
fn ticks_replace_detections_and_gate_alerts() {
    let service = StubService::spawn(Box::new(|_, _| success_response(&[("Gun", 85.0)])));
    let client = DetectionClient::new(&service.base_url, Duration::from_secs(5)).expect("client");
    let mut camera = stub_camera();
    let mut siren = StubSiren::default();

    let mut watch = LiveWatch::new(AlertPolicy::default(), 640, 480);
    watch.start();
    assert_eq!(watch.state(), WatchState::Streaming);

    let first = watch.tick(&mut camera, &client, &mut siren, 0).expect("tick");
    assert!(first.is_some(), "first qualifying detection must alert");

    let second = watch.tick(&mut camera, &client, &mut siren, 1000).expect("tick");
    assert!(second.is_none(), "cooldown must suppress the second alert");

    let third = watch.tick(&mut camera, &client, &mut siren, 6001).expect("tick");
    assert!(third.is_some());

    assert_eq!(watch.alerts().len(), 2);
    assert_eq!(watch.detections().len(), 1);
    assert_eq!(siren.rings, 2);

    let requests = service.requests();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(request["source"], "webcam");
    }

    watch.stop();
    assert_eq!(watch.state(), WatchState::Idle);
}

#[test]
fn service_failure_skips_frame_and_keeps_streaming() {
    let service = StubService::spawn(Box::new(|index, _| {
        if index == 0 {
            failure_response("model not loaded")
        } else {
            success_response(&[("Person", 55.0)])
        }
    }));
    let client = DetectionClient::new(&service.base_url, Duration::from_secs(5)).expect("client");
    let mut camera = stub_camera();
    let mut siren = StubSiren::default();

    let mut watch = LiveWatch::new(AlertPolicy::default(), 640, 480);
    watch.start();

    assert!(watch.tick(&mut camera, &client, &mut siren, 0).is_err());
    assert!(watch.detections().is_empty());
    assert_eq!(watch.state(), WatchState::Streaming);

    watch
        .tick(&mut camera, &client, &mut siren, 1000)
        .expect("loop continues on the next tick");
    assert_eq!(watch.detections().len(), 1);
    assert!(watch.alerts().is_empty());
}

#[test]
fn unavailable_camera_leaves_the_flow_idle() {
    // Bind-then-drop yields a port with nothing listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("probe port");
        listener.local_addr().expect("probe addr").port()
    };

    let mut camera = CameraSource::new(CameraConfig {
        url: format!("http://127.0.0.1:{}/stream", port),
        ..CameraConfig::default()
    })
    .expect("camera");

    let err = camera.connect();
    assert!(err.is_err(), "dead camera endpoint must fail to connect");

    // Setup failed, so streaming is never started.
    let watch = LiveWatch::new(AlertPolicy::default(), 640, 480);
    assert_eq!(watch.state(), WatchState::Idle);
}
