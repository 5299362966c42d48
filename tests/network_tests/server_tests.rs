//! Server Tests
//!
//! End-to-end tests over a real TCP connection on localhost.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use traci_manager::network::{Server, TraciClient};
use traci_manager::protocol::{
    Command, Domain, GetCommand, PersonVar, Point2D, Response, SimulationVar, StatusCode,
    TraciCmd, TraciPacket, TraciValue,
};
use traci_manager::{Config, RemoteManager, TraciError};

// =============================================================================
// Helper Functions
// =============================================================================

const SCENARIO: &str = r#"{
    "name": "corridor",
    "simTimeStepLength": 0.4,
    "finishTime": 100.0,
    "topography": {"width": 20.0, "height": 10.0},
    "pedestrians": [
        {"id": 1, "position": {"x": 1.0, "y": 1.0}, "velocity": {"x": 1.0, "y": 0.0}},
        {"id": 2, "position": {"x": 5.0, "y": 5.0}}
    ]
}"#;

struct TestServer {
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
    addr: SocketAddr,
}

impl TestServer {
    fn start() -> Self {
        let config = Config::builder().listen_addr("127.0.0.1:0").build();
        let server = Arc::new(Server::bind(config, Arc::new(RemoteManager::new())).unwrap());
        let addr = server.local_addr().unwrap();

        let runner = Arc::clone(&server);
        let handle = thread::spawn(move || runner.run().unwrap());

        Self {
            server,
            handle: Some(handle),
            addr,
        }
    }

    fn client(&self) -> TraciClient {
        let config = Config::builder()
            .client_connect_attempts(3)
            .client_initial_backoff_ms(50)
            .build();
        TraciClient::connect(&self.addr.to_string(), &config).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn person(id: &str) -> String {
    id.to_string()
}

// =============================================================================
// Handshake
// =============================================================================

#[test]
fn test_get_version() {
    let server = TestServer::start();
    let mut client = server.client();

    let version = client.get_version().unwrap();
    assert_eq!(version.version_id, 20);
    assert!(version.version_string.starts_with("traci-manager"));
}

#[test]
fn test_connect_gives_up_after_attempts() {
    // bind and drop to get a port nobody listens on
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let config = Config::builder()
        .client_connect_attempts(2)
        .client_initial_backoff_ms(10)
        .build();

    assert!(matches!(
        TraciClient::connect(&addr.to_string(), &config),
        Err(TraciError::Network(_))
    ));
}

// =============================================================================
// Scenario Control
// =============================================================================

#[test]
fn test_send_file_step_and_query() {
    let server = TestServer::start();
    let mut client = server.client();

    client.send_file(SCENARIO).unwrap();

    let step = client.next_step(0.0).unwrap();
    assert_eq!(step.data, TraciValue::Integer(0));

    let time = client
        .get_value(Domain::Simulation, SimulationVar::CurrSimTime.id(), "")
        .unwrap();
    assert!((time.value.as_double().unwrap() - 0.4).abs() < 1e-9);

    let ids = client
        .get_value(Domain::Person, PersonVar::IdList.id(), "")
        .unwrap();
    assert_eq!(ids.value, TraciValue::StringList(vec![person("1"), person("2")]));
    assert_eq!(ids.response_id, 0xbe);

    let pos = client
        .get_value(Domain::Person, PersonVar::Position.id(), "1")
        .unwrap();
    let p = pos.value.as_position_2d().unwrap();
    assert!((p.x - 1.4).abs() < 1e-9);
    assert!((p.y - 1.0).abs() < 1e-9);
}

#[test]
fn test_step_to_target_time() {
    let server = TestServer::start();
    let mut client = server.client();
    client.send_file(SCENARIO).unwrap();

    client.next_step(2.0).unwrap();
    let time = client
        .get_value(Domain::Simulation, SimulationVar::CurrSimTime.id(), "")
        .unwrap();
    assert!((time.value.as_double().unwrap() - 2.0).abs() < 1e-9);
}

#[test]
fn test_load_scenario_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SCENARIO.as_bytes()).unwrap();
    let path = file.path().to_string_lossy().into_owned();

    let server = TestServer::start();
    let mut client = server.client();
    client.load(vec!["-c".to_string(), path]).unwrap();

    let count = client
        .get_value(Domain::Person, PersonVar::Count.id(), "")
        .unwrap();
    assert_eq!(count.value, TraciValue::Integer(2));
}

#[test]
fn test_load_missing_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.scenario");

    let server = TestServer::start();
    let mut client = server.client();
    let err = client
        .load(vec!["-c".to_string(), missing.to_string_lossy().into_owned()])
        .unwrap_err();
    assert!(matches!(err, TraciError::Rejected { cmd: 0x01, .. }));
}

#[test]
fn test_set_person_speed_and_position() {
    let server = TestServer::start();
    let mut client = server.client();
    client.send_file(SCENARIO).unwrap();

    client
        .set_value(Domain::Person, PersonVar::Speed.id(), "1", TraciValue::Double(2.0))
        .unwrap();
    let speed = client
        .get_value(Domain::Person, PersonVar::Speed.id(), "1")
        .unwrap();
    assert!((speed.value.as_double().unwrap() - 2.0).abs() < 1e-9);

    client
        .set_value(
            Domain::Person,
            PersonVar::Position.id(),
            "2",
            TraciValue::Position2D(Point2D::new(7.0, 3.0)),
        )
        .unwrap();
    let pos = client
        .get_value(Domain::Person, PersonVar::Position.id(), "2")
        .unwrap();
    assert_eq!(pos.value, TraciValue::Position2D(Point2D::new(7.0, 3.0)));
}

#[test]
fn test_network_bounding_box() {
    let server = TestServer::start();
    let mut client = server.client();
    client.send_file(SCENARIO).unwrap();

    let bbox = client
        .get_value(Domain::Simulation, SimulationVar::NetworkBoundingBox2D.id(), "")
        .unwrap();
    assert_eq!(
        bbox.value,
        TraciValue::Polygon(vec![Point2D::new(0.0, 0.0), Point2D::new(20.0, 10.0)])
    );
}

// =============================================================================
// Errors Keep the Connection Open
// =============================================================================

#[test]
fn test_step_without_scenario_is_rejected() {
    let server = TestServer::start();
    let mut client = server.client();

    let err = client.next_step(0.0).unwrap_err();
    assert!(matches!(err, TraciError::Rejected { cmd: 0x02, .. }));

    // connection still usable
    assert!(client.get_version().is_ok());
}

#[test]
fn test_bad_values_are_rejected() {
    let server = TestServer::start();
    let mut client = server.client();
    client.send_file(SCENARIO).unwrap();

    // wrong type for speed
    assert!(matches!(
        client.set_value(Domain::Person, PersonVar::Speed.id(), "1", TraciValue::Integer(2)),
        Err(TraciError::Rejected { cmd: 0xce, .. })
    ));

    // read-only variable
    assert!(client
        .set_value(Domain::Person, PersonVar::Count.id(), "", TraciValue::Integer(5))
        .is_err());

    // unknown pedestrian
    assert!(client
        .get_value(Domain::Person, PersonVar::Speed.id(), "99")
        .is_err());

    // unknown variable
    assert!(client.get_value(Domain::Simulation, 0x01, "").is_err());

    let count = client
        .get_value(Domain::Person, PersonVar::Count.id(), "")
        .unwrap();
    assert_eq!(count.value, TraciValue::Integer(2));
}

#[test]
fn test_one_reply_per_command_in_order() {
    let server = TestServer::start();
    let mut client = server.client();

    let mut packet = TraciPacket::create();
    packet.add_command(&[0x00]).unwrap();
    packet.add_command(&[0x55, 1, 2]).unwrap();
    packet.add_command(&[0x03, 0, 0, 0, 1]).unwrap();

    let responses = client.send_packet(packet).unwrap();
    assert_eq!(responses.len(), 3);
    assert!(matches!(responses[0], Response::Version(_)));
    assert_eq!(responses[1].status().cmd_id, 0x55);
    assert_eq!(responses[1].status().code, StatusCode::Err);
    assert_eq!(responses[2].status().cmd_id, 0x03);
    assert!(responses[2].status().is_ok());
}

#[test]
fn test_unsupported_commands_are_not_implemented() {
    let server = TestServer::start();
    let mut client = server.client();
    client.send_file(SCENARIO).unwrap();

    let responses = client
        .send_commands(&[
            Command::Subscribe {
                cmd: TraciCmd::Subscribe(Domain::Vehicle),
                payload: Bytes::from_static(&[0, 0, 0, 0]),
            },
            Command::Get(GetCommand::new(Domain::Vehicle, 0x00, "")),
        ])
        .unwrap();

    assert_eq!(responses.len(), 2);
    for response in &responses {
        assert_eq!(response.status().code, StatusCode::NotImplemented);
    }
}

// =============================================================================
// Session Lifecycle
// =============================================================================

#[test]
fn test_close_ends_connection_and_session() {
    let server = TestServer::start();

    let mut client = server.client();
    client.send_file(SCENARIO).unwrap();
    client.next_step(0.0).unwrap();
    assert!(client.close().unwrap().is_ok());

    // next client finds no scenario
    let mut client = server.client();
    assert!(client.next_step(0.0).is_err());
}

#[test]
fn test_session_survives_reconnect() {
    let server = TestServer::start();

    {
        let mut client = server.client();
        client.send_file(SCENARIO).unwrap();
        client.next_step(0.0).unwrap();
    }

    let mut client = server.client();
    client.next_step(0.0).unwrap();
    let time = client
        .get_value(Domain::Simulation, SimulationVar::CurrSimTime.id(), "")
        .unwrap();
    assert!((time.value.as_double().unwrap() - 0.8).abs() < 1e-9);
}
