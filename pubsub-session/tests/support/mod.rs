use loopback_transport::{LoopbackHub, LoopbackTransport};
use pubsub_session::{Session, SessionConfig};
use std::sync::Arc;

pub(crate) fn config(name: &str, endpoints: &[&str]) -> SessionConfig {
    let mut config = SessionConfig::default();
    config.name = name.to_string();
    config.connect.endpoints = endpoints.iter().map(|e| e.to_string()).collect();
    config
}

pub(crate) async fn open_local(name: &str) -> Session {
    Session::open(config(name, &[]))
        .await
        .expect("local session should open")
}

pub(crate) async fn open_on_hub(
    hub: &Arc<LoopbackHub>,
    name: &str,
    endpoints: &[&str],
) -> (Session, Arc<LoopbackTransport>) {
    let transport = hub.transport(name);
    let session = Session::open_with_transport(config(name, endpoints), transport.clone())
        .await
        .expect("session should open on loopback hub");
    (session, transport)
}

#[allow(dead_code)]
pub(crate) async fn assert_close_ok(session: &Session) {
    assert!(session.close().await.is_ok());
}
