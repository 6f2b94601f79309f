//! Role, search and join lifecycle against a scripted transport.

mod common;

use common::*;

#[tokio::test]
async fn test_search_lifecycle_and_discovery_dedupe() {
    let (transport, controller) = connect_as(Role::Normal).await;
    let mut events = controller.subscribe_session_events();

    transport.push_reply(Reply::Ack);
    controller.start_master_search().await.unwrap();

    let again = controller.start_master_search().await;
    assert!(matches!(again, Err(RcError::SearchAlreadyActive)));

    // The same master announcing twice yields one entry and one event.
    transport.push_sample(TelemetrySample::Session(SessionEvent::DiscoveredMaster(rc(9, "ALPHA")))).await;
    transport.push_sample(TelemetrySample::Session(SessionEvent::DiscoveredMaster(rc(9, "ALPHA")))).await;
    assert_eq!(events.recv().await.unwrap(), SessionEvent::DiscoveredMaster(rc(9, "ALPHA")));
    settle().await;

    let masters = controller.available_masters().await;
    assert_eq!(masters.len(), 1);
    assert_eq!(masters[0].id, RcId(9));

    transport.push_reply(Reply::Ack);
    controller.stop_master_search().await.unwrap();
    controller.stop_master_search().await.unwrap();

    assert_eq!(
        transport.sent_after_connect(),
        vec![Request::StartMasterSearch, Request::StopMasterSearch],
        "rejected and idle calls must stay off the wire"
    );
    assert_eq!(controller.available_masters().await.len(), 1, "results survive a stop");
}

#[tokio::test]
async fn test_discovery_outside_a_scan_is_dropped() {
    let (transport, controller) = connect_as(Role::Normal).await;

    transport.push_sample(TelemetrySample::Session(SessionEvent::DiscoveredMaster(rc(9, "ALPHA")))).await;
    settle().await;
    assert!(controller.available_masters().await.is_empty());
}

#[tokio::test]
async fn test_join_master_records_credentials() {
    let (transport, controller) = connect_as(Role::Normal).await;

    transport.push_reply(Reply::JoinMaster(JoinMasterResult::Successful));
    let result = controller.join_master(RcId(9), "ALPHA", "1234").await.unwrap();
    assert_eq!(result, JoinMasterResult::Successful);

    let joined = controller.joined_master().await.expect("join must be recorded");
    assert_eq!(joined.id, RcId(9));
    assert_eq!(joined.name, "ALPHA");
    assert_eq!(joined.password, "1234");
}

#[tokio::test]
async fn test_join_rejection_is_a_value_not_an_error() {
    let (transport, controller) = connect_as(Role::Normal).await;

    transport.push_reply(Reply::JoinMaster(JoinMasterResult::ReachMaximum));
    let result = controller.join_master(RcId(9), "ALPHA", "1234").await.unwrap();
    assert_eq!(result, JoinMasterResult::ReachMaximum);
    assert!(controller.joined_master().await.is_none());
}

#[tokio::test]
async fn test_join_with_a_malformed_password_stays_local() {
    let (transport, controller) = connect_as(Role::Normal).await;

    let result = controller.join_master(RcId(9), "ALPHA", "12345").await;
    assert!(matches!(result, Err(RcError::InvalidParameter("password", _))));
    assert!(transport.sent_after_connect().is_empty());
}

#[tokio::test]
async fn test_remove_master_skips_the_wire_when_not_attached() {
    let (transport, controller) = connect_as(Role::Normal).await;

    controller.remove_master(RcId(9)).await.unwrap();
    assert!(transport.sent_after_connect().is_empty());

    transport.push_reply(Reply::JoinMaster(JoinMasterResult::Successful));
    controller.join_master(RcId(9), "ALPHA", "1234").await.unwrap();

    // Naming the wrong master is just as much of a no-op.
    controller.remove_master(RcId(8)).await.unwrap();
    assert!(controller.joined_master().await.is_some());

    transport.push_reply(Reply::Ack);
    controller.remove_master(RcId(9)).await.unwrap();
    assert!(controller.joined_master().await.is_none());
    assert!(transport.sent_after_connect().contains(&Request::RemoveMaster { id: RcId(9) }));
}

#[tokio::test]
async fn test_remove_slave_is_idempotent() {
    let (transport, controller) = connect_as(Role::Master).await;
    let mut events = controller.subscribe_session_events();

    transport.push_sample(TelemetrySample::Session(SessionEvent::SlaveJoined(rc(2, "BRAVO")))).await;
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SlaveJoined(rc(2, "BRAVO")));

    transport.push_reply(Reply::Ack);
    controller.remove_slave(RcId(2)).await.unwrap();
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SlaveLeft(RcId(2)));

    // The hardware is told again, the mirror has nothing left to do.
    transport.push_reply(Reply::Ack);
    controller.remove_slave(RcId(2)).await.unwrap();
    settle().await;
    assert!(events.try_recv().is_err(), "a second removal must not publish again");
    assert_eq!(
        transport.sent_after_connect(),
        vec![
            Request::RemoveSlave { id: RcId(2) },
            Request::RemoveSlave { id: RcId(2) },
        ]
    );
}

#[tokio::test]
async fn test_slave_list_resyncs_the_mirror() {
    let (transport, controller) = connect_as(Role::Master).await;
    let mut events = controller.subscribe_session_events();

    transport.push_sample(TelemetrySample::Session(SessionEvent::SlaveJoined(rc(2, "BRAVO")))).await;
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SlaveJoined(rc(2, "BRAVO")));

    // The hardware reports a different table: 2 is gone, 3 appeared.
    transport.push_reply(Reply::SlaveList(vec![rc(3, "CHARLY")]));
    let slaves = controller.slave_list().await.unwrap();
    assert_eq!(slaves.len(), 1);
    assert_eq!(slaves[0].id, RcId(3));

    assert_eq!(events.recv().await.unwrap(), SessionEvent::SlaveJoined(rc(3, "CHARLY")));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SlaveLeft(RcId(2)));
}

#[tokio::test]
async fn test_master_disconnect_clears_the_join() {
    let (transport, controller) = connect_as(Role::Normal).await;
    let mut events = controller.subscribe_session_events();

    transport.push_reply(Reply::JoinMaster(JoinMasterResult::Successful));
    controller.join_master(RcId(9), "ALPHA", "1234").await.unwrap();

    transport.push_sample(TelemetrySample::Session(SessionEvent::MasterDisconnected)).await;
    assert_eq!(events.recv().await.unwrap(), SessionEvent::MasterDisconnected);
    assert!(controller.joined_master().await.is_none());
}

#[tokio::test]
async fn test_search_state_follows_the_wire() {
    let (transport, controller) = connect_as(Role::Normal).await;

    transport.push_reply(Reply::Ack);
    controller.start_master_search().await.unwrap();

    // The firmware timed the scan out on its own.
    transport.push_reply(Reply::SearchState { active: false });
    assert_eq!(controller.search_state().await.unwrap(), MasterSearchState::Stopped);

    // Stopping now is local, the scan is already over.
    controller.stop_master_search().await.unwrap();
    assert_eq!(
        transport.sent_after_connect(),
        vec![Request::StartMasterSearch, Request::GetSearchState]
    );
}

#[tokio::test]
async fn test_set_role_round_trip() {
    let (transport, controller) = connect_as(Role::Normal).await;

    transport.push_reply(Reply::Ack);
    controller.set_role(Role::Master).await.unwrap();

    transport.push_reply(Reply::Role { role: Role::Master, connected: true });
    let (role, connected) = controller.role().await.unwrap();
    assert_eq!(role, Role::Master);
    assert!(connected);

    let unknown = controller.set_role(Role::Unknown).await;
    assert!(matches!(unknown, Err(RcError::InvalidParameter("role", _))));
}
