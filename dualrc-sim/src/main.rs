mod link;

use clap::Parser;
use dualrc_lib::RemoteController;
use dualrc_lib::arbiter::{ArbiterConfig, ArbiterEvent};
use dualrc_lib::control::ControlMode;
use dualrc_lib::identity::{RcId, RcIdentity};
use dualrc_lib::pairing::PairingState;
use dualrc_lib::session::{JoinMasterResult, Role, SessionEvent};
use link::{DecisionPolicy, SimLink, SimPeer};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Walk a remote controller through both sides of a master/slave session on a simulated link"
)]
struct Args {
    /// How to answer gimbal requests while running as master
    #[arg(long, value_enum, default_value = "grant")]
    policy: DecisionPolicy,

    /// How the remote master answers once this unit runs as slave
    #[arg(long, value_enum, default_value = "grant")]
    remote_policy: DecisionPolicy,

    /// Peer controllers in radio range
    #[arg(short, long, default_value = "2")]
    peers: usize,

    /// Seconds a gimbal request may wait for an answer
    #[arg(short, long, default_value = "2")]
    window: u64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let window = Duration::from_secs(args.window);
    let peers: Vec<SimPeer> = (0..args.peers)
        .map(|i| SimPeer::new(10 + i as u32, &format!("WING-{}", i + 1), "1111"))
        .collect();

    let link = Arc::new(SimLink::new(peers, args.remote_policy, window));
    link.start_background_traffic();

    let identity = RcIdentity::new(RcId(1)).with_name("LEAD");
    let controller = RemoteController::connect_with(
        link,
        identity,
        ArbiterConfig { response_window: window },
    )
    .await?;

    let caps = controller.capabilities().await?;
    println!("Connected as {} (#{})", label(controller.identity()), controller.id());
    println!(
        "Product: master/slave {}, remote focus {}, up to {} slaves",
        caps.supports_master_slave, caps.supports_remote_focus, caps.max_slaves
    );

    controller.set_name("LEAD").await?;
    controller.set_password("1234").await?;
    info!("unit renamed to {}", controller.name().await?);

    // One frame from the background stick stream.
    let mut hardware = controller.subscribe_hardware_state();
    let frame = hardware.recv().await?;
    println!("Left stick at {}", frame.left_horizontal.value);

    run_pairing(&controller).await?;

    let expected = args.peers.min(caps.max_slaves);
    run_as_master(&controller, args.policy, expected).await?;
    run_as_slave(&controller).await?;

    println!("Demo complete");
    Ok(())
}

/// Pair with the aircraft and wait for the firmware to confirm.
async fn run_pairing(controller: &RemoteController) -> Result<(), Box<dyn Error>> {
    let mut updates = controller.subscribe_pairing_updates();
    controller.enter_pairing().await?;
    println!("Pairing with the aircraft...");
    loop {
        let state = updates.recv().await?;
        println!("  pairing: {state}");
        if state == PairingState::Completed {
            break;
        }
    }
    controller.exit_pairing().await?;
    Ok(())
}

/// Take the master role, admit peers and arbitrate their gimbal requests.
async fn run_as_master(
    controller: &RemoteController,
    policy: DecisionPolicy,
    expected: usize,
) -> Result<(), Box<dyn Error>> {
    let mut sessions = controller.subscribe_session_events();
    let mut arbitration = controller.subscribe_gimbal_requests();

    controller.set_role(Role::Master).await?;
    println!("Running as master, waiting for {expected} peers");

    let mut joined = 0;
    while joined < expected {
        if let SessionEvent::SlaveJoined(slave) = sessions.recv().await? {
            println!("  {} attached", label(&slave));
            joined += 1;
        }
    }

    let mut settled = 0;
    while settled < expected {
        match arbitration.recv().await? {
            ArbiterEvent::RequestPending(request) => {
                let who = label(&request.requester);
                match policy {
                    DecisionPolicy::Grant => {
                        println!("  {who} asks for the gimbal, granting");
                        controller
                            .respond_to_gimbal_request(request.requester.id, true)
                            .await?;
                    }
                    DecisionPolicy::Deny => {
                        println!("  {who} asks for the gimbal, denying");
                        controller
                            .respond_to_gimbal_request(request.requester.id, false)
                            .await?;
                    }
                    DecisionPolicy::Ignore => {
                        println!("  {who} asks for the gimbal, ignoring");
                    }
                }
            }
            ArbiterEvent::RequestSettled { requester, result } => {
                println!("  request from #{requester} settled: {result}");
                settled += 1;
            }
            ArbiterEvent::HolderChanged { holder } => {
                println!("  gimbal follows #{holder}");
            }
        }
    }

    if controller.gimbal_holder().await != controller.id() {
        controller.revoke_gimbal_control().await?;
        println!("Revoked, gimbal follows the master again");
    }

    let slaves = controller.slave_list().await?;
    let names: Vec<String> = slaves.iter().map(label).collect();
    println!("Slave table: [{}]", names.join(", "));
    Ok(())
}

/// Step down, scan for a master, join it and ask for the gimbal.
async fn run_as_slave(controller: &RemoteController) -> Result<(), Box<dyn Error>> {
    controller.set_role(Role::Normal).await?;
    controller.start_master_search().await?;
    println!("Scanning for masters");

    let mut masters = Vec::new();
    for _ in 0..100 {
        masters = controller.available_masters().await;
        if !masters.is_empty() {
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    controller.stop_master_search().await?;

    let Some(target) = masters.first() else {
        println!("No masters in range, giving up");
        return Ok(());
    };
    println!("Found {} (signal {}%)", label(target), target.signal_quality);

    let result = controller.join_master(target.id, "LEAD", "1111").await?;
    println!("Join: {result}");
    if result != JoinMasterResult::Successful {
        return Ok(());
    }

    controller.set_slave_control_mode(ControlMode::slave_default()).await?;
    let verdict = controller.request_gimbal_control().await?;
    println!("Gimbal request answered: {verdict}");
    controller.remove_master(target.id).await?;
    println!("Left the master");
    Ok(())
}

fn label(identity: &RcIdentity) -> String {
    identity
        .name
        .clone()
        .unwrap_or_else(|| identity.id.to_string())
}
