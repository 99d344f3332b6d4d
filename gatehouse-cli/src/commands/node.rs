//! `gatehouse node`: pair this machine with a gateway and connect to it.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use gatehouse_core::{docs, KeyringStore, SecretStore};
use gatehouse_pairing::{
    BridgeConnector, DiscoveryTransport, LineBridgeClient, NodeIdentity, PairingClient,
    PairingTransport, StaticDiscovery,
};

#[derive(Subcommand, Debug)]
pub enum NodeCommand {
    /// Pair with a gateway and cache the issued bridge token.
    Pair(PairArgs),
    /// Connect with a cached token to the first reachable gateway.
    Connect(ConnectArgs),
}

#[derive(Args, Debug)]
pub struct PairArgs {
    /// Gateway bridge endpoint (host:port). Repeat for several.
    #[arg(long = "gateway", required = true)]
    pub gateways: Vec<String>,

    /// Display name this node presents to the gateway.
    #[arg(long)]
    pub name: Option<String>,

    /// Which of the given gateways to pair with (defaults to the first).
    #[arg(long)]
    pub peer: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Gateway bridge endpoint (host:port). Repeat for several.
    #[arg(long = "gateway", required = true)]
    pub gateways: Vec<String>,
}

pub fn run(command: NodeCommand) -> Result<()> {
    let home = super::home()?;
    let runtime = super::runtime()?;
    match command {
        NodeCommand::Pair(args) => {
            let identity = NodeIdentity::load_or_create_at(&home, args.name.as_deref())
                .context("failed to load node identity")?;
            let client = client(identity);
            let discovery = StaticDiscovery::from_endpoints(&args.gateways);
            runtime.block_on(pair(&client, &discovery, args.peer.as_deref()))
        }
        NodeCommand::Connect(args) => {
            let identity = NodeIdentity::load_or_create_at(&home, None)
                .context("failed to load node identity")?;
            let client = client(identity);
            let discovery = StaticDiscovery::from_endpoints(&args.gateways);
            runtime
                .block_on(client.run_discovery(&discovery))
                .context("discovery failed")?;
            match client.connected() {
                Some(session) => {
                    print_connected(&session.peer_id, session.server_name.as_deref());
                    Ok(())
                }
                None => bail!(
                    "no gateway accepted a cached token; run `gatehouse node pair` first ({})",
                    docs::PAIRING
                ),
            }
        }
    }
}

fn client(identity: NodeIdentity) -> PairingClient {
    let secrets: Arc<dyn SecretStore> = Arc::new(KeyringStore);
    let bridge = Arc::new(LineBridgeClient::default());
    let pairing: Arc<dyn PairingTransport> = bridge.clone();
    let connector: Arc<dyn BridgeConnector> = bridge;
    PairingClient::new(identity, secrets, pairing, connector)
}

/// Load the given endpoints into the client and pair with one of them.
async fn pair(
    client: &PairingClient,
    discovery: &StaticDiscovery,
    peer: Option<&str>,
) -> Result<()> {
    let mut events = discovery.start().context("discovery failed")?;
    while let Ok(event) = events.try_recv() {
        client.on_peer_event(event);
    }
    discovery.stop();

    let target = match peer {
        Some(id) => id.trim().to_string(),
        None => client
            .peers()
            .first()
            .map(|p| p.id.clone())
            .context("no gateway endpoints given")?,
    };
    println!(
        "pairing {} as {}",
        target.bold(),
        client.identity().display_name
    );
    let session = client
        .pair(&target)
        .await
        .with_context(|| format!("pairing with {target} failed; see {}", docs::PAIRING))?;
    print_connected(&session.peer_id, session.server_name.as_deref());
    Ok(())
}

fn print_connected(peer: &str, server_name: Option<&str>) {
    match server_name {
        Some(name) => println!("{} {} ({})", "connected".green(), peer, name),
        None => println!("{} {}", "connected".green(), peer),
    }
}
