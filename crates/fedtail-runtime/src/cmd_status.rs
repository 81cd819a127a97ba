//! `fedtail status`: coordination server liveness and local datasite identity.

use crate::http::CoordinationClient;

pub async fn cmd_status(client: &CoordinationClient) -> anyhow::Result<()> {
    if !client.probe().await {
        println!("server:   not reachable at {}", client.base_url());
        return Ok(());
    }
    println!("server:   up at {}", client.base_url());

    match client.metadata().await {
        Ok(datasite) if !datasite.is_empty() => println!("datasite: {datasite}"),
        Ok(_) => println!("datasite: (unknown)"),
        Err(e) => println!("datasite: metadata unavailable ({e})"),
    }
    Ok(())
}
