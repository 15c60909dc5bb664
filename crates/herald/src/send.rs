// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald broadcast`: one broadcast from the command line.
//!
//! Prints the same JSON body the gateway returns. Ctrl+C stops the run early.

use herald_broadcast::{BroadcastRequest, RawBroadcastRequest};
use herald_config::model::HeraldConfig;
use herald_core::error::HeraldError;

use crate::BroadcastArgs;
use crate::serve::Components;
use crate::shutdown;

pub async fn run_broadcast(config: HeraldConfig, args: BroadcastArgs) -> Result<(), HeraldError> {
    let text = match (args.text, args.text_file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path).await.map_err(|e| {
            HeraldError::InvalidRequest(format!("cannot read {}: {e}", path.display()))
        })?,
        (None, None) => return Err(HeraldError::InvalidRequest("Text cannot be empty".into())),
    };

    let request = BroadcastRequest::try_from(RawBroadcastRequest {
        send_to: args.send_to,
        text,
        photo: args.photo,
        cluster_name: args.cluster,
        workers: args.workers,
        messages_per_second: args.rate,
    })?;

    let components = Components::open(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let result = components.broadcaster(&config, cancel).run(request).await;
    components.close().await;

    let response = result?;
    let body = serde_json::to_string_pretty(&response.to_json())
        .map_err(|e| HeraldError::Internal(format!("failed to encode stats: {e}")))?;
    println!("{body}");
    Ok(())
}
