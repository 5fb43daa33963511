/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */


use std::time::Duration;

use serde_json::json;

use crate::cli_args::TokenArgs;
use crate::token_client::{IssuedToken, TokenClient, TokenRefresher};

fn print_token(issued: &IssuedToken) {
    println!(
        "{}",
        json!({
            "token": issued.token,
            "expiresIn": issued.expires_in,
            "fallback": issued.fallback,
        })
    );
}

pub async fn token(opt: TokenArgs) -> anyhow::Result<()> {
    let client = TokenClient::new(opt.url.clone());
    let role = opt.role.as_query();

    if !opt.watch {
        print_token(&client.fetch_token(&opt.channel, opt.uid, role).await);
        return Ok(());
    }

    let refresher =
        TokenRefresher::start(client, opt.channel.clone(), opt.uid, role.to_string()).await;
    print_token(&refresher.current());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut check = tokio::time::interval(Duration::from_secs(1));
    let mut printed = 0;
    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = check.tick() => {
                let refreshes = refresher.refreshes();
                if refreshes != printed {
                    printed = refreshes;
                    print_token(&refresher.current());
                }
            }
        }
    }
    refresher.cancel();
    Ok(())
}
