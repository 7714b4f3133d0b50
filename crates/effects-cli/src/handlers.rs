//! Handlers - Now / Get の実装

use async_trait::async_trait;
use effects_core::{Context, EffectError, Handler};

use crate::clock::Clock;
use crate::commands::{Get, Now};

pub struct NowHandler<C> {
    clock: C,
}

impl<C: Clock> NowHandler<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl<C: Clock + 'static> Handler<Now> for NowHandler<C> {
    async fn handle(&self, cmd: &mut Now, _ctx: &dyn Context) -> Result<(), EffectError> {
        cmd.time = Some(self.clock.now());
        Ok(())
    }
}

/// Performs the request and stops waiting once the context is done.
pub struct GetHandler {
    client: reqwest::Client,
}

impl GetHandler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &str) -> Result<(u16, String), EffectError> {
        let response = self.client.get(url).send().await.map_err(EffectError::domain)?;
        let status = response.status();
        if !status.is_success() {
            return Err(EffectError::msg(format!("GET {url} failed: HTTP {status}")));
        }
        let body = response.text().await.map_err(EffectError::domain)?;
        Ok((status.as_u16(), body))
    }
}

#[async_trait]
impl Handler<Get> for GetHandler {
    async fn handle(&self, cmd: &mut Get, ctx: &dyn Context) -> Result<(), EffectError> {
        let url = cmd.url.clone();
        tokio::select! {
            biased;
            _ = ctx.done() => {
                tracing::debug!(%url, "request abandoned");
                Err(ctx.err().unwrap_or(EffectError::Canceled))
            }
            fetched = self.fetch(&url) => {
                let (status, body) = fetched?;
                cmd.status = Some(status);
                cmd.body = body;
                Ok(())
            }
        }
    }
}
