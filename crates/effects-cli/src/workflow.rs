//! Workflow - 副作用をコマンドとして記述するビジネスロジック
//!
//! Nothing here touches the network or the clock directly. The same function
//! runs against a `RealContext` in `main` and a `TestContext` in the tests.

use chrono::{DateTime, Utc};
use effects_core::{Arg, Context, ContextExt, EffectError};
use serde::Serialize;

use crate::commands::{Get, Now};

pub const DEFAULT_URL: &str = "https://swapi.dev/api/people/1";

#[derive(Debug, Clone, Serialize)]
pub struct Fetched {
    pub started_at: Option<DateTime<Utc>>,
    pub status: Option<u16>,
    pub body: String,
    /// Stamps taken in series, then concurrently.
    pub stamps: Vec<Option<DateTime<Utc>>>,
}

/// Reads the clock, fetches `url`, then takes three clock readings in series
/// and three concurrently.
pub async fn fetch_person(ctx: &dyn Context, url: &str) -> Result<Fetched, EffectError> {
    let mut now = Now::default();
    ctx.run(&mut now).await?;

    let mut get = Get::new(url);
    ctx.run(&mut get).await?;

    let mut series: [Now; 3] = Default::default();
    ctx.run_series(Arg::batch(series.iter_mut())).await?;

    let mut concurrent: [Now; 3] = Default::default();
    ctx.run_concurrent(Arg::batch(concurrent.iter_mut())).await?;

    Ok(Fetched {
        started_at: now.time,
        status: get.status,
        body: get.body,
        stamps: series
            .iter()
            .chain(concurrent.iter())
            .map(|stamp| stamp.time)
            .collect(),
    })
}
