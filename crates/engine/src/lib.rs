//! `shotledger-engine`: analytics core for recorded shot events.
//!
//! Pure engine crate: receives base shots and their correction overlays,
//! returns resolved views, attribution sets, spatial bins and metrics.
//! No storage or CLI dependencies.

pub mod court;
pub mod error;
pub mod fingerprint;
pub mod hexbin;
pub mod metrics;
pub mod model;
pub mod onice;
pub mod resolve;
pub mod row;

pub use error::EngineError;
pub use fingerprint::Fingerprint;
pub use hexbin::{binned_heatmap, BinContext, FocusEntity, HexCell};
pub use metrics::{player_metrics, team_baseline, Metric, MetricsRecord, Polarity};
pub use model::{
    CorrectionPatch, Game, GameFilter, GameId, Lineup, ResolvedShot, ShotCorrection, ShotEvent,
    ShotId, ShotResult, Side, SideSlots, Visibility,
};
pub use resolve::resolve;
